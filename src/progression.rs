//! Daily disease progression, quarantine and contact tracing.
//!
//! Every person is advanced once per day, after the day's contacts, with
//! the time set to the start of the day. The clock is the number of whole
//! days since the person became infected.
use log::trace;
use rand::Rng;

use crate::config::TracingConfig;
use crate::define_rng;
use crate::error::EpisimError;
use crate::people::{DiseaseStatus, Person, PersonId, Population, QuarantineStatus, DAY};
use crate::reporting::InfectionReport;

define_rng!(ProgressionRng);

/// Traceable contacts older than this are forgotten.
const CONTACT_MEMORY_DAYS: f64 = 7.0;

/// Probabilities of the random branches of the progression. Implement this
/// to stratify them by person; the defaults are constants.
pub trait TransitionProbabilities {
    /// Contagious to showing symptoms, six days after infection.
    fn showing_symptoms(&self, _person: &Person, _now: f64) -> f64 {
        0.8
    }

    /// Showing symptoms to seriously sick, ten days after infection.
    fn seriously_sick(&self, _person: &Person, _now: f64) -> f64 {
        0.056_25
    }

    /// Seriously sick to critical, eleven days after infection.
    fn critical(&self, _person: &Person, _now: f64) -> f64 {
        0.25
    }
}

pub struct DefaultTransitionProbabilities;

impl TransitionProbabilities for DefaultTransitionProbabilities {}

pub struct ProgressionModel {
    tracing: TracingConfig,
    probabilities: Box<dyn TransitionProbabilities>,
}

impl ProgressionModel {
    #[must_use]
    pub fn new(tracing: TracingConfig) -> ProgressionModel {
        ProgressionModel::with_probabilities(tracing, Box::new(DefaultTransitionProbabilities))
    }

    #[must_use]
    pub fn with_probabilities(
        tracing: TracingConfig,
        probabilities: Box<dyn TransitionProbabilities>,
    ) -> ProgressionModel {
        ProgressionModel {
            tracing,
            probabilities,
        }
    }

    /// Advances person `id` to `day`.
    ///
    /// # Errors
    ///
    /// Returns `EpisimError::InvariantViolation` if an infected person has no
    /// infection time or a transition leaves the progression graph.
    pub fn update_state<R: Rng>(
        &self,
        population: &mut Population,
        id: PersonId,
        day: u32,
        rng: &mut R,
    ) -> Result<(), EpisimError> {
        let now = f64::from(day) * DAY;
        let status = population.get(id).disease_status();

        match status {
            DiseaseStatus::Susceptible => {
                let person = population.get_mut(id);
                if person.quarantine_status() != QuarantineStatus::None
                    && person.days_since_quarantine(day).is_some_and(|days| days > 14)
                {
                    person.set_quarantine_status(QuarantineStatus::None, day);
                }
            }
            DiseaseStatus::Recovered => {
                let person = population.get_mut(id);
                if person.quarantine_status() != QuarantineStatus::None {
                    person.set_quarantine_status(QuarantineStatus::None, day);
                }
            }
            _ => self.advance_infection(population, id, status, day, now, rng)?,
        }

        population
            .get_mut(id)
            .clear_traceable_contacts_before(now - CONTACT_MEMORY_DAYS * DAY);
        Ok(())
    }

    fn advance_infection<R: Rng>(
        &self,
        population: &mut Population,
        id: PersonId,
        status: DiseaseStatus,
        day: u32,
        now: f64,
        rng: &mut R,
    ) -> Result<(), EpisimError> {
        let person = population.get(id);
        let days = person
            .days_since(DiseaseStatus::InfectedButNotContagious, day)
            .ok_or_else(|| {
                EpisimError::InvariantViolation(format!(
                    "person {} is {status} but was never infected",
                    person.external_id()
                ))
            })?;

        match status {
            DiseaseStatus::InfectedButNotContagious => {
                if days >= 4 {
                    population
                        .get_mut(id)
                        .set_disease_status(now, DiseaseStatus::Contagious)?;
                }
            }
            DiseaseStatus::Contagious => {
                if days == 6 {
                    let p = self.probabilities.showing_symptoms(person, now);
                    if rng.random::<f64>() < p {
                        let person = population.get_mut(id);
                        person.set_disease_status(now, DiseaseStatus::ShowingSymptoms)?;
                        person.set_quarantine_status(QuarantineStatus::AtHome, day);
                        if self.tracing.delay == 0 {
                            self.trace_contacts(population, id, now, day, rng);
                        }
                    }
                } else if days >= 16 {
                    population
                        .get_mut(id)
                        .set_disease_status(now, DiseaseStatus::Recovered)?;
                }
            }
            DiseaseStatus::ShowingSymptoms => {
                if days == 6 + self.tracing.delay {
                    let symptom_onset = now - f64::from(self.tracing.delay) * DAY;
                    self.trace_contacts(population, id, symptom_onset, day, rng);
                }
                if days == 10 {
                    let p = self.probabilities.seriously_sick(population.get(id), now);
                    if rng.random::<f64>() < p {
                        population
                            .get_mut(id)
                            .set_disease_status(now, DiseaseStatus::SeriouslySick)?;
                    }
                } else if days >= 16 {
                    population
                        .get_mut(id)
                        .set_disease_status(now, DiseaseStatus::Recovered)?;
                }
            }
            DiseaseStatus::SeriouslySick => {
                if days == 11 {
                    let p = self.probabilities.critical(person, now);
                    if rng.random::<f64>() < p {
                        population
                            .get_mut(id)
                            .set_disease_status(now, DiseaseStatus::Critical)?;
                    }
                } else if days >= 23 {
                    population
                        .get_mut(id)
                        .set_disease_status(now, DiseaseStatus::Recovered)?;
                }
            }
            DiseaseStatus::Critical => {
                if days == 20 {
                    population
                        .get_mut(id)
                        .set_disease_status(now, DiseaseStatus::SeriouslySick)?;
                }
            }
            DiseaseStatus::Susceptible | DiseaseStatus::Recovered => {}
        }
        Ok(())
    }

    /// Quarantines the contacts `id` met within `day_distance` days before
    /// `now`. Nothing happens before the tracing start day.
    fn trace_contacts<R: Rng>(
        &self,
        population: &mut Population,
        id: PersonId,
        now: f64,
        day: u32,
        rng: &mut R,
    ) {
        if day < self.tracing.start_day {
            return;
        }
        let person = population.get(id);
        let household = if self.tracing.quarantine_household {
            person.attributes().household_id.clone()
        } else {
            None
        };
        let since = now - f64::from(self.tracing.day_distance) * DAY;

        for contact in person.traceable_contacts_since(since) {
            if self.tracing.probability <= 0.0 && household.is_none() {
                continue;
            }
            let contact = population.get_mut(contact);
            let same_household =
                household.is_some() && contact.attributes().household_id == household;
            if (same_household || rng.random::<f64>() < self.tracing.probability)
                && contact.quarantine_status() == QuarantineStatus::None
                && contact.disease_status() != DiseaseStatus::Recovered
            {
                trace!("tracing puts {:?} in quarantine", contact.id());
                contact.set_quarantine_status(QuarantineStatus::AtHome, day);
            }
        }
    }
}

/// The epidemic is still running while someone is infected or in quarantine.
#[must_use]
pub fn can_progress(report: &InfectionReport) -> bool {
    report.n_infected() > 0 || report.n_in_quarantine > 0
}
