//! The two output streams of a run: the daily state counts
//! (`infections.txt`) and one row per transmission (`infectionEvents.txt`).
use log::info;
use serde::Serialize;

use crate::contact_model::InfectionRecord;
use crate::context::Context;
use crate::error::EpisimError;
use crate::people::{ContextPeopleExt, DiseaseStatus, Population, QuarantineStatus, DAY};
use crate::report::ContextReportExt;
use crate::{define_data_plugin, define_report};

/// Counts of one day, taken after progression. Never changed once built.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InfectionReport {
    pub day: u32,
    pub n_susceptible: usize,
    pub n_infected_but_not_contagious: usize,
    pub n_contagious: usize,
    pub n_showing_symptoms: usize,
    pub n_seriously_sick: usize,
    pub n_critical: usize,
    pub n_recovered: usize,
    /// Persons in full or at-home quarantine.
    pub n_in_quarantine: usize,
}

impl InfectionReport {
    #[must_use]
    pub fn from_population(population: &Population, day: u32) -> InfectionReport {
        let mut report = InfectionReport {
            day,
            ..InfectionReport::default()
        };
        for person in population.iter() {
            let count = match person.disease_status() {
                DiseaseStatus::Susceptible => &mut report.n_susceptible,
                DiseaseStatus::InfectedButNotContagious => &mut report.n_infected_but_not_contagious,
                DiseaseStatus::Contagious => &mut report.n_contagious,
                DiseaseStatus::ShowingSymptoms => &mut report.n_showing_symptoms,
                DiseaseStatus::SeriouslySick => &mut report.n_seriously_sick,
                DiseaseStatus::Critical => &mut report.n_critical,
                DiseaseStatus::Recovered => &mut report.n_recovered,
            };
            *count += 1;
            if person.quarantine_status() != QuarantineStatus::None {
                report.n_in_quarantine += 1;
            }
        }
        report
    }

    #[must_use]
    pub fn n_infected(&self) -> usize {
        self.n_infected_but_not_contagious + self.n_contagious
    }

    #[must_use]
    pub fn n_infected_cumulative(&self) -> usize {
        self.n_infected() + self.n_recovered
    }

    /// Persons counted over all statuses.
    #[must_use]
    pub fn total(&self) -> usize {
        self.n_susceptible
            + self.n_infected_but_not_contagious
            + self.n_contagious
            + self.n_showing_symptoms
            + self.n_seriously_sick
            + self.n_critical
            + self.n_recovered
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfectionsRow {
    time: f64,
    n_infected: usize,
    n_in_quarantine: usize,
    n_recovered: usize,
    n_susceptible: usize,
    n_contagious: usize,
    n_infected_but_not_contagious: usize,
    n_infected_cumulative: usize,
    n_seriously_sick: usize,
    n_critical: usize,
}

define_report!(
    InfectionsRow,
    [
        "time",
        "nInfected",
        "nInQuarantine",
        "nRecovered",
        "nSusceptible",
        "nContagious",
        "nInfectedButNotContagious",
        "nInfectedCumulative",
        "nSeriouslySick",
        "nCritical",
    ]
);

impl From<&InfectionReport> for InfectionsRow {
    fn from(report: &InfectionReport) -> Self {
        InfectionsRow {
            time: f64::from(report.day) * DAY,
            n_infected: report.n_infected(),
            n_in_quarantine: report.n_in_quarantine,
            n_recovered: report.n_recovered,
            n_susceptible: report.n_susceptible,
            n_contagious: report.n_contagious,
            n_infected_but_not_contagious: report.n_infected_but_not_contagious,
            n_infected_cumulative: report.n_infected_cumulative(),
            n_seriously_sick: report.n_seriously_sick,
            n_critical: report.n_critical,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfectionEventRow {
    time: f64,
    infector: String,
    infected: String,
    infection_type: String,
}

define_report!(
    InfectionEventRow,
    ["time", "infector", "infected", "infectionType"]
);

struct ReportingData {
    verbose_infections_left: usize,
    last_report: Option<InfectionReport>,
}

define_data_plugin!(
    ReportingPlugin,
    ReportingData,
    ReportingData {
        verbose_infections_left: 0,
        last_report: None,
    }
);

pub trait ContextReportingExt {
    /// Creates both output streams, prefixed with `run_id.` if given. The
    /// first `verbose_limit` infections are also logged.
    ///
    /// # Errors
    ///
    /// Returns the error of `add_report` if a stream can't be created.
    fn add_episim_reports(
        &mut self,
        run_id: Option<&str>,
        verbose_limit: usize,
    ) -> Result<(), EpisimError>;

    /// # Errors
    ///
    /// Returns an error if the row can't be written.
    fn report_infection(&mut self, record: &InfectionRecord) -> Result<(), EpisimError>;

    /// Counts the population, writes the row of `day` and keeps the report.
    ///
    /// # Errors
    ///
    /// Returns an error if the row can't be written.
    fn report_day(&mut self, day: u32) -> Result<InfectionReport, EpisimError>;

    fn last_infection_report(&self) -> Option<&InfectionReport>;
}

impl ContextReportingExt for Context {
    fn add_episim_reports(
        &mut self,
        run_id: Option<&str>,
        verbose_limit: usize,
    ) -> Result<(), EpisimError> {
        if let Some(run_id) = run_id {
            self.report_options().file_prefix(format!("{run_id}."));
        }
        self.add_report::<InfectionsRow>("infections")?;
        self.add_report::<InfectionEventRow>("infectionEvents")?;
        self.get_data_mut(ReportingPlugin).verbose_infections_left = verbose_limit;
        Ok(())
    }

    fn report_infection(&mut self, record: &InfectionRecord) -> Result<(), EpisimError> {
        let population = self.population().ok_or_else(|| {
            EpisimError::InvariantViolation("infection reported without a population".to_string())
        })?;
        let row = InfectionEventRow {
            time: record.time,
            infector: population.get(record.infector).external_id().to_string(),
            infected: population.get(record.infected).external_id().to_string(),
            infection_type: record.infection_type.clone(),
        };
        let data = self.get_data_mut(ReportingPlugin);
        if data.verbose_infections_left > 0 {
            data.verbose_infections_left -= 1;
            info!(
                "infection of {} by {} at {}",
                row.infected, row.infector, row.infection_type
            );
        }
        self.send_report(row)
    }

    fn report_day(&mut self, day: u32) -> Result<InfectionReport, EpisimError> {
        let report = self.population().map_or_else(
            || InfectionReport {
                day,
                ..InfectionReport::default()
            },
            |population| InfectionReport::from_population(population, day),
        );
        info!(
            "day {day}: susceptible={} infectedButNotContagious={} contagious={} showingSymptoms={} recovered={} inQuarantine={}",
            report.n_susceptible,
            report.n_infected_but_not_contagious,
            report.n_contagious,
            report.n_showing_symptoms,
            report.n_recovered,
            report.n_in_quarantine
        );
        self.send_report(InfectionsRow::from(&report))?;
        self.get_data_mut(ReportingPlugin).last_report = Some(report.clone());
        Ok(report)
    }

    fn last_infection_report(&self) -> Option<&InfectionReport> {
        self.get_data(ReportingPlugin)?.last_report.as_ref()
    }
}
