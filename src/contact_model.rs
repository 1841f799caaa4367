//! Transmission between persons who share a container.
//!
//! Contacts are evaluated when a person leaves a container: the leaving
//! person is paired with everyone still inside, in arrival order. Whether a
//! person takes part at all is decided by the restriction of their activity
//! on the current day, so a closed activity costs no random draws.
use std::rc::Rc;

use log::trace;
use rand::Rng;

use crate::config::EpisimConfig;
use crate::containers::{Container, ContainerKind, Occupant};
use crate::define_rng;
use crate::error::EpisimError;
use crate::infection_params::{ActivityId, ActivityTable};
use crate::people::{DiseaseStatus, Person, PersonId, Population, QuarantineStatus, DAY};
use crate::policy::{FaceMask, Restriction, RestrictionSet};

define_rng!(ContactRng);

/// One transmission.
#[derive(Clone, Debug, PartialEq)]
pub struct InfectionRecord {
    pub time: f64,
    pub infector: PersonId,
    pub infected: PersonId,
    /// The activity of the infected person, or the transit activity in a vehicle.
    pub infection_type: String,
}

/// True with probability `p`, without a draw when the outcome is certain.
fn passes<R: Rng>(p: f64, rng: &mut R) -> bool {
    if p >= 1.0 {
        true
    } else if p <= 0.0 {
        false
    } else {
        rng.random::<f64>() < p
    }
}

/// `exactly one contagious and the other susceptible`.
#[must_use]
pub fn can_infect_each_other(a: &Person, b: &Person) -> bool {
    matches!(
        (a.disease_status(), b.disease_status()),
        (DiseaseStatus::Susceptible, DiseaseStatus::Contagious)
            | (DiseaseStatus::Contagious, DiseaseStatus::Susceptible)
    )
}

fn has_relevant_status(person: &Person) -> bool {
    matches!(
        person.disease_status(),
        DiseaseStatus::Susceptible | DiseaseStatus::Contagious | DiseaseStatus::InfectedButNotContagious
    ) && person.quarantine_status() != QuarantineStatus::Full
}

/// Infects `target` with `infector` at `now` on `day`.
///
/// Every precondition is checked before anything changes: the target must be
/// susceptible, the infector contagious, neither in full quarantine, and both
/// inside the same container. A time at or after the end of `day` is moved
/// to the last second of the day.
///
/// # Errors
///
/// Returns `EpisimError::InvariantViolation` if a precondition does not hold.
pub fn infect(
    population: &mut Population,
    target: PersonId,
    infector: PersonId,
    now: f64,
    day: u32,
    infection_type: &str,
) -> Result<InfectionRecord, EpisimError> {
    if target == infector {
        return Err(EpisimError::InvariantViolation(format!(
            "{target:?} can't infect themselves"
        )));
    }
    let person = population.get(target);
    let source = population.get(infector);
    if person.disease_status() != DiseaseStatus::Susceptible {
        return Err(EpisimError::InvariantViolation(format!(
            "person {} to be infected is {}",
            person.external_id(),
            person.disease_status()
        )));
    }
    if source.disease_status() != DiseaseStatus::Contagious {
        return Err(EpisimError::InvariantViolation(format!(
            "infector {} is {}",
            source.external_id(),
            source.disease_status()
        )));
    }
    if person.quarantine_status() == QuarantineStatus::Full
        || source.quarantine_status() == QuarantineStatus::Full
    {
        return Err(EpisimError::InvariantViolation(format!(
            "infection of {} by {} in full quarantine",
            person.external_id(),
            source.external_id()
        )));
    }
    if person.current_container().is_none()
        || person.current_container() != source.current_container()
    {
        return Err(EpisimError::InvariantViolation(format!(
            "{} and {} are not in the same container",
            person.external_id(),
            source.external_id()
        )));
    }

    let day_end = f64::from(day + 1) * DAY;
    let time = if now >= day_end { day_end - 1.0 } else { now };
    population
        .get_mut(target)
        .set_disease_status(time, DiseaseStatus::InfectedButNotContagious)?;
    Ok(InfectionRecord {
        time,
        infector,
        infected: target,
        infection_type: infection_type.to_string(),
    })
}

/// The contact rules of one day, with the restrictions frozen at day start.
pub struct ContactModel {
    calibration: f64,
    mask_compliance: f64,
    tracing_enabled: bool,
    transit_activity: String,
    transit: Option<ActivityId>,
    home: Vec<bool>,
    activities: Rc<ActivityTable>,
    restrictions: Rc<RestrictionSet>,
}

impl ContactModel {
    #[must_use]
    pub fn new(
        config: &EpisimConfig,
        activities: Rc<ActivityTable>,
        restrictions: Rc<RestrictionSet>,
    ) -> ContactModel {
        let home = activities
            .labels()
            .iter()
            .map(|label| label.starts_with(&config.home_activity))
            .collect();
        ContactModel {
            calibration: config.calibration_parameter,
            mask_compliance: config.masks.compliance,
            tracing_enabled: config.tracing.is_enabled(),
            transit_activity: config.transit_activity.clone(),
            transit: activities.lookup(&config.transit_activity),
            home,
            activities,
            restrictions,
        }
    }

    fn transit(&self) -> Result<ActivityId, EpisimError> {
        self.transit.ok_or_else(|| {
            EpisimError::ConfigError(format!(
                "transit activity {} is not known",
                self.transit_activity
            ))
        })
    }

    fn restriction(&self, activity: ActivityId) -> Restriction {
        self.restrictions.get(self.activities.params_index(activity))
    }

    fn activity_is_relevant<R: Rng>(&self, activity: ActivityId, rng: &mut R) -> bool {
        passes(self.restriction(activity).remaining_fraction(), rng)
    }

    /// Whether `person` takes part in contacts in a container of `kind`.
    /// `activity` is the person's facility activity.
    ///
    /// # Errors
    ///
    /// Returns an error for a facility occupant without an activity, or a
    /// vehicle when the transit activity is unknown.
    pub fn is_relevant<R: Rng>(
        &self,
        person: &Person,
        kind: ContainerKind,
        activity: Option<ActivityId>,
        rng: &mut R,
    ) -> Result<bool, EpisimError> {
        if !has_relevant_status(person) {
            return Ok(false);
        }
        let relevant = match kind {
            ContainerKind::Facility => {
                let activity = activity.ok_or_else(|| {
                    EpisimError::InvariantViolation(format!(
                        "{} is in a facility without an activity",
                        person.external_id()
                    ))
                })?;
                if person.quarantine_status() == QuarantineStatus::AtHome
                    && !self.home[activity.index()]
                {
                    false
                } else {
                    self.activity_is_relevant(activity, rng)
                }
            }
            ContainerKind::Vehicle => {
                // Home quarantine only filters facility activities.
                let trajectory = person.trajectory();
                // Missing surrounding activities don't restrict the trip.
                self.activity_is_relevant(self.transit()?, rng)
                    && trajectory
                        .current()
                        .map_or(true, |next| self.activity_is_relevant(next, rng))
                    && trajectory
                        .previous()
                        .map_or(true, |last| self.activity_is_relevant(last, rng))
            }
        };
        trace!("{person:?} relevant in {kind:?}: {relevant}", person = person.id());
        Ok(relevant)
    }

    fn category_of(&self, kind: ContainerKind, occupant: &Occupant) -> Result<ActivityId, EpisimError> {
        match (kind, occupant.activity) {
            (ContainerKind::Facility, Some(activity)) => Ok(activity),
            (ContainerKind::Facility, None) => Err(EpisimError::InvariantViolation(format!(
                "{:?} is in a facility without an activity",
                occupant.person
            ))),
            (ContainerKind::Vehicle, _) => self.transit(),
        }
    }

    fn contact_intensity(&self, a: ActivityId, b: ActivityId) -> f64 {
        self.activities
            .params_of(a)
            .contact_intensity
            .max(self.activities.params_of(b).contact_intensity)
    }

    fn worn_mask<R: Rng>(&self, activity: ActivityId, rng: &mut R) -> FaceMask {
        match self.restriction(activity).mask() {
            Some(mask) if passes(self.mask_compliance, rng) => mask,
            _ => FaceMask::None,
        }
    }

    /// `1 - exp(-calibration * intensity * seconds * shedding * intake)`, with
    /// the masks drawn for the infector and the target.
    fn infection_probability<R: Rng>(
        &self,
        target_category: ActivityId,
        infector_category: ActivityId,
        joint: f64,
        rng: &mut R,
    ) -> f64 {
        let intensity = self.contact_intensity(target_category, infector_category);
        let shedding = self.worn_mask(infector_category, rng).shedding();
        let intake = self.worn_mask(target_category, rng).intake();
        1.0 - (-self.calibration * intensity * joint * shedding * intake).exp()
    }

    /// Evaluates the contacts of `leaving`, who has just been removed from
    /// `container`, with everyone still inside at time `now`. The remaining
    /// fraction of a restriction acts only through `is_relevant`.
    ///
    /// # Errors
    ///
    /// Returns `EpisimError::InvariantViolation` if an infection breaks one
    /// of its preconditions.
    pub fn on_leave<R: Rng>(
        &self,
        population: &mut Population,
        container: &Container,
        leaving: &Occupant,
        now: f64,
        day: u32,
        rng: &mut R,
    ) -> Result<Vec<InfectionRecord>, EpisimError> {
        let mut records = Vec::new();
        if container.occupants().is_empty()
            || !self.is_relevant(
                population.get(leaving.person),
                container.kind(),
                leaving.activity,
                rng,
            )?
        {
            return Ok(records);
        }
        let kind = container.kind();
        let leaving_category = self.category_of(kind, leaving)?;

        for other in container.occupants() {
            if !self.is_relevant(population.get(other.person), kind, other.activity, rng)? {
                continue;
            }
            let joint = now - leaving.enter_time.max(other.enter_time);
            if joint <= 0.0 {
                continue;
            }
            if self.tracing_enabled {
                let (a, b) = population.get_pair_mut(leaving.person, other.person);
                a.add_traceable_contact(b.id(), now);
                b.add_traceable_contact(a.id(), now);
            }
            if !can_infect_each_other(population.get(leaving.person), population.get(other.person)) {
                continue;
            }

            let other_category = self.category_of(kind, other)?;
            let ((target, target_category), (infector, infector_category)) =
                if population.get(leaving.person).disease_status() == DiseaseStatus::Susceptible {
                    ((leaving.person, leaving_category), (other.person, other_category))
                } else {
                    ((other.person, other_category), (leaving.person, leaving_category))
                };

            let probability =
                self.infection_probability(target_category, infector_category, joint, rng);
            if rng.random::<f64>() < probability {
                let infection_type = self.activities.label(target_category);
                let record = infect(population, target, infector, now, day, infection_type)?;
                trace!("{infector:?} infected {target:?} with probability {probability}");
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod test {
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::config::NameMatch;
    use crate::containers::{ContainerId, Containers};
    use crate::infection_params::InfectionParams;
    use crate::policy::{PolicyBuilder, RestrictionPolicy};

    fn category(name: &str, matching: NameMatch, contact_intensity: f64) -> InfectionParams {
        InfectionParams {
            name: name.to_string(),
            matching,
            contact_intensity,
            shutdown_day: None,
            remaining_fraction: 0.0,
        }
    }

    struct Setup {
        population: Population,
        containers: Containers,
        table: ActivityTable,
        facility: ContainerId,
        home: ActivityId,
        work: ActivityId,
    }

    fn setup() -> Setup {
        let mut table = ActivityTable::new(vec![
            category("home", NameMatch::Prefix, 1.0),
            category("work", NameMatch::Prefix, 2.0),
            category("pt", NameMatch::Exact, 5.0),
        ]);
        let home = table.intern("home").unwrap();
        let work = table.intern("work").unwrap();
        table.intern("pt").unwrap();
        let mut population = Population::default();
        for name in ["sick", "healthy", "other"] {
            population.get_or_add_person(name);
        }
        let mut containers = Containers::default();
        let facility = containers.get_or_add(ContainerKind::Facility, "f1");
        Setup {
            population,
            containers,
            table,
            facility,
            home,
            work,
        }
    }

    fn make_contagious(population: &mut Population, id: PersonId) {
        let person = population.get_mut(id);
        person
            .set_disease_status(0.0, DiseaseStatus::InfectedButNotContagious)
            .unwrap();
        person.set_disease_status(0.0, DiseaseStatus::Contagious).unwrap();
    }

    fn config(calibration: f64) -> EpisimConfig {
        EpisimConfig {
            calibration_parameter: calibration,
            ..EpisimConfig::default()
        }
    }

    fn unrestricted(table: &ActivityTable) -> Rc<RestrictionSet> {
        Rc::new(
            RestrictionPolicy::build(&PolicyBuilder::new().build(), table.categories(), None, None)
                .unwrap()
                .restrictions_for_day(0),
        )
    }

    fn enter(setup: &mut Setup, id: PersonId, time: f64, activity: ActivityId) {
        setup
            .containers
            .enter(
                setup.facility,
                Occupant {
                    person: id,
                    enter_time: time,
                    activity: Some(activity),
                },
            )
            .unwrap();
        setup.population.get_mut(id).current_container = Some(setup.facility);
    }

    #[test]
    fn relevance_by_status_and_quarantine() {
        let mut setup = setup();
        let model = ContactModel::new(&config(1.0), Rc::new(setup.table.clone()), unrestricted(&setup.table));
        let mut rng = SmallRng::seed_from_u64(1);
        let id = PersonId(0);

        let relevant = |population: &Population, activity: ActivityId, rng: &mut SmallRng| {
            model
                .is_relevant(population.get(id), ContainerKind::Facility, Some(activity), rng)
                .unwrap()
        };
        assert!(relevant(&setup.population, setup.work, &mut rng));

        setup
            .population
            .get_mut(id)
            .set_quarantine_status(QuarantineStatus::AtHome, 0);
        assert!(!relevant(&setup.population, setup.work, &mut rng));
        assert!(relevant(&setup.population, setup.home, &mut rng));

        setup
            .population
            .get_mut(id)
            .set_quarantine_status(QuarantineStatus::Full, 0);
        assert!(!relevant(&setup.population, setup.home, &mut rng));

        setup
            .population
            .get_mut(id)
            .set_quarantine_status(QuarantineStatus::None, 0);
        make_contagious(&mut setup.population, id);
        setup
            .population
            .get_mut(id)
            .set_disease_status(0.0, DiseaseStatus::ShowingSymptoms)
            .unwrap();
        assert!(!relevant(&setup.population, setup.home, &mut rng));
    }

    #[test]
    fn closed_activity_is_never_relevant() {
        let setup = setup();
        let policy = RestrictionPolicy::build(
            &PolicyBuilder::new().restrict(0, 0.0, &["work"]).build(),
            setup.table.categories(),
            None,
            None,
        )
        .unwrap();
        let model = ContactModel::new(
            &config(1.0),
            Rc::new(setup.table.clone()),
            Rc::new(policy.restrictions_for_day(0)),
        );
        let mut rng = SmallRng::seed_from_u64(2);
        let person = setup.population.get(PersonId(0));
        for _ in 0..20 {
            assert!(!model
                .is_relevant(person, ContainerKind::Facility, Some(setup.work), &mut rng)
                .unwrap());
            assert!(model
                .is_relevant(person, ContainerKind::Facility, Some(setup.home), &mut rng)
                .unwrap());
        }
    }

    #[test]
    fn vehicle_relevance_checks_surrounding_activities() {
        let mut setup = setup();
        let policy = RestrictionPolicy::build(
            &PolicyBuilder::new().restrict(0, 0.0, &["work"]).build(),
            setup.table.categories(),
            None,
            None,
        )
        .unwrap();
        let model = ContactModel::new(
            &config(1.0),
            Rc::new(setup.table.clone()),
            Rc::new(policy.restrictions_for_day(0)),
        );
        let mut rng = SmallRng::seed_from_u64(3);
        let id = PersonId(0);

        // Nothing before or after the trip.
        assert!(model
            .is_relevant(setup.population.get(id), ContainerKind::Vehicle, None, &mut rng)
            .unwrap());

        let trajectory = &mut setup.population.get_mut(id).trajectory;
        trajectory.push(setup.home);
        trajectory.push(setup.work);
        trajectory.advance();
        // On the way from home to a closed workplace.
        assert!(!model
            .is_relevant(setup.population.get(id), ContainerKind::Vehicle, None, &mut rng)
            .unwrap());
    }

    #[test]
    fn home_quarantine_does_not_restrict_trips() {
        let mut setup = setup();
        let model = ContactModel::new(&config(1.0), Rc::new(setup.table.clone()), unrestricted(&setup.table));
        let mut rng = SmallRng::seed_from_u64(6);
        let id = PersonId(0);
        let person = setup.population.get_mut(id);
        person.trajectory.push(setup.home);
        person.trajectory.push(setup.work);
        person.trajectory.advance();
        person.set_quarantine_status(QuarantineStatus::AtHome, 0);

        assert!(model
            .is_relevant(setup.population.get(id), ContainerKind::Vehicle, None, &mut rng)
            .unwrap());
        assert!(!model
            .is_relevant(setup.population.get(id), ContainerKind::Facility, Some(setup.work), &mut rng)
            .unwrap());

        setup
            .population
            .get_mut(id)
            .set_quarantine_status(QuarantineStatus::Full, 0);
        assert!(!model
            .is_relevant(setup.population.get(id), ContainerKind::Vehicle, None, &mut rng)
            .unwrap());
    }

    /// Work asks for `mask` from day 0 on.
    fn masked_model(
        setup: &Setup,
        mask: FaceMask,
        mask_type: Option<FaceMask>,
        compliance: f64,
        calibration: f64,
    ) -> ContactModel {
        let policy = RestrictionPolicy::build(
            &PolicyBuilder::new()
                .restrict_with_mask(0, 1.0, mask, &["work"])
                .build(),
            setup.table.categories(),
            None,
            mask_type,
        )
        .unwrap();
        let mut config = config(calibration);
        config.masks.compliance = compliance;
        ContactModel::new(
            &config,
            Rc::new(setup.table.clone()),
            Rc::new(policy.restrictions_for_day(0)),
        )
    }

    #[test]
    fn masks_lower_the_infection_probability() {
        let setup = setup();
        let (calibration, joint) = (0.01, 3600.0);
        let mut rng = SmallRng::seed_from_u64(7);

        // Nobody complies: only the larger intensity (work, 2.0) counts.
        let model = masked_model(&setup, FaceMask::N95, None, 0.0, calibration);
        let unmasked = model.infection_probability(setup.work, setup.work, joint, &mut rng);
        assert_approx_eq!(unmasked, 1.0 - (-calibration * 2.0 * joint).exp());

        let model = masked_model(&setup, FaceMask::N95, None, 1.0, calibration);
        let masked = model.infection_probability(setup.work, setup.work, joint, &mut rng);
        assert_approx_eq!(
            masked,
            1.0 - (-calibration * 2.0 * joint * 0.15 * 0.025).exp()
        );
        assert!(masked > 0.2 && masked < 0.25);
        assert!(masked < unmasked);

        // A target at home wears nothing; the infector at work sheds less.
        let one_mask = model.infection_probability(setup.home, setup.work, joint, &mut rng);
        assert_approx_eq!(one_mask, 1.0 - (-calibration * 2.0 * joint * 0.15).exp());
    }

    #[test]
    fn mask_type_override_reaches_the_contacts() {
        let setup = setup();
        let (calibration, joint) = (0.01, 3600.0);
        let mut rng = SmallRng::seed_from_u64(8);
        let model = masked_model(&setup, FaceMask::Cloth, Some(FaceMask::N95), 1.0, calibration);
        let p = model.infection_probability(setup.work, setup.work, joint, &mut rng);
        assert_approx_eq!(p, 1.0 - (-calibration * 2.0 * joint * 0.15 * 0.025).exp());
    }

    #[test]
    fn certain_compliance_draws_nothing() {
        let setup = setup();
        for compliance in [0.0, 1.0] {
            let model = masked_model(&setup, FaceMask::Cloth, None, compliance, 0.01);
            let mut rng = SmallRng::seed_from_u64(9);
            let mut untouched = rng.clone();
            model.infection_probability(setup.work, setup.work, 3600.0, &mut rng);
            assert_eq!(rng.random::<u64>(), untouched.random::<u64>());
        }

        let model = masked_model(&setup, FaceMask::Cloth, None, 0.5, 0.01);
        let mut rng = SmallRng::seed_from_u64(9);
        let mut untouched = rng.clone();
        model.infection_probability(setup.work, setup.work, 3600.0, &mut rng);
        assert_ne!(rng.random::<u64>(), untouched.random::<u64>());
    }

    #[test]
    fn vehicle_contacts_use_the_transit_category() {
        let mut setup = setup();
        let (sick, healthy) = (PersonId(0), PersonId(1));
        let bus = setup.containers.get_or_add(ContainerKind::Vehicle, "bus_1");
        for id in [sick, healthy] {
            setup
                .containers
                .enter(
                    bus,
                    Occupant {
                        person: id,
                        enter_time: 0.0,
                        activity: None,
                    },
                )
                .unwrap();
            setup.population.get_mut(id).current_container = Some(bus);
        }
        make_contagious(&mut setup.population, sick);
        let transit = setup.table.lookup("pt").unwrap();
        let mut rng = SmallRng::seed_from_u64(10);

        // pt has intensity 5.0.
        let low = ContactModel::new(&config(0.0001), Rc::new(setup.table.clone()), unrestricted(&setup.table));
        assert_approx_eq!(
            low.infection_probability(transit, transit, 1800.0, &mut rng),
            1.0 - (-0.0001_f64 * 5.0 * 1800.0).exp()
        );

        let model = ContactModel::new(&config(1.0), Rc::new(setup.table.clone()), unrestricted(&setup.table));
        let leaving = setup.containers.leave(bus, healthy).unwrap();
        let records = model
            .on_leave(
                &mut setup.population,
                setup.containers.get(bus),
                &leaving,
                1800.0,
                0,
                &mut rng,
            )
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].infected, healthy);
        assert_eq!(records[0].infector, sick);
        assert_eq!(records[0].infection_type, "pt");
    }

    #[test]
    fn pairs_need_one_contagious_and_one_susceptible() {
        let mut setup = setup();
        assert!(!can_infect_each_other(
            setup.population.get(PersonId(0)),
            setup.population.get(PersonId(1))
        ));
        make_contagious(&mut setup.population, PersonId(0));
        assert!(can_infect_each_other(
            setup.population.get(PersonId(0)),
            setup.population.get(PersonId(1))
        ));
        assert!(can_infect_each_other(
            setup.population.get(PersonId(1)),
            setup.population.get(PersonId(0))
        ));
        make_contagious(&mut setup.population, PersonId(1));
        assert!(!can_infect_each_other(
            setup.population.get(PersonId(0)),
            setup.population.get(PersonId(1))
        ));
    }

    #[test]
    fn infect_checks_preconditions_without_mutating() {
        let mut setup = setup();
        let (sick, healthy, other) = (PersonId(0), PersonId(1), PersonId(2));
        let work = setup.work;
        enter(&mut setup, sick, 0.0, work);
        enter(&mut setup, healthy, 0.0, work);

        // The infector isn't contagious yet.
        let result = infect(&mut setup.population, healthy, sick, 10.0, 0, "work");
        assert!(matches!(result, Err(EpisimError::InvariantViolation(_))));
        assert_eq!(
            setup.population.get(healthy).disease_status(),
            DiseaseStatus::Susceptible
        );

        make_contagious(&mut setup.population, sick);
        // Not in the same container.
        let result = infect(&mut setup.population, other, sick, 10.0, 0, "work");
        assert!(matches!(result, Err(EpisimError::InvariantViolation(_))));
        assert_eq!(
            setup.population.get(other).disease_status(),
            DiseaseStatus::Susceptible
        );

        // Target in full quarantine.
        setup
            .population
            .get_mut(healthy)
            .set_quarantine_status(QuarantineStatus::Full, 0);
        let result = infect(&mut setup.population, healthy, sick, 10.0, 0, "work");
        assert!(matches!(result, Err(EpisimError::InvariantViolation(_))));
        setup
            .population
            .get_mut(healthy)
            .set_quarantine_status(QuarantineStatus::None, 0);

        // Wrong direction: the target is contagious.
        let result = infect(&mut setup.population, sick, healthy, 10.0, 0, "work");
        assert!(matches!(result, Err(EpisimError::InvariantViolation(_))));
        assert_eq!(setup.population.get(sick).disease_status(), DiseaseStatus::Contagious);

        let record = infect(&mut setup.population, healthy, sick, 10.0, 0, "work").unwrap();
        assert_eq!(record.infected, healthy);
        assert_eq!(record.infector, sick);
        assert_eq!(
            setup.population.get(healthy).disease_status(),
            DiseaseStatus::InfectedButNotContagious
        );
        // Not susceptible any more.
        let result = infect(&mut setup.population, healthy, sick, 20.0, 0, "work");
        assert!(matches!(result, Err(EpisimError::InvariantViolation(_))));
    }

    #[test]
    fn infection_time_is_clamped_to_the_day() {
        let mut setup = setup();
        let (sick, healthy) = (PersonId(0), PersonId(1));
        let home = setup.home;
        enter(&mut setup, sick, 0.0, home);
        enter(&mut setup, healthy, 0.0, home);
        make_contagious(&mut setup.population, sick);

        let record = infect(&mut setup.population, healthy, sick, 2.0 * DAY + 7200.0, 1, "home").unwrap();
        assert_approx_eq!(record.time, 2.0 * DAY - 1.0);
        assert_eq!(
            setup
                .population
                .get(healthy)
                .status_time(DiseaseStatus::InfectedButNotContagious),
            Some(2.0 * DAY - 1.0)
        );
    }

    #[test]
    fn long_contact_with_high_calibration_infects() {
        let mut setup = setup();
        let (sick, healthy, other) = (PersonId(0), PersonId(1), PersonId(2));
        let (home, work) = (setup.home, setup.work);
        enter(&mut setup, sick, 0.0, work);
        enter(&mut setup, healthy, 0.0, home);
        enter(&mut setup, other, 0.0, work);
        make_contagious(&mut setup.population, sick);

        let mut config = config(1.0);
        config.tracing.probability = 1.0;
        let model = ContactModel::new(&config, Rc::new(setup.table.clone()), unrestricted(&setup.table));
        let mut rng = SmallRng::seed_from_u64(4);

        let leaving = setup.containers.leave(setup.facility, sick).unwrap();
        let records = model
            .on_leave(
                &mut setup.population,
                setup.containers.get(setup.facility),
                &leaving,
                8.0 * 3600.0,
                0,
                &mut rng,
            )
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].infected, healthy);
        assert_eq!(records[0].infection_type, "home");
        assert_eq!(records[1].infected, other);
        assert_eq!(records[1].infection_type, "work");
        assert_eq!(
            setup.population.get(sick).traceable_contacts_since(0.0),
            vec![healthy, other]
        );
        assert_eq!(
            setup.population.get(other).traceable_contacts_since(0.0),
            vec![sick]
        );
    }

    #[test]
    fn zero_calibration_never_infects() {
        let mut setup = setup();
        let (sick, healthy) = (PersonId(0), PersonId(1));
        let work = setup.work;
        enter(&mut setup, sick, 0.0, work);
        enter(&mut setup, healthy, 0.0, work);
        make_contagious(&mut setup.population, sick);

        let model = ContactModel::new(&config(0.0), Rc::new(setup.table.clone()), unrestricted(&setup.table));
        let mut rng = SmallRng::seed_from_u64(5);
        let leaving = setup.containers.leave(setup.facility, healthy).unwrap();
        let records = model
            .on_leave(
                &mut setup.population,
                setup.containers.get(setup.facility),
                &leaving,
                DAY - 1.0,
                0,
                &mut rng,
            )
            .unwrap();
        assert!(records.is_empty());
        // Tracing is off by default.
        assert_eq!(setup.population.get(healthy).traceable_contact_count(), 0);
    }
}
