//! Persons and their epidemiological state.
//!
//! A person is created once, when the population is loaded or when the
//! mobility input first mentions them, and lives for the whole run. The
//! disease status only moves along the progression graph checked by
//! `DiseaseStatus::can_transition_to`; every change is stamped with the
//! simulation time so that the progression model can count days.
mod context_extension;

use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize};

pub use context_extension::{ContextPeopleExt, Population};

use crate::containers::ContainerId;
use crate::error::EpisimError;
use crate::infection_params::ActivityId;
use crate::HashMap;

/// Seconds in a simulated day.
pub const DAY: f64 = 86_400.0;

/// The simulated day a timestamp falls on.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn day_of(time: f64) -> u32 {
    (time / DAY).floor().max(0.0) as u32
}

/// Index of a person in the population.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersonId(pub(crate) usize);

impl Display for PersonId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for PersonId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Person {}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiseaseStatus {
    Susceptible,
    InfectedButNotContagious,
    Contagious,
    ShowingSymptoms,
    SeriouslySick,
    Critical,
    Recovered,
}

impl DiseaseStatus {
    pub const ALL: [DiseaseStatus; 7] = [
        DiseaseStatus::Susceptible,
        DiseaseStatus::InfectedButNotContagious,
        DiseaseStatus::Contagious,
        DiseaseStatus::ShowingSymptoms,
        DiseaseStatus::SeriouslySick,
        DiseaseStatus::Critical,
        DiseaseStatus::Recovered,
    ];

    fn index(self) -> usize {
        match self {
            DiseaseStatus::Susceptible => 0,
            DiseaseStatus::InfectedButNotContagious => 1,
            DiseaseStatus::Contagious => 2,
            DiseaseStatus::ShowingSymptoms => 3,
            DiseaseStatus::SeriouslySick => 4,
            DiseaseStatus::Critical => 5,
            DiseaseStatus::Recovered => 6,
        }
    }

    /// The edges of the progression graph. Critical back to seriously sick
    /// is the only step backwards.
    #[must_use]
    pub fn can_transition_to(self, next: DiseaseStatus) -> bool {
        use DiseaseStatus::{
            Contagious, Critical, InfectedButNotContagious, Recovered, SeriouslySick,
            ShowingSymptoms, Susceptible,
        };
        matches!(
            (self, next),
            (Susceptible, InfectedButNotContagious)
                | (InfectedButNotContagious, Contagious)
                | (Contagious, ShowingSymptoms | Recovered)
                | (ShowingSymptoms, SeriouslySick | Recovered)
                | (SeriouslySick, Critical | Recovered)
                | (Critical, SeriouslySick | Recovered)
        )
    }
}

impl Display for DiseaseStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DiseaseStatus::Susceptible => "susceptible",
            DiseaseStatus::InfectedButNotContagious => "infectedButNotContagious",
            DiseaseStatus::Contagious => "contagious",
            DiseaseStatus::ShowingSymptoms => "showingSymptoms",
            DiseaseStatus::SeriouslySick => "seriouslySick",
            DiseaseStatus::Critical => "critical",
            DiseaseStatus::Recovered => "recovered",
        };
        f.write_str(name)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuarantineStatus {
    #[default]
    None,
    /// Fully isolated: takes no part in any contact.
    Full,
    /// Only in contact at home activities.
    AtHome,
}

/// Attributes used by seeding and tracing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PersonAttributes {
    pub household_id: Option<String>,
    pub district: Option<String>,
}

/// The facility activities of one day, in visiting order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trajectory {
    activities: Vec<ActivityId>,
    cursor: usize,
}

impl Trajectory {
    /// The activity at the cursor: the current one while inside a facility,
    /// the next one while travelling.
    #[must_use]
    pub fn current(&self) -> Option<ActivityId> {
        self.activities.get(self.cursor).copied()
    }

    /// The activity before the cursor, `None` at the start of the day.
    #[must_use]
    pub fn previous(&self) -> Option<ActivityId> {
        self.cursor
            .checked_sub(1)
            .and_then(|index| self.activities.get(index).copied())
    }

    pub fn advance(&mut self) {
        if self.cursor < self.activities.len() {
            self.cursor += 1;
        }
    }

    pub fn push(&mut self, activity: ActivityId) {
        self.activities.push(activity);
    }

    pub fn clear(&mut self) {
        self.activities.clear();
        self.cursor = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.activities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct Person {
    id: PersonId,
    external_id: String,
    attributes: PersonAttributes,
    disease_status: DiseaseStatus,
    status_times: [Option<f64>; 7],
    quarantine_status: QuarantineStatus,
    quarantine_day: Option<u32>,
    pub(crate) trajectory: Trajectory,
    pub(crate) current_container: Option<ContainerId>,
    traceable_contacts: HashMap<PersonId, f64>,
}

impl Person {
    pub(crate) fn new(id: PersonId, external_id: String, attributes: PersonAttributes) -> Person {
        Person {
            id,
            external_id,
            attributes,
            disease_status: DiseaseStatus::Susceptible,
            status_times: [None; 7],
            quarantine_status: QuarantineStatus::None,
            quarantine_day: None,
            trajectory: Trajectory::default(),
            current_container: None,
            traceable_contacts: HashMap::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> PersonId {
        self.id
    }

    /// The id used in the input files and the reports.
    #[must_use]
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    #[must_use]
    pub fn attributes(&self) -> &PersonAttributes {
        &self.attributes
    }

    #[must_use]
    pub fn disease_status(&self) -> DiseaseStatus {
        self.disease_status
    }

    /// Moves the person to `status` at time `now`.
    ///
    /// # Errors
    ///
    /// Returns `EpisimError::InvariantViolation` if the progression graph has
    /// no edge from the current status to `status`. The person is unchanged.
    pub fn set_disease_status(&mut self, now: f64, status: DiseaseStatus) -> Result<(), EpisimError> {
        if !self.disease_status.can_transition_to(status) {
            return Err(EpisimError::InvariantViolation(format!(
                "person {} can't go from {} to {status}",
                self.external_id, self.disease_status
            )));
        }
        self.disease_status = status;
        self.status_times[status.index()] = Some(now);
        Ok(())
    }

    /// When the person last entered `status`.
    #[must_use]
    pub fn status_time(&self, status: DiseaseStatus) -> Option<f64> {
        self.status_times[status.index()]
    }

    /// Whole days between entering `status` and `day`.
    #[must_use]
    pub fn days_since(&self, status: DiseaseStatus, day: u32) -> Option<u32> {
        self.status_time(status)
            .map(|time| day.saturating_sub(day_of(time)))
    }

    #[must_use]
    pub fn quarantine_status(&self) -> QuarantineStatus {
        self.quarantine_status
    }

    pub fn set_quarantine_status(&mut self, status: QuarantineStatus, day: u32) {
        self.quarantine_status = status;
        self.quarantine_day = Some(day);
    }

    #[must_use]
    pub fn days_since_quarantine(&self, day: u32) -> Option<u32> {
        self.quarantine_day
            .map(|since| day.saturating_sub(since))
    }

    #[must_use]
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    #[must_use]
    pub fn current_container(&self) -> Option<ContainerId> {
        self.current_container
    }

    /// Records a contact with `other`, keeping the latest time per person.
    pub fn add_traceable_contact(&mut self, other: PersonId, time: f64) {
        let last = self.traceable_contacts.entry(other).or_insert(time);
        if time > *last {
            *last = time;
        }
    }

    /// Persons met at or after `since`, ordered by id.
    #[must_use]
    pub fn traceable_contacts_since(&self, since: f64) -> Vec<PersonId> {
        let mut contacts: Vec<PersonId> = self
            .traceable_contacts
            .iter()
            .filter(|(_, time)| **time >= since)
            .map(|(id, _)| *id)
            .collect();
        contacts.sort_unstable();
        contacts
    }

    pub fn clear_traceable_contacts_before(&mut self, before: f64) {
        self.traceable_contacts.retain(|_, time| *time >= before);
    }

    #[must_use]
    pub fn traceable_contact_count(&self) -> usize {
        self.traceable_contacts.len()
    }
}
