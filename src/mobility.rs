//! Presence events from the mobility simulation.
//!
//! A day's input is an ordered list of "person enters container" and
//! "person leaves container" events. Times are seconds since the start of
//! the simulated day, so a static stream can be replayed on every day.
//!
//! Files are tab-separated:
//!
//! ```text
//! time	person	container	container_type	action	activity
//! 25200	p1	home_12	facility	leave	home
//! 25260	p1	bus_7	vehicle	enter
//! ```
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use csv::ReaderBuilder;
use log::info;
use serde::Deserialize;

use crate::containers::ContainerKind;
use crate::error::EpisimError;

#[derive(Clone, Debug, PartialEq)]
pub enum PresenceAction {
    /// Facilities carry the label of the activity performed there.
    Enter { activity: Option<String> },
    Leave,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PresenceEvent {
    /// Seconds since the start of the day. May exceed one day.
    pub time: f64,
    pub person: String,
    pub container: String,
    pub container_kind: ContainerKind,
    pub action: PresenceAction,
}

impl PresenceEvent {
    #[must_use]
    pub fn enter_facility(time: f64, person: &str, facility: &str, activity: &str) -> PresenceEvent {
        PresenceEvent {
            time,
            person: person.to_string(),
            container: facility.to_string(),
            container_kind: ContainerKind::Facility,
            action: PresenceAction::Enter {
                activity: Some(activity.to_string()),
            },
        }
    }

    #[must_use]
    pub fn enter_vehicle(time: f64, person: &str, vehicle: &str) -> PresenceEvent {
        PresenceEvent {
            time,
            person: person.to_string(),
            container: vehicle.to_string(),
            container_kind: ContainerKind::Vehicle,
            action: PresenceAction::Enter { activity: None },
        }
    }

    #[must_use]
    pub fn leave(time: f64, person: &str, kind: ContainerKind, container: &str) -> PresenceEvent {
        PresenceEvent {
            time,
            person: person.to_string(),
            container: container.to_string(),
            container_kind: kind,
            action: PresenceAction::Leave,
        }
    }
}

/// Checks what can be checked without replaying: times are finite,
/// non-negative and never decrease, and facility entries name an activity.
///
/// # Errors
///
/// Returns `EpisimError::InvalidEvent` for the first offending event.
pub fn check_events(events: &[PresenceEvent]) -> Result<(), EpisimError> {
    let mut last_time = 0.0;
    for (index, event) in events.iter().enumerate() {
        if !event.time.is_finite() || event.time < 0.0 {
            return Err(EpisimError::InvalidEvent(format!(
                "event {index} has invalid time {}",
                event.time
            )));
        }
        if event.time < last_time {
            return Err(EpisimError::InvalidEvent(format!(
                "event {index} at {} is earlier than the previous event at {last_time}",
                event.time
            )));
        }
        last_time = event.time;
        if let PresenceAction::Enter { activity: None } = event.action {
            if event.container_kind == ContainerKind::Facility {
                return Err(EpisimError::InvalidEvent(format!(
                    "{} enters facility {} without an activity",
                    event.person, event.container
                )));
            }
        }
    }
    Ok(())
}

/// Supplies the presence events of each simulated day.
pub trait EventSource {
    /// # Errors
    ///
    /// Returns an error if the events of `day` can't be produced.
    fn events_for_day(&mut self, day: u32) -> Result<Rc<[PresenceEvent]>, EpisimError>;
}

/// The same stream on every day.
pub struct ReplayEvents {
    events: Rc<[PresenceEvent]>,
}

impl ReplayEvents {
    #[must_use]
    pub fn new(events: Vec<PresenceEvent>) -> ReplayEvents {
        ReplayEvents {
            events: events.into(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the file can't be read or parsed.
    pub fn from_file(path: &Path) -> Result<ReplayEvents, EpisimError> {
        Ok(ReplayEvents::new(load_events(path)?))
    }
}

impl EventSource for ReplayEvents {
    fn events_for_day(&mut self, _day: u32) -> Result<Rc<[PresenceEvent]>, EpisimError> {
        Ok(Rc::clone(&self.events))
    }
}

/// A separate stream per day. Days without events are empty.
#[derive(Default)]
pub struct DailyEvents {
    days: BTreeMap<u32, Rc<[PresenceEvent]>>,
}

impl DailyEvents {
    #[must_use]
    pub fn new() -> DailyEvents {
        DailyEvents::default()
    }

    #[must_use]
    pub fn with_day(mut self, day: u32, events: Vec<PresenceEvent>) -> DailyEvents {
        self.days.insert(day, events.into());
        self
    }
}

impl EventSource for DailyEvents {
    fn events_for_day(&mut self, day: u32) -> Result<Rc<[PresenceEvent]>, EpisimError> {
        Ok(self
            .days
            .get(&day)
            .map_or_else(|| Rc::from(Vec::new()), Rc::clone))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum ActionColumn {
    Enter,
    Leave,
}

#[derive(Deserialize)]
struct EventRecord {
    time: f64,
    person: String,
    container: String,
    container_type: ContainerKind,
    action: ActionColumn,
    #[serde(default)]
    activity: Option<String>,
}

impl From<EventRecord> for PresenceEvent {
    fn from(record: EventRecord) -> Self {
        let action = match record.action {
            ActionColumn::Enter => PresenceAction::Enter {
                activity: record.activity.filter(|activity| !activity.is_empty()),
            },
            ActionColumn::Leave => PresenceAction::Leave,
        };
        PresenceEvent {
            time: record.time,
            person: record.person,
            container: record.container,
            container_kind: record.container_type,
            action,
        }
    }
}

/// Reads a tab-separated event file and checks it with `check_events`.
///
/// # Errors
///
/// Returns an I/O or CSV error if the file can't be read, or
/// `EpisimError::InvalidEvent` if the events are malformed.
pub fn load_events(path: &Path) -> Result<Vec<PresenceEvent>, EpisimError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)?;
    let events = reader
        .deserialize::<EventRecord>()
        .map(|record| record.map(PresenceEvent::from))
        .collect::<Result<Vec<_>, _>>()?;
    check_events(&events)?;
    info!("loaded {} presence events from {}", events.len(), path.display());
    Ok(events)
}
