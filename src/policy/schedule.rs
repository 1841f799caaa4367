//! The declarative restriction schedule, as written in JSON or built in code.
//!
//! ```json
//! {"restrictions": [
//!   {"type": "restrict", "at": "2020-03-14", "remaining_fraction": 0.1, "activities": ["educ"]},
//!   {"type": "interpolate", "from": 20, "to": 30, "from_fraction": 1.0, "to_fraction": 0.4,
//!    "mask": "cloth", "activities": ["shop", "leisure"]}
//! ]}
//! ```
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EpisimError;
use crate::policy::FaceMask;

/// A simulated day or a calendar date resolved against the start date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DayOrDate {
    Day(u32),
    Date(NaiveDate),
}

impl DayOrDate {
    /// The simulated day this refers to.
    ///
    /// # Errors
    ///
    /// Returns `EpisimError::PolicyError` for a date without a start date or a
    /// date before the start date.
    pub fn resolve(self, start_date: Option<NaiveDate>) -> Result<u32, EpisimError> {
        match self {
            DayOrDate::Day(day) => Ok(day),
            DayOrDate::Date(date) => {
                let start = start_date.ok_or_else(|| {
                    EpisimError::PolicyError(format!(
                        "{date} can't be resolved without a start date"
                    ))
                })?;
                let days = (date - start).num_days();
                u32::try_from(days).map_err(|_| {
                    EpisimError::PolicyError(format!("{date} is before the start date {start}"))
                })
            }
        }
    }
}

impl From<u32> for DayOrDate {
    fn from(day: u32) -> Self {
        DayOrDate::Day(day)
    }
}

impl From<NaiveDate> for DayOrDate {
    fn from(date: NaiveDate) -> Self {
        DayOrDate::Date(date)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScheduleEntry {
    /// From `at` on, the activities keep `remaining_fraction` of their contacts.
    Restrict {
        at: DayOrDate,
        remaining_fraction: f64,
        #[serde(default)]
        mask: Option<FaceMask>,
        activities: Vec<String>,
    },
    /// Linear change from `from_fraction` on day `from` to `to_fraction` on
    /// day `to`; `to_fraction` holds afterwards.
    Interpolate {
        from: DayOrDate,
        to: DayOrDate,
        from_fraction: f64,
        to_fraction: f64,
        #[serde(default)]
        mask: Option<FaceMask>,
        activities: Vec<String>,
    },
}

impl ScheduleEntry {
    #[must_use]
    pub fn activities(&self) -> &[String] {
        match self {
            ScheduleEntry::Restrict { activities, .. }
            | ScheduleEntry::Interpolate { activities, .. } => activities,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySchedule {
    #[serde(default)]
    pub restrictions: Vec<ScheduleEntry>,
}

impl PolicySchedule {
    /// # Errors
    ///
    /// Returns `EpisimError::JsonError` if `json` is not a valid schedule.
    pub fn from_json(json: &str) -> Result<PolicySchedule, EpisimError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Builds a `PolicySchedule` in code. Days are simulated days; calendar
/// dates are only available in the JSON form.
///
/// ```rust
/// use episim::policy::{FaceMask, PolicyBuilder};
///
/// let schedule = PolicyBuilder::new()
///     .restrict(10, 0.5, &["work", "leisure"])
///     .interpolate_with_mask(20, 30, 0.5, 0.2, FaceMask::Cloth, &["pt"])
///     .build();
/// assert_eq!(schedule.restrictions.len(), 2);
/// ```
#[derive(Default)]
pub struct PolicyBuilder {
    restrictions: Vec<ScheduleEntry>,
}

fn to_strings(activities: &[&str]) -> Vec<String> {
    activities.iter().map(ToString::to_string).collect()
}

impl PolicyBuilder {
    #[must_use]
    pub fn new() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    #[must_use]
    pub fn restrict(
        mut self,
        at: u32,
        remaining_fraction: f64,
        activities: &[&str],
    ) -> PolicyBuilder {
        self.restrictions.push(ScheduleEntry::Restrict {
            at: at.into(),
            remaining_fraction,
            mask: None,
            activities: to_strings(activities),
        });
        self
    }

    #[must_use]
    pub fn restrict_with_mask(
        mut self,
        at: u32,
        remaining_fraction: f64,
        mask: FaceMask,
        activities: &[&str],
    ) -> PolicyBuilder {
        self.restrictions.push(ScheduleEntry::Restrict {
            at: at.into(),
            remaining_fraction,
            mask: Some(mask),
            activities: to_strings(activities),
        });
        self
    }

    #[must_use]
    pub fn interpolate(
        mut self,
        from: u32,
        to: u32,
        from_fraction: f64,
        to_fraction: f64,
        activities: &[&str],
    ) -> PolicyBuilder {
        self.restrictions.push(ScheduleEntry::Interpolate {
            from: from.into(),
            to: to.into(),
            from_fraction,
            to_fraction,
            mask: None,
            activities: to_strings(activities),
        });
        self
    }

    #[must_use]
    pub fn interpolate_with_mask(
        mut self,
        from: u32,
        to: u32,
        from_fraction: f64,
        to_fraction: f64,
        mask: FaceMask,
        activities: &[&str],
    ) -> PolicyBuilder {
        self.restrictions.push(ScheduleEntry::Interpolate {
            from: from.into(),
            to: to.into(),
            from_fraction,
            to_fraction,
            mask: Some(mask),
            activities: to_strings(activities),
        });
        self
    }

    #[must_use]
    pub fn build(self) -> PolicySchedule {
        PolicySchedule {
            restrictions: self.restrictions,
        }
    }
}
