//! The run configuration. It is read once from JSON into the `Parameters`
//! global property and never changes while the simulation runs.
//!
//! ```json
//! {
//!   "calibration_parameter": 1.2e-5,
//!   "start_date": "2020-02-16",
//!   "last_day": 120,
//!   "infection_params": [
//!     { "name": "home", "contact_intensity": 3.0 },
//!     { "name": "work", "contact_intensity": 1.0, "shutdown_day": 30, "remaining_fraction": 0.2 },
//!     { "name": "pt", "matching": "exact", "contact_intensity": 10.0 }
//!   ],
//!   "tracing": { "probability": 0.5, "day_distance": 4, "delay": 1, "start_day": 20 }
//! }
//! ```
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EpisimError;
use crate::policy::{FaceMask, PolicySchedule};
use crate::{define_global_property, HashSet};

/// How the name of an activity category is compared to activity labels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameMatch {
    Exact,
    Prefix,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfectionParamsConfig {
    pub name: String,
    #[serde(default = "default_matching")]
    pub matching: NameMatch,
    #[serde(default = "default_contact_intensity")]
    pub contact_intensity: f64,
    /// From this day on the category keeps only `remaining_fraction` of its contacts.
    #[serde(default)]
    pub shutdown_day: Option<u32>,
    #[serde(default)]
    pub remaining_fraction: f64,
}

fn default_matching() -> NameMatch {
    NameMatch::Prefix
}

fn default_contact_intensity() -> f64 {
    1.0
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaskConfig {
    /// Probability that a person wears the mask a restriction asks for.
    #[serde(default)]
    pub compliance: f64,
    /// Replaces the mask type of every restriction that asks for a mask.
    #[serde(default)]
    pub mask_type: Option<FaceMask>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TracingConfig {
    pub probability: f64,
    /// How many days before symptom onset contacts are looked up.
    pub day_distance: u32,
    /// Days between symptom onset and the tracing of contacts.
    pub delay: u32,
    /// Tracing has no effect before this day.
    pub start_day: u32,
    /// Household members are always traced.
    pub quarantine_household: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        TracingConfig {
            probability: 0.0,
            day_distance: 4,
            delay: 0,
            start_day: 0,
            quarantine_household: false,
        }
    }
}

impl TracingConfig {
    /// Contacts are only worth recording when they can be traced.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.probability > 0.0 || self.quarantine_household
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EpisimConfig {
    pub seed: u64,
    pub calibration_parameter: f64,
    pub start_date: Option<NaiveDate>,
    /// Last simulated day, inclusive.
    pub last_day: u32,
    pub transit_activity: String,
    pub home_activity: String,
    pub infection_params: Vec<InfectionParamsConfig>,
    pub masks: MaskConfig,
    pub tracing: TracingConfig,
    pub initial_infections: usize,
    pub initial_infection_district: Option<String>,
    pub run_id: Option<String>,
    pub verbose_infection_log_limit: usize,
    pub policy: Option<PolicySchedule>,
}

impl Default for EpisimConfig {
    fn default() -> Self {
        EpisimConfig {
            seed: 4711,
            calibration_parameter: 0.000_002,
            start_date: None,
            last_day: 100,
            transit_activity: "pt".to_string(),
            home_activity: "home".to_string(),
            infection_params: Vec::new(),
            masks: MaskConfig::default(),
            tracing: TracingConfig::default(),
            initial_infections: 10,
            initial_infection_district: None,
            run_id: None,
            verbose_infection_log_limit: 300,
            policy: None,
        }
    }
}

fn check_probability(name: &str, value: f64) -> Result<(), EpisimError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EpisimError::ConfigError(format!(
            "{name} must be in [0, 1], got {value}"
        )))
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), EpisimError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EpisimError::ConfigError(format!(
            "{name} must be a finite value >= 0, got {value}"
        )))
    }
}

impl EpisimConfig {
    /// Checks ranges and uniqueness. Activity labels are resolved later, when
    /// they are first seen in the mobility input.
    ///
    /// # Errors
    ///
    /// Returns `EpisimError::ConfigError` naming the first offending option.
    pub fn validate(&self) -> Result<(), EpisimError> {
        check_non_negative("calibration_parameter", self.calibration_parameter)?;
        check_probability("masks.compliance", self.masks.compliance)?;
        check_probability("tracing.probability", self.tracing.probability)?;
        if self.transit_activity.is_empty() || self.home_activity.is_empty() {
            return Err(EpisimError::ConfigError(
                "transit_activity and home_activity must not be empty".to_string(),
            ));
        }

        let mut names = HashSet::default();
        for params in &self.infection_params {
            if params.name.is_empty() {
                return Err(EpisimError::ConfigError(
                    "infection params with an empty name".to_string(),
                ));
            }
            if !names.insert(params.name.as_str()) {
                return Err(EpisimError::ConfigError(format!(
                    "infection params for {} are defined twice",
                    params.name
                )));
            }
            check_non_negative(
                &format!("{}.contact_intensity", params.name),
                params.contact_intensity,
            )?;
            check_probability(
                &format!("{}.remaining_fraction", params.name),
                params.remaining_fraction,
            )?;
        }
        Ok(())
    }
}

define_global_property!(Parameters, EpisimConfig, EpisimConfig::validate);
