//! The restriction engine: maps (day, activity category) to the fraction of
//! contacts that still take place and the mask people are asked to wear.
//!
//! A `RestrictionPolicy` is compiled once from a `PolicySchedule` and the
//! shutdown days of the activity categories. Each simulated day asks it
//! for a `RestrictionSet`, which is then frozen for the whole day.
mod schedule;

use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub use schedule::{DayOrDate, PolicyBuilder, PolicySchedule, ScheduleEntry};

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::EpisimError;
use crate::infection_params::InfectionParams;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceMask {
    #[default]
    None,
    Cloth,
    Surgical,
    N95,
}

impl FaceMask {
    /// Factor applied to what a contagious wearer emits.
    #[must_use]
    pub fn shedding(self) -> f64 {
        match self {
            FaceMask::None => 1.0,
            FaceMask::Cloth => 0.6,
            FaceMask::Surgical => 0.3,
            FaceMask::N95 => 0.15,
        }
    }

    /// Factor applied to what a susceptible wearer takes in.
    #[must_use]
    pub fn intake(self) -> f64 {
        match self {
            FaceMask::None => 1.0,
            FaceMask::Cloth => 0.5,
            FaceMask::Surgical => 0.2,
            FaceMask::N95 => 0.025,
        }
    }
}

/// The restriction in effect for one activity category on one day.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Restriction {
    remaining_fraction: f64,
    mask: Option<FaceMask>,
}

impl Restriction {
    pub const UNRESTRICTED: Restriction = Restriction {
        remaining_fraction: 1.0,
        mask: None,
    };

    /// # Errors
    ///
    /// Returns `EpisimError::PolicyError` if `remaining_fraction` is not in [0, 1].
    pub fn new(remaining_fraction: f64, mask: Option<FaceMask>) -> Result<Restriction, EpisimError> {
        check_fraction(remaining_fraction)?;
        Ok(Restriction {
            remaining_fraction,
            mask,
        })
    }

    /// 1.0 is unrestricted, 0.0 fully closed.
    #[must_use]
    pub fn remaining_fraction(&self) -> f64 {
        self.remaining_fraction
    }

    /// The mask people are asked to wear, if any.
    #[must_use]
    pub fn mask(&self) -> Option<FaceMask> {
        self.mask.filter(|mask| *mask != FaceMask::None)
    }
}

fn check_fraction(remaining_fraction: f64) -> Result<(), EpisimError> {
    if (0.0..=1.0).contains(&remaining_fraction) {
        Ok(())
    } else {
        Err(EpisimError::PolicyError(format!(
            "remaining fraction {remaining_fraction} is outside [0, 1]"
        )))
    }
}

/// All restrictions of one day, indexed like the activity categories.
#[derive(Clone, Debug, PartialEq)]
pub struct RestrictionSet {
    day: u32,
    restrictions: Vec<Restriction>,
}

impl RestrictionSet {
    #[must_use]
    pub fn day(&self) -> u32 {
        self.day
    }

    /// The restriction of category `params_index`. Categories without any
    /// schedule are unrestricted.
    #[must_use]
    pub fn get(&self, params_index: usize) -> Restriction {
        self.restrictions
            .get(params_index)
            .copied()
            .unwrap_or(Restriction::UNRESTRICTED)
    }
}

/// Per category, the restriction that starts on each breakpoint day.
#[derive(Clone, Debug, Default)]
pub struct RestrictionPolicy {
    timelines: Vec<BTreeMap<u32, Restriction>>,
}

fn interpolated_points(
    d1: u32,
    d2: u32,
    v1: f64,
    v2: f64,
    mask: Option<FaceMask>,
) -> Vec<(u32, Restriction)> {
    let (low, high) = if v1 <= v2 { (v1, v2) } else { (v2, v1) };
    let span = f64::from(d2 - d1);
    (d1..=d2)
        .map(|day| {
            let value = if day == d2 {
                v2
            } else {
                let step = f64::from(day - d1);
                (v1 + (v2 - v1) * step / span).clamp(low, high)
            };
            (
                day,
                Restriction {
                    remaining_fraction: value,
                    mask,
                },
            )
        })
        .collect()
}

impl RestrictionPolicy {
    /// Compiles `schedule` for the given activity categories.
    ///
    /// Entries may only move forward in time per category: an entry starting
    /// before the last day already declared for one of its categories is an
    /// error. An entry on the same day replaces the earlier value. When the
    /// first entry of a category is an interpolation, its start value holds
    /// from day 0 on; a first point restriction leaves the days before it
    /// unrestricted. Shutdown
    /// days of the categories become point restrictions unless the schedule
    /// names that day already. `mask_override` replaces every mask the
    /// schedule asks for.
    ///
    /// # Errors
    ///
    /// Returns `EpisimError::PolicyError` for unknown activities, fractions
    /// outside [0, 1], out-of-order entries, empty or inverted interpolation
    /// ranges, and dates that can't be resolved.
    pub fn build(
        schedule: &PolicySchedule,
        categories: &[InfectionParams],
        start_date: Option<NaiveDate>,
        mask_override: Option<FaceMask>,
    ) -> Result<RestrictionPolicy, EpisimError> {
        let mut timelines = vec![BTreeMap::new(); categories.len()];
        let mut last_declared: Vec<Option<u32>> = vec![None; categories.len()];
        let apply_override = |mask: Option<FaceMask>| match (mask, mask_override) {
            (Some(FaceMask::None) | None, _) | (Some(_), None) => mask,
            (Some(_), Some(replacement)) => Some(replacement),
        };

        for entry in &schedule.restrictions {
            if entry.activities().is_empty() {
                return Err(EpisimError::PolicyError(
                    "restriction without activities".to_string(),
                ));
            }
            let indexes = entry
                .activities()
                .iter()
                .map(|name| {
                    categories
                        .iter()
                        .position(|params| &params.name == name)
                        .ok_or_else(|| {
                            EpisimError::PolicyError(format!("unknown activity {name}"))
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let points = match *entry {
                ScheduleEntry::Restrict {
                    at,
                    remaining_fraction,
                    mask,
                    ..
                } => {
                    let day = at.resolve(start_date)?;
                    vec![(day, Restriction::new(remaining_fraction, apply_override(mask))?)]
                }
                ScheduleEntry::Interpolate {
                    from,
                    to,
                    from_fraction,
                    to_fraction,
                    mask,
                    ..
                } => {
                    let d1 = from.resolve(start_date)?;
                    let d2 = to.resolve(start_date)?;
                    check_fraction(from_fraction)?;
                    check_fraction(to_fraction)?;
                    if d2 <= d1 {
                        return Err(EpisimError::PolicyError(format!(
                            "interpolation must end after it starts, got days {d1} to {d2}"
                        )));
                    }
                    interpolated_points(d1, d2, from_fraction, to_fraction, apply_override(mask))
                }
            };
            let ((first_day, first_restriction), last_day) = match (points.first(), points.last()) {
                (Some(first), Some((last, _))) => (*first, *last),
                _ => continue,
            };
            let is_interpolation = matches!(entry, ScheduleEntry::Interpolate { .. });

            for index in indexes {
                match last_declared[index] {
                    Some(previous) if first_day < previous => {
                        return Err(EpisimError::PolicyError(format!(
                            "restrictions for {} are not in day order: day {first_day} after day {previous}",
                            categories[index].name
                        )));
                    }
                    // The start value of a leading interpolation holds before it.
                    None if is_interpolation => {
                        timelines[index].insert(0, first_restriction);
                    }
                    _ => {}
                }
                timelines[index].extend(points.iter().copied());
                last_declared[index] = Some(last_day);
            }
        }

        for (index, params) in categories.iter().enumerate() {
            if let Some(shutdown_day) = params.shutdown_day {
                let restriction = Restriction::new(params.remaining_fraction, None)?;
                timelines[index].entry(shutdown_day).or_insert(restriction);
                debug!(
                    "{} shuts down on day {shutdown_day} to {}",
                    params.name, params.remaining_fraction
                );
            }
        }

        info!(
            "restriction policy with {} breakpoints",
            timelines.iter().map(BTreeMap::len).sum::<usize>()
        );
        Ok(RestrictionPolicy { timelines })
    }

    /// The restriction of category `params_index` on `day`: the value of the
    /// latest breakpoint on or before `day`, unrestricted without one.
    #[must_use]
    pub fn restriction(&self, day: u32, params_index: usize) -> Restriction {
        self.timelines
            .get(params_index)
            .and_then(|timeline| timeline.range(..=day).next_back())
            .map_or(Restriction::UNRESTRICTED, |(_, restriction)| *restriction)
    }

    #[must_use]
    pub fn restrictions_for_day(&self, day: u32) -> RestrictionSet {
        RestrictionSet {
            day,
            restrictions: (0..self.timelines.len())
                .map(|index| self.restriction(day, index))
                .collect(),
        }
    }
}

struct PolicyData {
    policy: RestrictionPolicy,
    frozen: Option<Rc<RestrictionSet>>,
}

define_data_plugin!(
    PolicyPlugin,
    PolicyData,
    PolicyData {
        policy: RestrictionPolicy::default(),
        frozen: None,
    }
);

pub trait ContextPolicyExt {
    fn set_restriction_policy(&mut self, policy: RestrictionPolicy);

    /// Computes the restrictions of `day` once and returns the same frozen
    /// set on every later call for that day.
    fn freeze_restrictions(&mut self, day: u32) -> Rc<RestrictionSet>;

    /// The set frozen by the last `freeze_restrictions` call.
    fn current_restrictions(&self) -> Option<Rc<RestrictionSet>>;
}

impl ContextPolicyExt for Context {
    fn set_restriction_policy(&mut self, policy: RestrictionPolicy) {
        let data = self.get_data_mut(PolicyPlugin);
        data.policy = policy;
        data.frozen = None;
    }

    fn freeze_restrictions(&mut self, day: u32) -> Rc<RestrictionSet> {
        let data = self.get_data_mut(PolicyPlugin);
        match &data.frozen {
            Some(frozen) if frozen.day() == day => Rc::clone(frozen),
            _ => {
                let set = Rc::new(data.policy.restrictions_for_day(day));
                data.frozen = Some(Rc::clone(&set));
                set
            }
        }
    }

    fn current_restrictions(&self) -> Option<Rc<RestrictionSet>> {
        self.get_data(PolicyPlugin)?.frozen.clone()
    }
}
