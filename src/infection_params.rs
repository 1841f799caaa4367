//! Activity categories and the lookup from activity labels to them.
//!
//! Labels such as `"work_2"` or `"leisure"` are interned once into an
//! `ActivityId` that carries the index of its category, so that relevance
//! decisions on the hot path never compare strings.
use std::rc::Rc;

use log::debug;

use crate::config::{InfectionParamsConfig, NameMatch};
use crate::context::Context;
use crate::error::EpisimError;
use crate::{define_data_plugin, HashMap};

/// Parameters of one activity category.
#[derive(Clone, Debug, PartialEq)]
pub struct InfectionParams {
    pub name: String,
    pub matching: NameMatch,
    pub contact_intensity: f64,
    pub shutdown_day: Option<u32>,
    pub remaining_fraction: f64,
}

impl From<&InfectionParamsConfig> for InfectionParams {
    fn from(config: &InfectionParamsConfig) -> Self {
        InfectionParams {
            name: config.name.clone(),
            matching: config.matching,
            contact_intensity: config.contact_intensity,
            shutdown_day: config.shutdown_day,
            remaining_fraction: config.remaining_fraction,
        }
    }
}

impl InfectionParams {
    fn matches(&self, label: &str) -> bool {
        match self.matching {
            NameMatch::Exact => self.name == label,
            NameMatch::Prefix => label.starts_with(&self.name),
        }
    }
}

/// An interned activity label.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActivityId(usize);

impl ActivityId {
    pub(crate) fn index(self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn for_test(index: usize) -> ActivityId {
        ActivityId(index)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ActivityTable {
    params: Vec<InfectionParams>,
    labels: Vec<String>,
    label_params: Vec<usize>,
    by_label: HashMap<String, ActivityId>,
}

impl ActivityTable {
    #[must_use]
    pub fn new(params: Vec<InfectionParams>) -> ActivityTable {
        ActivityTable {
            params,
            ..ActivityTable::default()
        }
    }

    /// Index of the category of `label`: a category named exactly like the
    /// label wins, otherwise the longest matching prefix category.
    fn resolve(&self, label: &str) -> Option<usize> {
        if let Some(index) = self.params.iter().position(|params| params.name == label) {
            return Some(index);
        }
        self.params
            .iter()
            .enumerate()
            .filter(|(_, params)| params.matches(label))
            .max_by_key(|(_, params)| params.name.len())
            .map(|(index, _)| index)
    }

    /// Returns the id of `label`, resolving its category the first time the
    /// label is seen.
    ///
    /// # Errors
    ///
    /// Returns `EpisimError::ConfigError` if no category matches `label`.
    pub fn intern(&mut self, label: &str) -> Result<ActivityId, EpisimError> {
        if let Some(id) = self.by_label.get(label) {
            return Ok(*id);
        }
        let index = self.resolve(label).ok_or_else(|| {
            EpisimError::ConfigError(format!("no infection params match activity {label}"))
        })?;
        let id = ActivityId(self.labels.len());
        debug!("activity {label} uses infection params {}", self.params[index].name);
        self.labels.push(label.to_string());
        self.label_params.push(index);
        self.by_label.insert(label.to_string(), id);
        Ok(id)
    }

    #[must_use]
    pub fn lookup(&self, label: &str) -> Option<ActivityId> {
        self.by_label.get(label).copied()
    }

    #[must_use]
    pub fn label(&self, id: ActivityId) -> &str {
        &self.labels[id.0]
    }

    /// Index of the category of an interned label.
    #[must_use]
    pub fn params_index(&self, id: ActivityId) -> usize {
        self.label_params[id.0]
    }

    #[must_use]
    pub fn params_of(&self, id: ActivityId) -> &InfectionParams {
        &self.params[self.label_params[id.0]]
    }

    #[must_use]
    pub fn categories(&self) -> &[InfectionParams] {
        &self.params
    }

    /// Interned labels, indexed by `ActivityId`.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

// Kept behind an `Rc` so that a day's replay can hold a snapshot while the
// rest of the context is mutated.
define_data_plugin!(
    pub(crate) ActivityPlugin,
    Rc<ActivityTable>,
    Rc::new(ActivityTable::default())
);

pub trait ContextActivityExt {
    fn set_activity_table(&mut self, table: ActivityTable);

    /// # Errors
    ///
    /// Returns `EpisimError::ConfigError` if no category matches `label`.
    fn intern_activity(&mut self, label: &str) -> Result<ActivityId, EpisimError>;

    /// A snapshot of the current table.
    fn activity_table(&self) -> Rc<ActivityTable>;
}

impl ContextActivityExt for Context {
    fn set_activity_table(&mut self, table: ActivityTable) {
        *self.get_data_mut(ActivityPlugin) = Rc::new(table);
    }

    fn intern_activity(&mut self, label: &str) -> Result<ActivityId, EpisimError> {
        let table = self.get_data_mut(ActivityPlugin);
        if let Some(id) = table.lookup(label) {
            return Ok(id);
        }
        Rc::make_mut(table).intern(label)
    }

    fn activity_table(&self) -> Rc<ActivityTable> {
        self.get_data(ActivityPlugin).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn category(name: &str, matching: NameMatch, contact_intensity: f64) -> InfectionParams {
        InfectionParams {
            name: name.to_string(),
            matching,
            contact_intensity,
            shutdown_day: None,
            remaining_fraction: 0.0,
        }
    }

    fn table() -> ActivityTable {
        ActivityTable::new(vec![
            category("home", NameMatch::Prefix, 3.0),
            category("work", NameMatch::Prefix, 1.0),
            category("work_office", NameMatch::Prefix, 2.0),
            category("pt", NameMatch::Exact, 10.0),
        ])
    }

    #[test]
    fn prefix_and_exact_matching() {
        let mut table = table();
        let home = table.intern("home_1").unwrap();
        assert_eq!(table.params_of(home).name, "home");

        let pt = table.intern("pt").unwrap();
        assert_eq!(table.params_index(pt), 3);
        assert!(table.intern("pt_bus").is_err());
    }

    #[test]
    fn longest_prefix_wins() {
        let mut table = table();
        let office = table.intern("work_office_3").unwrap();
        assert_eq!(table.params_of(office).name, "work_office");
        let factory = table.intern("work_factory").unwrap();
        assert_eq!(table.params_of(factory).name, "work");
    }

    #[test]
    fn interning_is_stable() {
        let mut table = table();
        let first = table.intern("home").unwrap();
        let again = table.intern("home").unwrap();
        assert_eq!(first, again);
        assert_eq!(table.label(first), "home");
        assert_eq!(table.lookup("home"), Some(first));
        assert_eq!(table.lookup("leisure"), None);
    }

    #[test]
    fn unknown_label_is_a_config_error() {
        let mut table = table();
        assert!(matches!(
            table.intern("leisure"),
            Err(EpisimError::ConfigError(_))
        ));
    }

    #[test]
    fn context_snapshot_is_not_affected_by_later_interning() {
        let mut context = Context::new();
        context.set_activity_table(table());
        let home = context.intern_activity("home").unwrap();
        let snapshot = context.activity_table();
        context.intern_activity("work").unwrap();
        assert_eq!(snapshot.label(home), "home");
        assert!(snapshot.lookup("work").is_none());
        assert!(context.activity_table().lookup("work").is_some());
    }
}
