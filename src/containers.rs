//! Facilities and vehicles: the places where persons are co-present.
//!
//! Membership only lives for one simulated day. It is rebuilt from the
//! day's presence events and emptied by the end-of-day flush.
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::EpisimError;
use crate::infection_params::ActivityId;
use crate::people::PersonId;
use crate::{define_data_plugin, HashMap};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// Persons are there for an activity; the activity's category applies.
    Facility,
    /// Persons travel between activities; the transit category applies.
    Vehicle,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(usize);

/// A person inside a container.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Occupant {
    pub person: PersonId,
    /// Absolute simulation time of entering.
    pub enter_time: f64,
    /// The activity performed, for facilities.
    pub activity: Option<ActivityId>,
}

#[derive(Clone, Debug)]
pub struct Container {
    id: ContainerId,
    name: String,
    kind: ContainerKind,
    occupants: Vec<Occupant>,
}

impl Container {
    #[must_use]
    pub fn id(&self) -> ContainerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Current occupants in arrival order.
    #[must_use]
    pub fn occupants(&self) -> &[Occupant] {
        &self.occupants
    }

    #[must_use]
    pub fn occupant(&self, person: PersonId) -> Option<&Occupant> {
        self.occupants.iter().find(|occupant| occupant.person == person)
    }
}

/// Every container seen so far, keyed by kind and name.
#[derive(Default)]
pub struct Containers {
    containers: Vec<Container>,
    by_key: HashMap<(ContainerKind, String), ContainerId>,
}

impl Containers {
    pub fn get_or_add(&mut self, kind: ContainerKind, name: &str) -> ContainerId {
        if let Some(id) = self.by_key.get(&(kind, name.to_string())) {
            return *id;
        }
        let id = ContainerId(self.containers.len());
        self.containers.push(Container {
            id,
            name: name.to_string(),
            kind,
            occupants: Vec::new(),
        });
        self.by_key.insert((kind, name.to_string()), id);
        id
    }

    #[must_use]
    pub fn get(&self, id: ContainerId) -> &Container {
        &self.containers[id.0]
    }

    /// # Errors
    ///
    /// Returns `EpisimError::InvalidEvent` if the person is already inside.
    pub fn enter(&mut self, id: ContainerId, occupant: Occupant) -> Result<(), EpisimError> {
        let container = &mut self.containers[id.0];
        if container.occupant(occupant.person).is_some() {
            return Err(EpisimError::InvalidEvent(format!(
                "{:?} entered {} twice",
                occupant.person, container.name
            )));
        }
        container.occupants.push(occupant);
        Ok(())
    }

    /// Removes `person`, keeping the arrival order of the others.
    ///
    /// # Errors
    ///
    /// Returns `EpisimError::InvalidEvent` if the person is not inside.
    pub fn leave(&mut self, id: ContainerId, person: PersonId) -> Result<Occupant, EpisimError> {
        let container = &mut self.containers[id.0];
        let position = container
            .occupants
            .iter()
            .position(|occupant| occupant.person == person)
            .ok_or_else(|| {
                EpisimError::InvalidEvent(format!(
                    "{person:?} left {} without entering it",
                    container.name
                ))
            })?;
        Ok(container.occupants.remove(position))
    }

    /// Containers with at least one occupant, in id order.
    pub fn occupied(&self) -> impl Iterator<Item = &Container> {
        self.containers
            .iter()
            .filter(|container| !container.occupants.is_empty())
    }

    pub fn clear_occupants(&mut self) {
        for container in &mut self.containers {
            container.occupants.clear();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

define_data_plugin!(pub(crate) ContainerPlugin, Containers, Containers::default());

pub trait ContextContainerExt {
    fn containers(&self) -> Option<&Containers>;
    fn containers_mut(&mut self) -> &mut Containers;
}

impl ContextContainerExt for Context {
    fn containers(&self) -> Option<&Containers> {
        self.get_data(ContainerPlugin)
    }

    fn containers_mut(&mut self) -> &mut Containers {
        self.get_data_mut(ContainerPlugin)
    }
}
