use log::{trace, warn};
use rand::Rng;

use crate::context::Context;
use crate::error::EpisimError;
use crate::people::{Person, PersonAttributes, PersonId};
use crate::random::{sample_multiple_from_known_length, ContextRandomExt, RngId};
use crate::{define_data_plugin, HashMap};

/// Every person of the run, indexed by `PersonId`.
#[derive(Default)]
pub struct Population {
    persons: Vec<Person>,
    by_external_id: HashMap<String, PersonId>,
}

impl Population {
    /// # Errors
    ///
    /// Returns an error if a person with `external_id` already exists.
    pub fn add_person(
        &mut self,
        external_id: &str,
        attributes: PersonAttributes,
    ) -> Result<PersonId, EpisimError> {
        if self.by_external_id.contains_key(external_id) {
            return Err(EpisimError::EpisimError(format!(
                "person {external_id} is defined twice"
            )));
        }
        Ok(self.push(external_id, attributes))
    }

    /// The id of `external_id`, creating a person without attributes if the
    /// id is new.
    pub fn get_or_add_person(&mut self, external_id: &str) -> PersonId {
        match self.by_external_id.get(external_id) {
            Some(id) => *id,
            None => {
                trace!("creating person {external_id} first seen in mobility input");
                self.push(external_id, PersonAttributes::default())
            }
        }
    }

    fn push(&mut self, external_id: &str, attributes: PersonAttributes) -> PersonId {
        let id = PersonId(self.persons.len());
        self.persons
            .push(Person::new(id, external_id.to_string(), attributes));
        self.by_external_id.insert(external_id.to_string(), id);
        id
    }

    #[must_use]
    pub fn lookup(&self, external_id: &str) -> Option<PersonId> {
        self.by_external_id.get(external_id).copied()
    }

    #[must_use]
    pub fn get(&self, id: PersonId) -> &Person {
        &self.persons[id.0]
    }

    pub fn get_mut(&mut self, id: PersonId) -> &mut Person {
        &mut self.persons[id.0]
    }

    /// Mutable access to two different persons at once.
    ///
    /// # Panics
    ///
    /// Panics if `a == b`.
    pub fn get_pair_mut(&mut self, a: PersonId, b: PersonId) -> (&mut Person, &mut Person) {
        assert_ne!(a, b, "a person can't be paired with themselves");
        if a.0 < b.0 {
            let (low, high) = self.persons.split_at_mut(b.0);
            (&mut low[a.0], &mut high[0])
        } else {
            let (low, high) = self.persons.split_at_mut(a.0);
            (&mut high[0], &mut low[b.0])
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.persons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    /// Persons in id order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Person> {
        self.persons.iter()
    }

    pub fn ids(&self) -> impl ExactSizeIterator<Item = PersonId> {
        (0..self.persons.len()).map(PersonId)
    }
}

define_data_plugin!(pub(crate) PopulationPlugin, Population, Population::default());

pub trait ContextPeopleExt {
    fn get_current_population(&self) -> usize;

    /// # Errors
    ///
    /// Returns an error if a person with `external_id` already exists.
    fn add_person(
        &mut self,
        external_id: &str,
        attributes: PersonAttributes,
    ) -> Result<PersonId, EpisimError>;

    fn get_person_id(&self, external_id: &str) -> Option<PersonId>;

    fn get_person(&self, person_id: PersonId) -> Option<&Person>;

    fn population(&self) -> Option<&Population>;

    fn population_mut(&mut self) -> &mut Population;

    /// Samples up to `n` distinct persons among those accepted by `filter`,
    /// in id order. Returns fewer if fewer match.
    fn sample_people<R: RngId + 'static>(
        &self,
        rng_id: R,
        filter: impl Fn(&Person) -> bool,
        n: usize,
    ) -> Vec<PersonId>
    where
        R::RngType: Rng;
}

impl ContextPeopleExt for Context {
    fn get_current_population(&self) -> usize {
        self.population().map_or(0, Population::len)
    }

    fn add_person(
        &mut self,
        external_id: &str,
        attributes: PersonAttributes,
    ) -> Result<PersonId, EpisimError> {
        self.population_mut().add_person(external_id, attributes)
    }

    fn get_person_id(&self, external_id: &str) -> Option<PersonId> {
        self.population()?.lookup(external_id)
    }

    fn get_person(&self, person_id: PersonId) -> Option<&Person> {
        self.population()?.persons.get(person_id.0)
    }

    fn population(&self) -> Option<&Population> {
        self.get_data(PopulationPlugin)
    }

    fn population_mut(&mut self) -> &mut Population {
        self.get_data_mut(PopulationPlugin)
    }

    fn sample_people<R: RngId + 'static>(
        &self,
        rng_id: R,
        filter: impl Fn(&Person) -> bool,
        n: usize,
    ) -> Vec<PersonId>
    where
        R::RngType: Rng,
    {
        let candidates: Vec<PersonId> = self
            .population()
            .map(|population| {
                population
                    .iter()
                    .filter(|person| filter(person))
                    .map(Person::id)
                    .collect()
            })
            .unwrap_or_default();
        if candidates.len() < n {
            warn!(
                "requested a sample of {n} people from {} candidates",
                candidates.len()
            );
        }
        self.sample(rng_id, |rng| {
            sample_multiple_from_known_length(rng, candidates.into_iter(), n)
        })
    }
}
