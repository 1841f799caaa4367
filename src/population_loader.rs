//! Loads persons and their attributes from a tab-separated file with the
//! columns `id household district`. Empty cells leave the attribute unset.
use std::path::Path;

use csv::ReaderBuilder;
use log::info;
use serde::Deserialize;

use crate::context::Context;
use crate::error::EpisimError;
use crate::people::{ContextPeopleExt, PersonAttributes};

#[derive(Deserialize, Debug)]
struct PersonRecord {
    id: String,
    #[serde(default)]
    household: Option<String>,
    #[serde(default)]
    district: Option<String>,
}

/// Adds every person of the file to the population.
///
/// # Errors
///
/// Returns an I/O or CSV error if the file can't be read, or an error if an
/// id is listed twice.
pub fn load_population(context: &mut Context, path: &Path) -> Result<usize, EpisimError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)?;
    let mut count = 0;
    for record in reader.deserialize::<PersonRecord>() {
        let record = record?;
        context.add_person(
            &record.id,
            PersonAttributes {
                household_id: record.household.filter(|value| !value.is_empty()),
                district: record.district.filter(|value| !value.is_empty()),
            },
        )?;
        count += 1;
    }
    info!("loaded {count} persons from {}", path.display());
    Ok(count)
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn load_people_with_attributes() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id\thousehold\tdistrict").unwrap();
        writeln!(file, "a\th1\tnorth").unwrap();
        writeln!(file, "b\th1\t").unwrap();
        writeln!(file, "c").unwrap();
        file.flush().unwrap();

        let mut context = Context::new();
        assert_eq!(load_population(&mut context, file.path()).unwrap(), 3);
        let b = context.get_person_id("b").unwrap();
        let attributes = context.get_person(b).unwrap().attributes();
        assert_eq!(attributes.household_id.as_deref(), Some("h1"));
        assert_eq!(attributes.district, None);
        let c = context.get_person_id("c").unwrap();
        assert_eq!(
            context.get_person(c).unwrap().attributes(),
            &PersonAttributes::default()
        );
    }

    #[test]
    fn duplicate_id_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id\thousehold\tdistrict").unwrap();
        writeln!(file, "a\th1\tnorth").unwrap();
        writeln!(file, "a\th2\tsouth").unwrap();
        file.flush().unwrap();

        let mut context = Context::new();
        assert!(load_population(&mut context, file.path()).is_err());
    }
}
