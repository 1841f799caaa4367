//! Run-wide values that are set once before the simulation starts and then
//! only read. A global property is declared with `define_global_property!`,
//! optionally with a validator that is run every time a value is set.
//!
//! ```rust
//! use episim::{define_global_property, ContextGlobalPropertiesExt, Context, EpisimError};
//!
//! define_global_property!(Calibration, f64, |value: &f64| {
//!     if *value < 0.0 {
//!         return Err(EpisimError::ConfigError("calibration must be >= 0".into()));
//!     }
//!     Ok(())
//! });
//!
//! let mut context = Context::new();
//! context.set_global_property_value(Calibration, 1.2e-5).unwrap();
//! ```
use std::any::{Any, TypeId};
use std::fs;
use std::path::Path;

use log::trace;
use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::error::EpisimError;
use crate::{define_data_plugin, HashMap};

/// Defines a global property: the identifier type, the value type and an
/// optional validator `Fn(&Value) -> Result<(), EpisimError>`.
#[macro_export]
macro_rules! define_global_property {
    ($global_property:ident, $value:ty, $validate: expr) => {
        #[derive(Copy, Clone)]
        pub struct $global_property;

        impl $crate::global_properties::GlobalProperty for $global_property {
            type Value = $value;

            fn validate(val: &$value) -> Result<(), $crate::error::EpisimError> {
                $validate(val)
            }
        }
    };

    ($global_property: ident, $value: ty) => {
        $crate::define_global_property!($global_property, $value, |_| { Ok(()) });
    };
}
pub use define_global_property;

pub trait GlobalProperty: Any {
    type Value: Any;

    /// # Errors
    ///
    /// Returns an error describing why `value` is not acceptable.
    fn validate(value: &Self::Value) -> Result<(), EpisimError>;
}

struct GlobalPropertiesDataContainer {
    global_property_container: HashMap<TypeId, Box<dyn Any>>,
}

define_data_plugin!(
    GlobalPropertiesPlugin,
    GlobalPropertiesDataContainer,
    GlobalPropertiesDataContainer {
        global_property_container: HashMap::default(),
    }
);

/// Reads a JSON file and deserializes it into `T`.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, or a JSON error if its
/// content does not match `T`.
pub fn load_parameters_from_json<T: DeserializeOwned>(file_path: &Path) -> Result<T, EpisimError> {
    trace!("loading parameters from {}", file_path.display());
    let raw = fs::read_to_string(file_path)?;
    let parameters = serde_json::from_str(&raw)?;
    Ok(parameters)
}

pub trait ContextGlobalPropertiesExt {
    /// Validates and stores `value`. A property can be set only once.
    ///
    /// # Errors
    ///
    /// Returns the validator's error, or an error if the property already has
    /// a value.
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        property: T,
        value: T::Value,
    ) -> Result<(), EpisimError>;

    fn get_global_property_value<T: GlobalProperty>(&self, property: T) -> Option<&T::Value>;

    /// Loads the value of `property` from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the value
    /// fails validation.
    fn load_global_property<T: GlobalProperty>(
        &mut self,
        property: T,
        file_path: &Path,
    ) -> Result<(), EpisimError>
    where
        T::Value: DeserializeOwned;
}

impl ContextGlobalPropertiesExt for Context {
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        _property: T,
        value: T::Value,
    ) -> Result<(), EpisimError> {
        T::validate(&value)?;
        let container = &mut self
            .get_data_mut(GlobalPropertiesPlugin)
            .global_property_container;
        if container.contains_key(&TypeId::of::<T>()) {
            return Err(EpisimError::ConfigError(format!(
                "global property {} is already set",
                std::any::type_name::<T>()
            )));
        }
        container.insert(TypeId::of::<T>(), Box::new(value));
        Ok(())
    }

    fn get_global_property_value<T: GlobalProperty>(&self, _property: T) -> Option<&T::Value> {
        self.get_data(GlobalPropertiesPlugin)?
            .global_property_container
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T::Value>())
    }

    fn load_global_property<T: GlobalProperty>(
        &mut self,
        property: T,
        file_path: &Path,
    ) -> Result<(), EpisimError>
    where
        T::Value: DeserializeOwned,
    {
        let value = load_parameters_from_json::<T::Value>(file_path)?;
        self.set_global_property_value(property, value)
    }
}
