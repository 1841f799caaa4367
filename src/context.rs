//! The `Context` is the kernel every simulation module plugs into. It keeps
//! the simulation clock, a queue of timed plans, and one typed data
//! container per registered data plugin.
//!
//! Modules keep their state in a data plugin and expose it through a
//! `ContextXxxExt` extension trait, so that the rest of the code only ever
//! talks to a `Context`.
use std::any::{Any, TypeId};

use log::trace;

use crate::error::EpisimError;
use crate::plan::Queue;
use crate::HashMap;

/// A type that identifies a data container stored on the `Context`.
pub trait DataPlugin: Any {
    type DataContainer: Any;

    fn create_data_container() -> Self::DataContainer;
}

/// Defines a data plugin: a marker type, the type of the data it stores and
/// the expression used to create that data the first time it is accessed
/// mutably.
#[macro_export]
macro_rules! define_data_plugin {
    ($vis:vis $plugin:ident, $data_container:ty, $default: expr) => {
        #[derive(Copy, Clone)]
        $vis struct $plugin;

        impl $crate::context::DataPlugin for $plugin {
            type DataContainer = $data_container;

            fn create_data_container() -> Self::DataContainer {
                $default
            }
        }
    };
}
pub use define_data_plugin;

type Callback = dyn FnOnce(&mut Context) -> Result<(), EpisimError>;

pub struct Context {
    plan_queue: Queue<Box<Callback>>,
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
    current_time: f64,
    shutdown_requested: bool,
}

impl Context {
    #[must_use]
    pub fn new() -> Context {
        Context {
            plan_queue: Queue::new(),
            data_plugins: HashMap::default(),
            current_time: 0.0,
            shutdown_requested: false,
        }
    }

    /// Schedules `callback` to run at `time`. An error returned by the
    /// callback stops `execute()` and is handed back to its caller.
    ///
    /// # Panics
    ///
    /// Panics if `time` is NaN, infinite or earlier than the current time.
    pub fn add_plan(
        &mut self,
        time: f64,
        callback: impl FnOnce(&mut Context) -> Result<(), EpisimError> + 'static,
    ) {
        assert!(
            !time.is_nan() && !time.is_infinite() && time >= self.current_time,
            "Invalid time value"
        );
        self.plan_queue.add_plan(time, Box::new(callback));
    }

    /// Returns a mutable reference to the data container of `T`, creating it
    /// if it doesn't exist yet.
    #[allow(clippy::missing_panics_doc)]
    pub fn get_data_mut<T: DataPlugin>(&mut self, _plugin: T) -> &mut T::DataContainer {
        self.data_plugins
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::create_data_container()))
            .downcast_mut::<T::DataContainer>()
            // Never fails: the entry was created from `T::create_data_container()`.
            .unwrap()
    }

    /// Returns a reference to the data container of `T` if it has been created.
    #[must_use]
    pub fn get_data<T: DataPlugin>(&self, _plugin: T) -> Option<&T::DataContainer> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|data| data.downcast_ref::<T::DataContainer>())
    }

    /// The current simulation time in seconds since the start of day 0.
    #[must_use]
    pub fn get_current_time(&self) -> f64 {
        self.current_time
    }

    /// Stops the simulation once the currently running plan returns. Pending
    /// plans are dropped.
    pub fn shutdown(&mut self) {
        trace!("shutdown requested at t={}", self.current_time);
        self.shutdown_requested = true;
    }

    /// Runs plans in time order until the queue is empty, `shutdown()` is
    /// called, or a plan fails.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by a plan. The remaining plans are
    /// discarded: a failed run is never continued.
    pub fn execute(&mut self) -> Result<(), EpisimError> {
        self.shutdown_requested = false;
        while let Some(plan) = self.plan_queue.get_next_plan() {
            self.current_time = plan.time;
            if let Err(error) = (plan.data)(self) {
                self.plan_queue.clear();
                return Err(error);
            }
            if self.shutdown_requested {
                self.plan_queue.clear();
                break;
            }
        }
        Ok(())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
