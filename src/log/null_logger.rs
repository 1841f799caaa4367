//! Used when the `logging` feature is off: only the `log` crate's max level
//! is kept in sync, nothing is printed.

use crate::log::LogConfiguration;

impl LogConfiguration {
    pub(in crate::log) fn set_config(&mut self) {
        log::set_max_level(self.global_log_level);
    }
}
