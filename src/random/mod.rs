//! Seeded random number streams.
//!
//! Every stream is identified by a type created with `define_rng!` and is
//! seeded from the base seed of the run plus a hash of the stream's name, so
//! adding a new stream never shifts the draws of the existing ones.
mod context_ext;
mod macros;
mod sampling_algorithms;

use std::any::{Any, TypeId};
use std::cell::RefCell;

pub use context_ext::ContextRandomExt;
pub use macros::define_rng;
pub use sampling_algorithms::sample_multiple_from_known_length;

use crate::rand::SeedableRng;
use crate::{define_data_plugin, HashMap};

pub trait RngId: Copy + Clone {
    type RngType: SeedableRng;
    fn get_name() -> &'static str;
}

struct RngHolder {
    rng: Box<dyn Any>,
}

struct RngData {
    base_seed: u64,
    rng_holders: RefCell<HashMap<TypeId, RngHolder>>,
}

// `rng_holders` sits in a RefCell so that drawing only needs `&Context`.
define_data_plugin!(
    RngPlugin,
    RngData,
    RngData {
        base_seed: 0,
        rng_holders: RefCell::new(HashMap::default()),
    }
);
