use std::any::TypeId;
use std::cell::RefMut;

use log::trace;

use crate::context::Context;
use crate::hashing::hash_str;
use crate::rand::distr::uniform::{SampleRange, SampleUniform};
use crate::rand::{Rng, SeedableRng};
use crate::random::{RngHolder, RngId, RngPlugin};

/// Odd multiplier used to spread consecutive day indices over the seed space.
const DAY_SEED_MULTIPLIER: u64 = 0x9E37_79B9_7F4A_7C15;

fn stream_seed<R: RngId>(base_seed: u64) -> u64 {
    base_seed.wrapping_add(hash_str(R::get_name()))
}

/// Gets a mutable reference to the generator of `R`, creating it from the
/// base seed the first time it is used.
///
/// # Panics
///
/// Panics if `init_random` was not called.
fn get_rng<R: RngId + 'static>(context: &Context) -> RefMut<'_, R::RngType> {
    let data_container = context
        .get_data(RngPlugin)
        .expect("random module used before init_random");

    let rng_holders = data_container.rng_holders.borrow_mut();
    RefMut::map(rng_holders, |holders| {
        holders
            .entry(TypeId::of::<R>())
            .or_insert_with(|| {
                trace!(
                    "creating new RNG {} (seed={})",
                    R::get_name(),
                    data_container.base_seed
                );
                RngHolder {
                    rng: Box::new(R::RngType::seed_from_u64(stream_seed::<R>(
                        data_container.base_seed,
                    ))),
                }
            })
            .rng
            .downcast_mut::<R::RngType>()
            .expect("RNG holder keyed by the wrong type")
    })
}

pub trait ContextRandomExt {
    /// Sets the base seed of the run and drops every existing stream so that
    /// they are re-seeded on next use.
    fn init_random(&mut self, base_seed: u64);

    /// Draws from the stream of `R` by applying `sampler` to it.
    fn sample<R: RngId + 'static, T>(
        &self,
        rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T;

    fn sample_range<R: RngId + 'static, S, T>(&self, rng_id: R, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform;

    /// Returns true with probability `p`.
    fn sample_bool<R: RngId + 'static>(&self, rng_id: R, p: f64) -> bool
    where
        R::RngType: Rng;

    /// Returns a fresh generator for stream `R` on simulated day `day`. The
    /// seed depends only on the base seed, the stream name and the day, so a
    /// day can be replayed without replaying the days before it.
    fn day_rng<R: RngId + 'static>(&self, rng_id: R, day: u32) -> R::RngType;
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module with seed {base_seed}");
        let data_container = self.get_data_mut(RngPlugin);
        data_container.base_seed = base_seed;
        data_container.rng_holders.borrow_mut().clear();
    }

    fn sample<R: RngId + 'static, T>(
        &self,
        _rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        let mut rng = get_rng::<R>(self);
        sampler(&mut rng)
    }

    fn sample_range<R: RngId + 'static, S, T>(&self, rng_id: R, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample(rng_id, |rng| rng.random_range(range))
    }

    fn sample_bool<R: RngId + 'static>(&self, rng_id: R, p: f64) -> bool
    where
        R::RngType: Rng,
    {
        self.sample(rng_id, |rng| rng.random_bool(p))
    }

    fn day_rng<R: RngId + 'static>(&self, _rng_id: R, day: u32) -> R::RngType {
        let base_seed = self.get_data(RngPlugin).map_or(0, |data| data.base_seed);
        let seed = stream_seed::<R>(base_seed)
            ^ u64::from(day).wrapping_add(1).wrapping_mul(DAY_SEED_MULTIPLIER);
        R::RngType::seed_from_u64(seed)
    }
}

#[cfg(test)]
mod test {
    use crate::context::Context;
    use crate::define_rng;
    use crate::rand::RngCore;
    use crate::random::context_ext::ContextRandomExt;

    define_rng!(TestStreamA);
    define_rng!(TestStreamB);

    #[test]
    fn consecutive_draws_differ() {
        let mut context = Context::new();
        context.init_random(42);

        assert_ne!(
            context.sample(TestStreamA, RngCore::next_u64),
            context.sample(TestStreamA, RngCore::next_u64)
        );
    }

    #[test]
    fn streams_are_independent() {
        let mut context = Context::new();
        context.init_random(42);

        assert_ne!(
            context.sample(TestStreamA, RngCore::next_u64),
            context.sample(TestStreamB, RngCore::next_u64)
        );
    }

    #[test]
    fn reset_seed() {
        let mut context = Context::new();
        context.init_random(42);

        let run_0 = context.sample(TestStreamA, RngCore::next_u64);
        let run_1 = context.sample(TestStreamA, RngCore::next_u64);

        context.init_random(42);
        assert_eq!(run_0, context.sample(TestStreamA, RngCore::next_u64));
        assert_eq!(run_1, context.sample(TestStreamA, RngCore::next_u64));

        context.init_random(88);
        assert_ne!(run_0, context.sample(TestStreamA, RngCore::next_u64));
    }

    #[test]
    fn day_streams_are_reproducible() {
        let mut context = Context::new();
        context.init_random(4711);

        let mut day_3 = context.day_rng(TestStreamA, 3);
        let first = day_3.next_u64();
        // Drawing from other days or the shared stream does not matter.
        let _ = context.day_rng(TestStreamA, 2).next_u64();
        let _ = context.sample(TestStreamA, RngCore::next_u64);
        assert_eq!(first, context.day_rng(TestStreamA, 3).next_u64());
        assert_ne!(first, context.day_rng(TestStreamA, 4).next_u64());
        assert_ne!(first, context.day_rng(TestStreamB, 3).next_u64());
    }

    #[test]
    fn sample_range() {
        let mut context = Context::new();
        context.init_random(42);
        let result = context.sample_range(TestStreamA, 0..10);
        assert!((0..10).contains(&result));
    }

    #[test]
    fn sample_bool_extremes() {
        let mut context = Context::new();
        context.init_random(42);
        assert!(context.sample_bool(TestStreamA, 1.0));
        assert!(!context.sample_bool(TestStreamA, 0.0));
    }
}
