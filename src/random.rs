//! Seeded random number generators, one per purpose.
//!
//! Each use of randomness (picking errands, rolling for death, choosing who
//! starts out infected) draws from its own generator. A generator is created
//! lazily from the base seed plus a hash of its name, so adding draws to one
//! purpose never shifts the sequence seen by another.
use std::any::{Any, TypeId};
use std::cell::{RefCell, RefMut};

use crate::context::Context;
use crate::hashing::hash_str;
use crate::rand::distr::uniform::{SampleRange, SampleUniform};
use crate::rand::{Rng, SeedableRng};
use crate::{define_data_plugin, trace, HashMap, HashMapExt};

/// Use this to define a unique type which will be used as a key to retrieve
/// an independent rng instance.
#[macro_export]
macro_rules! define_rng {
    ($random_id:ident) => {
        #[derive(Copy, Clone)]
        struct $random_id;

        impl $crate::random::RngId for $random_id {
            type RngType = $crate::rand::rngs::SmallRng;

            fn get_name() -> &'static str {
                stringify!($random_id)
            }
        }

        // This ensures that you can't define two RngIds with the same name
        $crate::paste::paste! {
            #[doc(hidden)]
            #[no_mangle]
            #[allow(non_upper_case_globals)]
            pub static [<rng_name_duplication_guard_ $random_id>]: () = ();
        }
    };
}
pub use define_rng;

pub trait RngId: Copy + Clone + Any {
    type RngType: SeedableRng + Rng;
    fn get_name() -> &'static str;
}

struct RngData {
    base_seed: u64,
    // Behind a RefCell so sampling only needs `&Context`
    rng_holders: RefCell<HashMap<TypeId, Box<dyn Any>>>,
}

define_data_plugin!(
    RngPlugin,
    RngData,
    RngData {
        base_seed: 0,
        rng_holders: RefCell::new(HashMap::new()),
    }
);

fn get_rng<R: RngId>(context: &Context) -> RefMut<R::RngType> {
    let data_container = context
        .get_data(RngPlugin)
        .expect("You must initialize the random number generator with a base seed");

    let rng_holders = data_container
        .rng_holders
        .try_borrow_mut()
        .expect("a random number generator is already borrowed");
    RefMut::map(rng_holders, |holders| {
        holders
            .entry(TypeId::of::<R>())
            .or_insert_with(|| {
                let seed = data_container
                    .base_seed
                    .wrapping_add(hash_str(R::get_name()));
                trace!("creating rng {} (seed={seed})", R::get_name());
                Box::new(R::RngType::seed_from_u64(seed))
            })
            .downcast_mut::<R::RngType>()
            .expect("rng holder has the wrong type")
    })
}

pub trait ContextRandomExt {
    /// Sets the base seed and forgets every generator so they are re-seeded
    /// on next use.
    fn init_random(&mut self, base_seed: u64);

    /// Runs `sampler` against the generator for `R`.
    ///
    /// # Panics
    ///
    /// Panics if `init_random` was not called.
    fn sample<R: RngId, T>(&self, rng_id: R, sampler: impl FnOnce(&mut R::RngType) -> T) -> T;

    /// Uniform sample from `range`.
    fn sample_range<R: RngId, S, T>(&self, rng_id: R, range: S) -> T
    where
        S: SampleRange<T>,
        T: SampleUniform;

    /// True with probability `p`.
    fn sample_bool<R: RngId>(&self, rng_id: R, p: f64) -> bool;

    /// Uniform draw from [0, 1).
    fn sample_unit<R: RngId>(&self, rng_id: R) -> f64;

    /// `amount` distinct indices from `0..length`, in random order.
    fn sample_indices<R: RngId>(&self, rng_id: R, length: usize, amount: usize) -> Vec<usize>;
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module with seed {base_seed}");
        let data_container = self.get_data_mut(RngPlugin);
        data_container.base_seed = base_seed;
        data_container.rng_holders.get_mut().clear();
    }

    fn sample<R: RngId, T>(&self, _rng_id: R, sampler: impl FnOnce(&mut R::RngType) -> T) -> T {
        let mut rng = get_rng::<R>(self);
        sampler(&mut rng)
    }

    fn sample_range<R: RngId, S, T>(&self, rng_id: R, range: S) -> T
    where
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample(rng_id, |rng| rng.random_range(range))
    }

    fn sample_bool<R: RngId>(&self, rng_id: R, p: f64) -> bool {
        self.sample(rng_id, |rng| rng.random_bool(p))
    }

    fn sample_unit<R: RngId>(&self, rng_id: R) -> f64 {
        self.sample(rng_id, |rng| rng.random::<f64>())
    }

    fn sample_indices<R: RngId>(&self, rng_id: R, length: usize, amount: usize) -> Vec<usize> {
        self.sample(rng_id, |rng| {
            crate::rand::seq::index::sample(rng, length, amount).into_vec()
        })
    }
}
