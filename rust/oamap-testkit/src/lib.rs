//! Test utilities for the oamap crates.
//!
//! - [`data_gen`] produces seeded, randomly shaped JSON documents that ingest
//!   without ambiguity, for property-style tests.
//! - [`fixtures`] holds the small hand-written inputs shared by several test suites.

pub mod data_gen;
pub mod fixtures;

/// Runs `check` once per seed in `0..cases`, reporting the failing seed.
pub fn for_each_seed(cases: u64, mut check: impl FnMut(u64)) {
    for seed in 0..cases {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| check(seed)));
        if let Err(panic) = result {
            eprintln!("failed with seed {seed}");
            std::panic::resume_unwind(panic);
        }
    }
}
