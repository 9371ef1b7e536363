pub mod run;
pub mod trial;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

/// Seeded generator; without a seed one is drawn and logged so the run can
/// be replayed.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    let seed = seed.unwrap_or_else(|| {
        let drawn = rand::random::<u64>();
        info!(seed = drawn, "no seed given; drew one");
        drawn
    });
    StdRng::seed_from_u64(seed)
}
