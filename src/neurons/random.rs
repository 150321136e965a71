//! Seedable random source shared by every stochastic term of the engine.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// The engine's random number generator.
///
/// Every stochastic function in the crate takes `&mut R where R: Rng`, so
/// tests can drive them with any seeded generator; the engine itself owns
/// one of these.
pub type NeuralRng = ChaCha8Rng;

/// Build the engine RNG, deterministic when a seed is given.
pub fn seeded_rng(seed: Option<u64>) -> NeuralRng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}
