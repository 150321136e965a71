//! Activation signatures.
//!
//! A signature packs an activation vector into 32 bits: each activation is
//! quantized to a byte, the "high" bits are packed into a bitmap and a
//! position-weighted sum is folded over it. Equal vectors always produce the
//! same 8-character hex string.

/// Quantized activations at or above this value set their bit in the bitmap.
const HIGH_BIT_LEVEL: u64 = 128;

pub fn activation_signature<I>(activations: I) -> String
where
    I: IntoIterator<Item = f64>,
{
    let mut bitmap: u64 = 0;
    let mut weighted: u64 = 0;

    for (i, activation) in activations.into_iter().enumerate() {
        let level = (activation.clamp(0.0, 1.0) * 255.0).round() as u64;
        if level >= HIGH_BIT_LEVEL {
            bitmap ^= 1u64.rotate_left((i % 64) as u32);
        }
        weighted = weighted
            .wrapping_mul(31)
            .wrapping_add(level.wrapping_mul(i as u64 + 1));
    }

    let folded = bitmap ^ weighted.rotate_left(17);
    let word = (folded as u32) ^ ((folded >> 32) as u32);
    hex::encode(word.to_be_bytes())
}
