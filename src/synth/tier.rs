//! Markers for the two execution tiers.
//!
//! Audio-tier state is advanced once per sample and must never touch the heap. Requiring
//! `Copy` makes that a compile-time property: a `Copy` type cannot own an allocation.
//! Event-tier configs hold derived coefficients and are rebuilt when parameters change.

/// Per-sample state owned by a voice slot or effect.
pub trait AudioState: Copy + Default {
    /// Returns the state to its initial value without reallocating anything.
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Coefficients derived from parameter units, recomputed at event rate.
pub trait EventConfig: Copy {}
