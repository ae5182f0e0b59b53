//! Randomness source for power-on state.
//!
//! Real hardware comes up with registers in undefined states. Hosts that
//! want to surface that (so software relying on uninitialized state fails
//! reproducibly) inject a seeded generator through this seam; hosts that
//! don't simply pass none and get zeroed registers.

/// Source of randomness for power-on scrambling.
pub trait Rng {
    /// Uniform random integer in `[0, upper]` inclusive.
    fn int(&mut self, upper: u32) -> u32;
}

/// Adapter over any [`rand`] generator.
pub struct RandRng<R>(pub R);

impl<R: rand::RngCore> Rng for RandRng<R> {
    fn int(&mut self, upper: u32) -> u32 {
        rand::Rng::gen_range(&mut self.0, 0..=upper)
    }
}
