//! Activation function library.
//!
//! The recurrent network (see [`crate::network`]) only ever dispatches
//! through [`Activation::Sigmoid`], matching the historical NEAT convention
//! of a steep, pre-scaled sigmoid. The remaining variants are kept so the
//! library exposes the full set a genome's node genes could in principle
//! request.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Sigmoid,
    Tanh,
    Relu,
    Gaussian,
    Sin,
    Identity,
    Clamped,
}

impl Default for Activation {
    fn default() -> Self {
        Activation::Sigmoid
    }
}

/// Evaluate `kind` at `z`.
pub fn evaluate(kind: Activation, z: f64) -> f64 {
    match kind {
        Activation::Sigmoid => sigmoid(z),
        Activation::Tanh => tanh(z),
        Activation::Relu => relu(z),
        Activation::Gaussian => gaussian(z),
        Activation::Sin => sin(z),
        Activation::Identity => z,
        Activation::Clamped => clamped(z),
    }
}

/// `1 / (1 + exp(-clip(5z, -60, 60)))`.
pub fn sigmoid(z: f64) -> f64 {
    let z = (5.0 * z).clamp(-60.0, 60.0);
    1.0 / (1.0 + (-z).exp())
}

pub fn tanh(z: f64) -> f64 {
    let z = (2.5 * z).clamp(-60.0, 60.0);
    z.tanh()
}

pub fn relu(z: f64) -> f64 {
    z.max(0.0)
}

pub fn gaussian(z: f64) -> f64 {
    let z = z.clamp(-3.4, 3.4);
    (-5.0 * z * z).exp()
}

pub fn sin(z: f64) -> f64 {
    let z = (5.0 * z).clamp(-60.0, 60.0);
    z.sin()
}

pub fn clamped(z: f64) -> f64 {
    z.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_zero_is_half() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn sigmoid_saturates_for_large_input() {
        assert!(sigmoid(100.0) > 0.999999);
        assert!(sigmoid(-100.0) < 0.000001);
    }

    #[test]
    fn relu_clips_negative() {
        assert_eq!(relu(-5.0), 0.0);
        assert_eq!(relu(5.0), 5.0);
    }

    #[test]
    fn clamped_stays_in_range() {
        assert_eq!(clamped(5.0), 1.0);
        assert_eq!(clamped(-5.0), -1.0);
    }
}
