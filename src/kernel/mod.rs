//! Kernel functions for Kernel-BP precomputation

pub mod gaussian;

pub use self::gaussian::*;
pub use crate::core::traits::KernelFunction;
