//! Precomputation of kernel matrices and factorized systems for kernel
//! belief propagation (Kernel-BP)
//!
//! Kernel-BP passes messages between nodes of a moralised dependency graph
//! in kernel feature space. The message updates reduce to small regularized
//! linear systems over Gram matrices of per-edge sample sets; this crate
//! computes those matrices offline, as full-rank Cholesky factors or
//! incomplete low-rank factorizations, and serializes them through the
//! graph-definition text protocol the inference engine loads.

pub mod core;
pub mod factorization;
pub mod kernel;
pub mod pipeline;
pub mod writer;

// Re-export main types for convenience
pub use crate::core::error::{KernelBPError, Result};
pub use crate::core::traits::KernelFunction;
pub use crate::core::types::{
    DirectedEdge, EdgeSampleMap, MoralGraph, NodeId, Observations, SamplePair,
};
pub use crate::factorization::{
    regularized_cholesky, IncompleteCholesky, IncompleteCholeskyFactors, PivotedQr, RowStore,
};
pub use crate::kernel::GaussianKernel;
pub use crate::pipeline::{FactorizationMode, PrecomputePipeline};
pub use crate::writer::GraphDefinitionWriter;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
