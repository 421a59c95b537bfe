//! Precomputation pipeline
//!
//! Walks the moralised graph and its per-edge sample data in a fixed
//! deterministic order (ascending node id, then ascending neighbor id) and
//! emits every kernel matrix and factorized system the inference engine
//! needs, through a [`GraphDefinitionWriter`]. Four sections are produced:
//!
//! 1. message-product kernels at non-observed nodes,
//! 2. kernel vectors at observed nodes,
//! 3. factorized systems for edges into observed targets,
//! 4. source-side systems for edges into non-observed targets.
//!
//! Any kernel, factorization or I/O failure aborts the whole run; outputs of
//! a failed run must not be trusted.

use crate::core::{
    DirectedEdge, EdgeSampleMap, KernelBPError, KernelFunction, MoralGraph, NodeId, Observations,
    Result, SamplePair,
};
use crate::factorization::{
    regularized_cholesky, IncompleteCholesky, IncompleteCholeskyFactors, PivotedQr,
};
use crate::writer::GraphDefinitionWriter;
use log::info;
use nalgebra::DMatrix;
use std::path::Path;

/// Which factorization the edge systems use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FactorizationMode {
    /// Direct Cholesky factor of the regularized Gram matrix.
    Full,
    /// Incomplete Cholesky with precision cutoff `eta`, re-orthogonalized
    /// through a column-pivoted QR of W·Wᵀ + K_low + λI.
    LowRank { eta: f64 },
}

/// Precomputes all matrices and systems for one Kernel-BP run.
pub struct PrecomputePipeline<'a, K: KernelFunction> {
    graph: &'a MoralGraph,
    edges: &'a [DirectedEdge],
    data: &'a EdgeSampleMap,
    observations: &'a Observations,
    kernel: &'a K,
    reg_lambda: f64,
    mode: FactorizationMode,
}

impl<'a, K: KernelFunction> PrecomputePipeline<'a, K> {
    /// Create a pipeline in full-rank mode.
    ///
    /// `reg_lambda` is the regularizer added to every Gram matrix before
    /// factorization and must be positive and finite.
    pub fn new(
        graph: &'a MoralGraph,
        edges: &'a [DirectedEdge],
        data: &'a EdgeSampleMap,
        observations: &'a Observations,
        kernel: &'a K,
        reg_lambda: f64,
    ) -> Result<Self> {
        if !(reg_lambda > 0.0 && reg_lambda.is_finite()) {
            return Err(KernelBPError::Parameter(format!(
                "reg_lambda must be positive and finite, got {}",
                reg_lambda
            )));
        }
        Ok(Self {
            graph,
            edges,
            data,
            observations,
            kernel,
            reg_lambda,
            mode: FactorizationMode::Full,
        })
    }

    /// Select the factorization mode for the edge systems.
    pub fn with_mode(mut self, mode: FactorizationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run the full precomputation, writing the graph definition to
    /// `output_path` and every matrix next to it.
    pub fn run<P: AsRef<Path>>(&self, output_path: P) -> Result<()> {
        let mut writer = GraphDefinitionWriter::new(output_path)?;

        self.write_non_observed_kernels(&mut writer)?;
        self.write_observed_kernels(&mut writer)?;
        self.write_observed_target_systems(&mut writer)?;
        self.write_non_observed_target_systems(&mut writer)?;

        writer.finalize()
    }

    /// Section 1: cross-kernels pairing each incoming message with each
    /// outgoing message at every non-observed node.
    fn write_non_observed_kernels(&self, writer: &mut GraphDefinitionWriter) -> Result<()> {
        info!("precomputing kernels for incoming messages at non-observed nodes");
        writer.comment("non-observed nodes");

        for (node, neighbors) in self.graph.iter() {
            if self.observations.contains_key(&node) {
                continue;
            }

            // nodes without a pair of distinct neighbors emit no directive
            let mut added_node = false;
            for &in_message in neighbors {
                for &out_message in neighbors {
                    if in_message == out_message {
                        continue;
                    }
                    if !added_node {
                        writer.begin_non_observed_node(node);
                        added_node = true;
                    }

                    let incoming = self.edge_samples(node, in_message)?;
                    let outgoing = self.edge_samples(out_message, node)?;
                    let kernel = self
                        .kernel
                        .cross_gram(&incoming.source, &outgoing.target)?;
                    writer.add_non_observed_kernel(node, in_message, out_message, &kernel)?;
                }
            }
        }
        Ok(())
    }

    /// Section 2: kernel vectors pairing each incoming message at an
    /// observed node with the node's observation value.
    fn write_observed_kernels(&self, writer: &mut GraphDefinitionWriter) -> Result<()> {
        info!("precomputing kernel vectors at observed nodes");
        writer.blank();
        writer.comment("observed nodes");

        for (&node, &observation) in self.observations {
            writer.begin_observed_node(node);
            let observed = DMatrix::from_row_slice(1, 1, &[observation]);

            for &out_message in self.graph.neighbors(node) {
                let samples = self.edge_samples(out_message, node)?;
                let kernel = self.kernel.cross_gram(&samples.target, &observed)?;
                writer.add_observed_kernel(node, out_message, &kernel)?;
            }
        }
        Ok(())
    }

    /// Section 3: factorized systems for every edge whose target is
    /// observed; both sides of the edge are factorized.
    fn write_observed_target_systems(&self, writer: &mut GraphDefinitionWriter) -> Result<()> {
        info!("precomputing systems for messages from observed nodes");
        writer.blank();
        writer.comment("edges with observed targets");

        for (&node, _) in self.observations {
            for &out_message in self.graph.neighbors(node) {
                let samples = self.edge_samples(out_message, node)?;
                writer.begin_edge(out_message, node);

                match self.mode {
                    FactorizationMode::Full => {
                        let l_s = self.full_rank_factor(&samples.source)?;
                        let l_t = self.full_rank_factor(&samples.target)?;
                        writer.add_edge_matrix(out_message, node, "L_s", &l_s)?;
                        writer.add_edge_matrix(out_message, node, "L_t", &l_t)?;
                    }
                    FactorizationMode::LowRank { eta } => {
                        let (source, qr_s) = self.low_rank_system(&samples.source, eta)?;
                        let (target, qr_t) = self.low_rank_system(&samples.target, eta)?;

                        writer.add_edge_matrix(out_message, node, "Q_s", &qr_s.q)?;
                        writer.add_edge_matrix(out_message, node, "R_s", &qr_s.r)?;
                        writer.add_edge_matrix(
                            out_message,
                            node,
                            "P_s",
                            &pivot_column(&qr_s.pivots),
                        )?;
                        writer.add_edge_matrix(out_message, node, "Q_t", &qr_t.q)?;
                        writer.add_edge_matrix(out_message, node, "R_t", &qr_t.r)?;
                        writer.add_edge_matrix(
                            out_message,
                            node,
                            "P_t",
                            &pivot_column(&qr_t.pivots),
                        )?;

                        let cross = &source.weights * target.weights.transpose();
                        writer.add_edge_matrix(out_message, node, "W", &cross)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Section 4: source-side systems for every edge with neither endpoint
    /// observed. The target side is intentionally not factorized here.
    fn write_non_observed_target_systems(&self, writer: &mut GraphDefinitionWriter) -> Result<()> {
        info!("precomputing systems for messages from non-observed nodes");
        writer.blank();
        writer.comment("edges with non-observed targets");

        for edge in self.edges {
            if self.observations.contains_key(&edge.source)
                || self.observations.contains_key(&edge.target)
            {
                continue;
            }

            let samples = self.edge_samples(edge.source, edge.target)?;
            writer.begin_edge(edge.source, edge.target);

            match self.mode {
                FactorizationMode::Full => {
                    let l_s = self.full_rank_factor(&samples.source)?;
                    writer.add_edge_matrix(edge.source, edge.target, "L_s", &l_s)?;
                }
                FactorizationMode::LowRank { eta } => {
                    let (_, qr_s) = self.low_rank_system(&samples.source, eta)?;
                    writer.add_edge_matrix(edge.source, edge.target, "Q_s", &qr_s.q)?;
                    writer.add_edge_matrix(edge.source, edge.target, "R_s", &qr_s.r)?;
                    writer.add_edge_matrix(
                        edge.source,
                        edge.target,
                        "P_s",
                        &pivot_column(&qr_s.pivots),
                    )?;
                }
            }
        }
        Ok(())
    }

    fn edge_samples(&self, source: NodeId, target: NodeId) -> Result<&SamplePair> {
        self.data.get(source, target).ok_or_else(|| {
            KernelBPError::Parameter(format!(
                "missing sample data for edge {}->{}",
                source, target
            ))
        })
    }

    /// Cholesky factor of the regularized Gram matrix of one sample set.
    fn full_rank_factor(&self, samples: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let gram = self.kernel.gram(samples)?;
        regularized_cholesky(&gram, self.reg_lambda)
    }

    /// Incomplete factorization of one sample set plus the pivoted QR of the
    /// re-orthogonalized system W·Wᵀ + K_low + λI.
    fn low_rank_system(
        &self,
        samples: &DMatrix<f64>,
        eta: f64,
    ) -> Result<(IncompleteCholeskyFactors, PivotedQr)> {
        let factors = IncompleteCholesky::new(self.kernel, eta)?.factorize(samples)?;

        let mut system = &factors.weights * factors.weights.transpose();
        system += &factors.pivot_gram;
        for i in 0..system.nrows() {
            system[(i, i)] += self.reg_lambda;
        }

        let qr = PivotedQr::factorize(&system)?;
        Ok((factors, qr))
    }
}

/// Pivot index vector as an r×1 matrix for the text-file protocol.
fn pivot_column(pivots: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(pivots.len(), 1, |i, _| pivots[i] as f64)
}
