use super::block_eigenspace::BlockEigenspace;
use super::error::EngineError;
use super::workspace::zeroed_matrix;
use crate::core::hessian::coupling::CouplingGraph;
use crate::core::hessian::source::HessianError;
use crate::core::linalg::block_matrix::BlockMatrix;
use nalgebra::DMatrix;
use tracing::{debug, info, instrument};

/// Projects the coupled block Hessian onto the retained block eigenbasis.
///
/// Every coupling contribution `T` between blocks `i` and `j` adds
/// `Qᵢᵀ T Qⱼ` at the `(i, j)` position of the inner matrix, and its
/// transpose at `(j, i)` when only one triangle of the coupling is stored.
/// The full electrostatic tile, when present, contributes to every pair.
#[instrument(skip_all, name = "inner_hessian_analytic")]
pub fn assemble_inner_hessian(
    coupling: &CouplingGraph,
    eigenspace: &BlockEigenspace,
) -> Result<DMatrix<f64>, EngineError> {
    let size = eigenspace.retained_total;
    let mut inner = BlockMatrix::from_matrix(0, 0, zeroed_matrix(size, size, "inner matrix")?);

    let mut contributions = 0usize;
    for contribution in coupling.contributions() {
        let count = eigenspace.sets.len();
        let row_set = eigenspace
            .sets
            .get(contribution.row_block)
            .ok_or(HessianError::BlockOutOfRange {
                block: contribution.row_block,
                count,
            })?;
        let column_set = eigenspace
            .sets
            .get(contribution.column_block)
            .ok_or(HessianError::BlockOutOfRange {
                block: contribution.column_block,
                count,
            })?;
        if row_set.retained == 0 || column_set.retained == 0 {
            continue;
        }

        let projected = row_set
            .vectors
            .transpose_product(contribution.tile)
            .product(&column_set.vectors);
        inner.accumulate(&projected);
        if contribution.mirror {
            let mirrored = BlockMatrix::from_matrix(
                projected.column_start(),
                projected.row_start(),
                projected.data().transpose(),
            );
            inner.accumulate(&mirrored);
        }
        contributions += 1;
    }

    debug!(contributions, "Coupling contributions projected.");
    info!(
        size,
        electrostatics = coupling.has_full_electrostatics(),
        "Inner matrix assembled."
    );
    Ok(inner.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hessian::coupling::CouplingKind;
    use crate::engine::block_eigenspace::BlockEigenvectorSet;

    const TOLERANCE: f64 = 1e-12;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    /// Two 1-atom blocks keeping all of their modes as the standard basis.
    fn identity_eigenspace() -> BlockEigenspace {
        let sets = (0..2)
            .map(|b| BlockEigenvectorSet {
                vectors: BlockMatrix::identity(3 * b, 3 * b, 3),
                values: vec![1.0; 3],
                retained: 3,
                rejected_candidates: 0,
            })
            .collect();
        BlockEigenspace {
            sets,
            retained_total: 6,
            max_eigenvalue: 1.0,
        }
    }

    fn full_hessian() -> DMatrix<f64> {
        let m = DMatrix::from_fn(6, 6, |r, c| (r as f64 + 1.0) * 0.1 + (c as f64) * 0.05);
        &m + m.transpose()
    }

    fn graph_from(full: &DMatrix<f64>) -> CouplingGraph {
        let mut graph = CouplingGraph::new(2);
        for b in 0..2 {
            let tile = full.view((3 * b, 3 * b), (3, 3)).into_owned();
            graph.add_edge(b, b, CouplingKind::SameBlock, BlockMatrix::from_matrix(3 * b, 3 * b, tile));
        }
        let off = full.view((0, 3), (3, 3)).into_owned();
        graph.add_edge(0, 1, CouplingKind::Adjacent, BlockMatrix::from_matrix(0, 3, off));
        graph
    }

    #[test]
    fn identity_basis_reproduces_coupled_hessian() {
        let full = full_hessian();
        let inner = assemble_inner_hessian(&graph_from(&full), &identity_eigenspace()).unwrap();
        for r in 0..6 {
            for c in 0..6 {
                assert!(f64_approx_equal(inner[(r, c)], full[(r, c)]), "({r},{c})");
            }
        }
    }

    #[test]
    fn inner_matrix_is_symmetric_for_rotated_basis() {
        let full = full_hessian();
        let mut eigenspace = identity_eigenspace();
        let (s, c) = 0.3f64.sin_cos();
        let rotation = DMatrix::from_row_slice(3, 3, &[c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0]);
        eigenspace.sets[1].vectors = BlockMatrix::from_matrix(3, 3, rotation.clone());

        let inner = assemble_inner_hessian(&graph_from(&full), &eigenspace).unwrap();
        assert!((&inner - inner.transpose()).abs().max() < TOLERANCE);

        let mut q = DMatrix::<f64>::identity(6, 6);
        q.view_mut((3, 3), (3, 3)).copy_from(&rotation);
        let expected = q.transpose() * &full * &q;
        assert!((&inner - expected).abs().max() < TOLERANCE);
    }

    #[test]
    fn full_electrostatics_contribute_to_every_pair() {
        let full = full_hessian();
        let mut graph = CouplingGraph::new(2);
        graph.set_electrostatics(Some(BlockMatrix::from_matrix(0, 0, full.clone())));
        let inner = assemble_inner_hessian(&graph, &identity_eigenspace()).unwrap();
        assert!((&inner - &full).abs().max() < TOLERANCE);
    }

    #[test]
    fn blocks_without_retained_modes_are_skipped() {
        let full = full_hessian();
        let mut eigenspace = identity_eigenspace();
        eigenspace.sets[1].vectors.column_resize(0);
        eigenspace.sets[1].retained = 0;
        eigenspace.retained_total = 3;

        let inner = assemble_inner_hessian(&graph_from(&full), &eigenspace).unwrap();
        assert_eq!(inner.shape(), (3, 3));
        assert!((&inner - full.view((0, 0), (3, 3))).abs().max() < TOLERANCE);
    }

    #[test]
    fn edge_to_unknown_block_is_rejected() {
        let mut graph = CouplingGraph::new(3);
        graph.add_edge(0, 2, CouplingKind::Nonbonded, BlockMatrix::new(0, 6, 3, 3));
        let result = assemble_inner_hessian(&graph, &identity_eigenspace());
        assert!(matches!(
            result,
            Err(EngineError::Hessian {
                source: HessianError::BlockOutOfRange { block: 2, count: 2 }
            })
        ));
    }
}
