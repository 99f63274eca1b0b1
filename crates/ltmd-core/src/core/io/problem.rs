use crate::core::hessian::coupling::{CouplingGraph, CouplingKind};
use crate::core::hessian::source::{HessianError, PrecomputedBlockHessian};
use crate::core::linalg::block_matrix::BlockMatrix;
use crate::core::models::block::{Block, BlockLayout, LayoutError};
use crate::core::models::system::{AtomRecord, ResidueBackbone, Topology};
use nalgebra::{DMatrix, Point3};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProblemLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Matrix '{context}' is ragged: row {row} has {found} entries, expected {expected}")]
    RaggedMatrix {
        context: String,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Problem defines {atoms} atoms but its blocks cover {covered}")]
    AtomCoverage { atoms: usize, covered: usize },
    #[error("Invalid block layout: {0}")]
    Layout(#[from] LayoutError),
    #[error("Invalid block Hessian: {0}")]
    Hessian(#[from] HessianError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct AtomEntry {
    mass: f64,
    position: [f64; 3],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct BlockEntry {
    atom_count: usize,
    #[serde(default)]
    residues: Option<[usize; 2]>,
    hessian: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct CouplingEntry {
    from: usize,
    to: usize,
    kind: CouplingKind,
    tile: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ProblemFile {
    #[serde(default)]
    electrostatics: Option<Vec<Vec<f64>>>,
    atoms: Vec<AtomEntry>,
    #[serde(default)]
    residues: Vec<ResidueBackbone>,
    blocks: Vec<BlockEntry>,
    #[serde(default)]
    couplings: Vec<CouplingEntry>,
}

/// A system ready for diagonalization: positions and topology owned by the
/// caller, plus a precomputed block Hessian.
#[derive(Debug, Clone)]
pub struct Problem {
    pub positions: Vec<Point3<f64>>,
    pub topology: Topology,
    pub hessian: PrecomputedBlockHessian,
}

impl Problem {
    pub fn load(path: &Path) -> Result<Self, ProblemLoadError> {
        let label = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| ProblemLoadError::Io {
            path: label.clone(),
            source: e,
        })?;
        Self::parse(&content, &label)
    }

    /// Parses a problem from TOML text; `origin` names the source in errors.
    pub fn parse(content: &str, origin: &str) -> Result<Self, ProblemLoadError> {
        let file: ProblemFile = toml::from_str(content).map_err(|e| ProblemLoadError::Toml {
            path: origin.to_string(),
            source: e,
        })?;
        file.into_problem()
    }
}

impl ProblemFile {
    fn into_problem(self) -> Result<Problem, ProblemLoadError> {
        let positions: Vec<Point3<f64>> = self
            .atoms
            .iter()
            .map(|a| Point3::new(a.position[0], a.position[1], a.position[2]))
            .collect();
        let atoms = self
            .atoms
            .iter()
            .map(|a| AtomRecord { scaled_mass: a.mass })
            .collect();
        let topology = Topology::new(atoms, self.residues);

        let mut blocks = Vec::with_capacity(self.blocks.len());
        let mut next_atom = 0;
        for entry in &self.blocks {
            let residues = entry.residues.map_or(0..0, |[start, end]| start..end);
            blocks.push(Block {
                atom_start: next_atom,
                atom_count: entry.atom_count,
                residues,
            });
            next_atom += entry.atom_count;
        }
        let layout = BlockLayout::new(blocks)?;
        if layout.atom_count() != topology.atom_count() {
            return Err(ProblemLoadError::AtomCoverage {
                atoms: topology.atom_count(),
                covered: layout.atom_count(),
            });
        }
        layout.validate_residues(topology.residues().len())?;

        let mut tiles = Vec::with_capacity(layout.len());
        for (index, (block, entry)) in layout.blocks().iter().zip(&self.blocks).enumerate() {
            let data = dense(&format!("blocks[{index}].hessian"), &entry.hessian)?;
            let start = block.coordinate_start();
            tiles.push(BlockMatrix::from_matrix(start, start, data));
        }

        let mut coupling = CouplingGraph::new(layout.len());
        for (index, entry) in self.couplings.iter().enumerate() {
            let data = dense(&format!("couplings[{index}].tile"), &entry.tile)?;
            let count = layout.len();
            let row_start = layout
                .block(entry.from)
                .ok_or(HessianError::BlockOutOfRange {
                    block: entry.from,
                    count,
                })?
                .coordinate_start();
            let column_start = layout
                .block(entry.to)
                .ok_or(HessianError::BlockOutOfRange {
                    block: entry.to,
                    count,
                })?
                .coordinate_start();
            coupling.add_edge(
                entry.from,
                entry.to,
                entry.kind,
                BlockMatrix::from_matrix(row_start, column_start, data),
            );
        }
        if let Some(rows) = &self.electrostatics {
            let data = dense("electrostatics", rows)?;
            coupling.set_electrostatics(Some(BlockMatrix::from_matrix(0, 0, data)));
        }

        let hessian = PrecomputedBlockHessian::new(layout, tiles, coupling)?;
        Ok(Problem {
            positions,
            topology,
            hessian,
        })
    }
}

fn dense(context: &str, rows: &[Vec<f64>]) -> Result<DMatrix<f64>, ProblemLoadError> {
    let columns = rows.first().map_or(0, Vec::len);
    if let Some((row, found)) = rows
        .iter()
        .map(Vec::len)
        .enumerate()
        .find(|&(_, len)| len != columns)
    {
        return Err(ProblemLoadError::RaggedMatrix {
            context: context.to_string(),
            row,
            expected: columns,
            found,
        });
    }
    Ok(DMatrix::from_fn(rows.len(), columns, |r, c| rows[r][c]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hessian::source::BlockHessianSource;
    use std::fs;
    use tempfile::tempdir;

    const TWO_BLOCKS: &str = r#"
        [[atoms]]
        mass = 12.0
        position = [0.0, 0.0, 0.0]

        [[atoms]]
        mass = 14.0
        position = [1.5, 0.0, 0.0]

        [[blocks]]
        atom-count = 1
        hessian = [[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]]

        [[blocks]]
        atom-count = 1
        hessian = [[5.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 5.0]]

        [[couplings]]
        from = 1
        to = 0
        kind = "adjacent"
        tile = [[0.1, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]]
    "#;

    #[test]
    fn parse_builds_positions_topology_and_hessian() {
        let problem = Problem::parse(TWO_BLOCKS, "inline").unwrap();
        assert_eq!(problem.positions[1], Point3::new(1.5, 0.0, 0.0));
        assert_eq!(problem.topology.mass(1), Some(14.0));
        assert_eq!(problem.hessian.layout().len(), 2);

        let adjacent: Vec<_> = problem
            .hessian
            .coupling()
            .edges_of_kind(CouplingKind::Adjacent)
            .collect();
        assert_eq!(adjacent.len(), 1);
        assert_eq!((adjacent[0].from, adjacent[0].to), (0, 1));
        assert_eq!(adjacent[0].tile[(0, 3)], 0.1);
    }

    #[test]
    fn load_reads_problem_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("problem.toml");
        fs::write(&path, TWO_BLOCKS).unwrap();
        let problem = Problem::load(&path).unwrap();
        assert_eq!(problem.topology.atom_count(), 2);
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let result = Problem::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ProblemLoadError::Io { .. })));
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        let content = TWO_BLOCKS.replace(
            "atom-count = 1\n        hessian",
            "atom-count = 1\n        bogus = 1\n        hessian",
        );
        let result = Problem::parse(&content, "inline");
        assert!(matches!(result, Err(ProblemLoadError::Toml { .. })));
    }

    #[test]
    fn ragged_hessian_rows_are_rejected() {
        let content = TWO_BLOCKS.replace(
            "[[2.0, 0.0, 0.0], [0.0, 2.0, 0.0]",
            "[[2.0, 0.0, 0.0], [0.0, 2.0]",
        );
        let err = Problem::parse(&content, "inline").unwrap_err();
        assert!(matches!(
            err,
            ProblemLoadError::RaggedMatrix {
                row: 1,
                expected: 3,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn blocks_must_cover_every_atom() {
        let content = TWO_BLOCKS.replace(
            "[[atoms]]\n        mass = 12.0",
            "[[atoms]]\n        mass = 1.0\n        position = [9.0, 9.0, 9.0]\n\n        [[atoms]]\n        mass = 12.0",
        );
        let err = Problem::parse(&content, "inline").unwrap_err();
        assert!(matches!(
            err,
            ProblemLoadError::AtomCoverage {
                atoms: 3,
                covered: 2
            }
        ));
    }

    #[test]
    fn coupling_listed_from_both_sides_is_rejected() {
        let content = format!(
            "{TWO_BLOCKS}\n{}",
            r#"
            [[couplings]]
            from = 0
            to = 1
            kind = "adjacent"
            tile = [[0.1, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]]
            "#
        );
        let err = Problem::parse(&content, "inline").unwrap_err();
        assert!(matches!(
            err,
            ProblemLoadError::Hessian(HessianError::DuplicateCoupling {
                kind: CouplingKind::Adjacent,
                from: 0,
                to: 1
            })
        ));
    }

    #[test]
    fn wrongly_sized_block_hessian_is_rejected() {
        let content = TWO_BLOCKS.replace(
            "hessian = [[5.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 5.0]]",
            "hessian = [[5.0]]",
        );
        let err = Problem::parse(&content, "inline").unwrap_err();
        assert!(matches!(
            err,
            ProblemLoadError::Hessian(HessianError::TileShape { .. })
        ));
    }
}
