use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Block {block} is empty")]
    EmptyBlock { block: usize },
    #[error("Block {block} starts at atom {found}, expected {expected} (blocks must be contiguous)")]
    NotContiguous {
        block: usize,
        expected: usize,
        found: usize,
    },
    #[error("Block {block} references residues {residues:?} outside the {available} known residues")]
    ResidueOutOfRange {
        block: usize,
        residues: Range<usize>,
        available: usize,
    },
}

/// A contiguous atom segment diagonalized as one local unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub atom_start: usize,
    pub atom_count: usize,
    /// Residues whose backbone descriptors belong to this block.
    pub residues: Range<usize>,
}

impl Block {
    pub fn atoms(&self) -> Range<usize> {
        self.atom_start..self.atom_start + self.atom_count
    }

    /// First Cartesian coordinate index of the block.
    pub fn coordinate_start(&self) -> usize {
        3 * self.atom_start
    }

    /// Number of Cartesian coordinates (rows of the block Hessian tile).
    pub fn dimension(&self) -> usize {
        3 * self.atom_count
    }

    pub fn coordinates(&self) -> Range<usize> {
        self.coordinate_start()..self.coordinate_start() + self.dimension()
    }
}

/// Partition of the system's atoms into consecutive blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockLayout {
    blocks: Vec<Block>,
}

impl BlockLayout {
    /// Validates that `blocks` tile the atom range from zero without gaps.
    pub fn new(blocks: Vec<Block>) -> Result<Self, LayoutError> {
        let mut expected = 0;
        for (index, block) in blocks.iter().enumerate() {
            if block.atom_count == 0 {
                return Err(LayoutError::EmptyBlock { block: index });
            }
            if block.atom_start != expected {
                return Err(LayoutError::NotContiguous {
                    block: index,
                    expected,
                    found: block.atom_start,
                });
            }
            expected += block.atom_count;
        }
        Ok(Self { blocks })
    }

    /// Builds consecutive blocks from atom counts, with no residue descriptors.
    pub fn from_atom_counts(counts: &[usize]) -> Result<Self, LayoutError> {
        let blocks = counts
            .iter()
            .scan(0usize, |start, &atom_count| {
                let block = Block {
                    atom_start: *start,
                    atom_count,
                    residues: 0..0,
                };
                *start += atom_count;
                Some(block)
            })
            .collect();
        Self::new(blocks)
    }

    /// Checks residue ranges against the number of residues in the topology.
    pub fn validate_residues(&self, residue_count: usize) -> Result<(), LayoutError> {
        for (index, block) in self.blocks.iter().enumerate() {
            if block.residues.end > residue_count && !block.residues.is_empty() {
                return Err(LayoutError::ResidueOutOfRange {
                    block: index,
                    residues: block.residues.clone(),
                    available: residue_count,
                });
            }
        }
        Ok(())
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn atom_count(&self) -> usize {
        self.blocks.last().map_or(0, |b| b.atom_start + b.atom_count)
    }

    /// Total Cartesian dimension `3N`.
    pub fn dimension(&self) -> usize {
        3 * self.atom_count()
    }

    /// Largest block dimension, which bounds per-block scratch sizes.
    pub fn max_block_dimension(&self) -> usize {
        self.blocks.iter().map(Block::dimension).max().unwrap_or(0)
    }
}
