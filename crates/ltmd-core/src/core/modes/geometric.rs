use crate::core::models::block::Block;
use crate::core::models::system::Topology;
use nalgebra::{DMatrix, Point3, Vector3};
use thiserror::Error;

/// Columns whose squared norm falls below this are treated as degenerate
/// (e.g. rotations of a single atom) and dropped.
pub(crate) const DEGENERATE_NORM_SQUARED: f64 = 1e-20;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometricModeError {
    #[error("Atom {atom} referenced by block or residue is missing from the positions/topology")]
    MissingAtom { atom: usize },
    #[error("Block has zero total mass")]
    ZeroMass,
}

/// Analytically constructed basis vectors for one block, before they are
/// merged with the block's numerical eigenvectors.
///
/// Columns are unit length, in the order: rigid-body modes (translations,
/// then rotations about x, y, z), then hinge modes (phi, psi per residue).
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricModes {
    pub vectors: DMatrix<f64>,
    pub rigid_count: usize,
    pub hinge_count: usize,
}

impl GeometricModes {
    pub fn len(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.ncols() == 0
    }
}

/// Builds the rigid-body and backbone hinge modes of `block`.
///
/// All modes are mass weighted (`√m` per atom). Degenerate modes, such as the
/// rotations of a single atom or a hinge whose axis has zero length, are left
/// out, so fewer than `6 + 2·residues` columns may be returned.
pub fn build_geometric_modes(
    block: &Block,
    positions: &[Point3<f64>],
    topology: &Topology,
) -> Result<GeometricModes, GeometricModeError> {
    let atoms = block.atoms();
    let mut masses = Vec::with_capacity(block.atom_count);
    let mut coords = Vec::with_capacity(block.atom_count);
    for atom in atoms.clone() {
        let mass = topology
            .mass(atom)
            .ok_or(GeometricModeError::MissingAtom { atom })?;
        let position = positions
            .get(atom)
            .ok_or(GeometricModeError::MissingAtom { atom })?;
        masses.push(mass);
        coords.push(*position);
    }

    let total_mass: f64 = masses.iter().sum();
    if total_mass <= 0.0 {
        return Err(GeometricModeError::ZeroMass);
    }
    let center = coords
        .iter()
        .zip(&masses)
        .fold(Vector3::zeros(), |acc, (p, &m)| acc + p.coords * m)
        / total_mass;
    let inverse_norm = 1.0 / total_mass.sqrt();

    let mut columns: Vec<Vec<f64>> = Vec::new();
    let dim = block.dimension();

    for axis in 0..3 {
        let mut column = vec![0.0; dim];
        for (j, &m) in masses.iter().enumerate() {
            column[3 * j + axis] = m.sqrt() * inverse_norm;
        }
        columns.push(column);
    }

    // r × e_axis, mass weighted, for rotations about x, y and z
    let mut rotations = vec![vec![0.0; dim]; 3];
    for (j, (p, &m)) in coords.iter().zip(&masses).enumerate() {
        let d = p.coords - center;
        let f = m.sqrt() * inverse_norm;
        rotations[0][3 * j + 1] = d.z * f;
        rotations[0][3 * j + 2] = -d.y * f;
        rotations[1][3 * j] = -d.z * f;
        rotations[1][3 * j + 2] = d.x * f;
        rotations[2][3 * j] = d.y * f;
        rotations[2][3 * j + 1] = -d.x * f;
    }
    columns.extend(rotations);

    let rigid_candidates = columns.len();
    for residue in block.residues.clone() {
        let Some(backbone) = topology.residue(residue) else {
            continue;
        };
        let Some(alpha) = backbone.alpha_carbon else {
            continue;
        };
        for partner in [backbone.amide_nitrogen, backbone.carbonyl_carbon] {
            if let Some(column) = hinge_mode(block, positions, &masses, alpha, partner)? {
                columns.push(column);
            }
        }
    }

    let mut rigid_count = 0;
    let mut hinge_count = 0;
    let mut kept = Vec::with_capacity(columns.len());
    for (index, mut column) in columns.into_iter().enumerate() {
        let norm_squared: f64 = column.iter().map(|v| v * v).sum();
        if norm_squared < DEGENERATE_NORM_SQUARED {
            continue;
        }
        let scale = 1.0 / norm_squared.sqrt();
        column.iter_mut().for_each(|v| *v *= scale);
        if index < rigid_candidates {
            rigid_count += 1;
        } else {
            hinge_count += 1;
        }
        kept.push(column);
    }

    let vectors = DMatrix::from_fn(dim, kept.len(), |r, c| kept[c][r]);
    Ok(GeometricModes {
        vectors,
        rigid_count,
        hinge_count,
    })
}

/// Rotation of the block about the axis through `alpha` and `partner`.
///
/// Atoms on either side of the pivot (the larger of the two indices) move in
/// opposite directions, which is what makes this a hinge rather than a rigid
/// rotation.
fn hinge_mode(
    block: &Block,
    positions: &[Point3<f64>],
    masses: &[f64],
    alpha: usize,
    partner: usize,
) -> Result<Option<Vec<f64>>, GeometricModeError> {
    let alpha_pos = positions
        .get(alpha)
        .ok_or(GeometricModeError::MissingAtom { atom: alpha })?;
    let partner_pos = positions
        .get(partner)
        .ok_or(GeometricModeError::MissingAtom { atom: partner })?;

    let axis = alpha_pos - partner_pos;
    let length = axis.norm();
    if length < f64::EPSILON {
        return Ok(None);
    }
    let axis = axis / length;
    let pivot = alpha.max(partner);

    let mut column = vec![0.0; block.dimension()];
    for (i, atom) in block.atoms().enumerate() {
        let diff = positions[atom] - alpha_pos;
        let perpendicular = diff - axis * diff.dot(&axis);
        let sign = if atom < pivot { 1.0 } else { -1.0 };
        let w = perpendicular.cross(&axis) * (masses[i].sqrt() * sign);
        column[3 * i] = w.x;
        column[3 * i + 1] = w.y;
        column[3 * i + 2] = w.z;
    }
    Ok(Some(column))
}
