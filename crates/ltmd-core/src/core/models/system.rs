use serde::Deserialize;

/// Per-atom data the engine needs from the caller's topology.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtomRecord {
    /// Mass after any integrator-specific scaling.
    pub scaled_mass: f64,
}

/// Backbone atom indices of one residue, used to build hinge modes.
///
/// Indices are global atom indices. Residues without an alpha carbon (e.g.
/// solvent or caps) carry `alpha_carbon: None` and contribute no hinge modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResidueBackbone {
    pub alpha_carbon: Option<usize>,
    pub amide_nitrogen: usize,
    pub carbonyl_carbon: usize,
}

/// Read-only view of the caller's topology: atom masses plus backbone
/// descriptors, indexed by atom and residue respectively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    atoms: Vec<AtomRecord>,
    residues: Vec<ResidueBackbone>,
}

impl Topology {
    pub fn new(atoms: Vec<AtomRecord>, residues: Vec<ResidueBackbone>) -> Self {
        Self { atoms, residues }
    }

    /// Builds a topology from plain masses with no backbone information.
    pub fn from_masses(masses: &[f64]) -> Self {
        Self {
            atoms: masses
                .iter()
                .map(|&scaled_mass| AtomRecord { scaled_mass })
                .collect(),
            residues: Vec::new(),
        }
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn atoms(&self) -> &[AtomRecord] {
        &self.atoms
    }

    pub fn mass(&self, atom: usize) -> Option<f64> {
        self.atoms.get(atom).map(|a| a.scaled_mass)
    }

    pub fn residues(&self) -> &[ResidueBackbone] {
        &self.residues
    }

    pub fn residue(&self, index: usize) -> Option<&ResidueBackbone> {
        self.residues.get(index)
    }
}
