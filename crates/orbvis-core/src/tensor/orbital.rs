use crate::kpath::KPathError;
use serde::{Deserialize, Serialize};

/// PROCAR column order for the lm-decomposed projections.
pub const ORBITAL_NAMES: [&str; 16] = [
    "s", "py", "pz", "px", "dxy", "dyz", "dz2", "dxz", "dx2-y2", "fy3x2", "fxyz", "fyz2", "fz3",
    "fxz2", "fzx2", "fx3",
];

/// Atoms and orbitals whose projection weights are summed into one curve.
///
/// Serialized as the `[[atoms], "label", [orbitals]]` triple used by the
/// `ORBITAL_INFO` configuration key. Atom and orbital indices start at 0.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "OrbitalGroupEntry", into = "OrbitalGroupEntry")]
pub struct OrbitalGroup {
    pub atoms: Vec<usize>,
    pub label: String,
    pub orbitals: Vec<usize>,
}

#[derive(Deserialize, Serialize)]
struct OrbitalGroupEntry(Vec<usize>, String, Vec<usize>);

impl From<OrbitalGroupEntry> for OrbitalGroup {
    fn from(entry: OrbitalGroupEntry) -> Self {
        Self {
            atoms: entry.0,
            label: entry.1,
            orbitals: entry.2,
        }
    }
}

impl From<OrbitalGroup> for OrbitalGroupEntry {
    fn from(group: OrbitalGroup) -> Self {
        Self(group.atoms, group.label, group.orbitals)
    }
}

impl OrbitalGroup {
    pub fn new(atoms: Vec<usize>, label: impl Into<String>, orbitals: Vec<usize>) -> Self {
        Self {
            atoms,
            label: label.into(),
            orbitals,
        }
    }

    /// Checks indices against a projection block of `n_atoms x n_orbitals`.
    pub fn validate(
        &self,
        n_atoms: usize,
        n_orbitals: usize,
        total_orbital: Option<usize>,
    ) -> Result<(), KPathError> {
        let invalid = |reason: String| KPathError::InvalidOrbitalSelection {
            group: self.label.clone(),
            reason,
        };

        if self.atoms.is_empty() || self.orbitals.is_empty() {
            return Err(invalid("needs at least one atom and one orbital".to_string()));
        }
        if let Some(atom) = self.atoms.iter().find(|atom| **atom >= n_atoms) {
            return Err(invalid(format!("atom {atom} out of range ({n_atoms} atoms)")));
        }
        if let Some(orbital) = self.orbitals.iter().find(|orbital| **orbital >= n_orbitals) {
            return Err(invalid(format!(
                "orbital {orbital} out of range ({n_orbitals} columns)"
            )));
        }
        if let Some(total) = total_orbital {
            if let Some(orbital) = self.orbitals.iter().find(|orbital| **orbital > total) {
                return Err(invalid(format!(
                    "orbital {orbital} exceeds the total column {total}"
                )));
            }
            if self.orbitals.len() > 1 && self.orbitals.contains(&total) {
                return Err(invalid(
                    "the total column cannot be mixed with other orbitals".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Legend text such as `Fe dxy+dyz` or `O tot`.
    pub fn display_label(&self, total_orbital: Option<usize>) -> String {
        let names: Vec<String> = self
            .orbitals
            .iter()
            .map(|orbital| {
                if Some(*orbital) == total_orbital {
                    "tot".to_string()
                } else {
                    ORBITAL_NAMES
                        .get(*orbital)
                        .map_or_else(|| format!("orb{orbital}"), |name| (*name).to_string())
                }
            })
            .collect();
        format!("{} {}", self.label, names.join("+"))
    }
}
