use super::units::{CM, MEV};
use phf::{Map, phf_map};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Bulk properties the transport engine needs from a material.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MaterialProperties {
    /// Density in g/cm³.
    pub density: f64,
    /// Mass stopping power of a minimum-ionizing particle in MeV cm²/g.
    pub stopping_power: f64,
    /// Radiation length in cm.
    pub radiation_length: f64,
}

#[rustfmt::skip]
static NIST_MATERIALS: Map<&'static str, MaterialProperties> = phf_map! {
    "G4_Galactic" => MaterialProperties { density: 1.0e-25,   stopping_power: 1.0,   radiation_length: 6.3e26 },
    "G4_AIR"      => MaterialProperties { density: 1.20479e-3, stopping_power: 1.815, radiation_length: 30390.0 },
    "G4_lAr"      => MaterialProperties { density: 1.396,     stopping_power: 1.508, radiation_length: 14.0 },
    "G4_WATER"    => MaterialProperties { density: 1.0,       stopping_power: 1.992, radiation_length: 36.08 },
    "G4_Si"       => MaterialProperties { density: 2.33,      stopping_power: 1.664, radiation_length: 9.370 },
    "G4_Fe"       => MaterialProperties { density: 7.874,     stopping_power: 1.451, radiation_length: 1.757 },
    "G4_Pb"       => MaterialProperties { density: 11.35,     stopping_power: 1.122, radiation_length: 0.5612 },
    "G4_PLASTIC_SC_VINYLTOLUENE" => MaterialProperties { density: 1.032, stopping_power: 1.956, radiation_length: 42.54 },
};

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub properties: MaterialProperties,
}

impl Material {
    /// Mean energy loss of a unit-charge minimum-ionizing particle, in MeV/mm.
    pub fn linear_stopping_power(&self) -> f64 {
        self.properties.stopping_power * self.properties.density * MEV / CM
    }

    /// Radiation length in internal length units.
    pub fn radiation_length(&self) -> f64 {
        self.properties.radiation_length * CM
    }
}

#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("Material '{0}' is not defined in the material database")]
    NotFound(String),
    #[error("Material '{name}' has an invalid {property}: {value} (must be positive and finite)")]
    InvalidProperty {
        name: String,
        property: &'static str,
        value: f64,
    },
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
}

/// Name-keyed material lookup: the built-in NIST table plus user-defined entries.
///
/// User-defined entries shadow built-in ones with the same name.
#[derive(Debug, Clone, Default)]
pub struct MaterialDatabase {
    custom: HashMap<String, MaterialProperties>,
}

impl MaterialDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a database with the built-in table plus every material defined in `path`.
    ///
    /// The file is a TOML table of tables:
    ///
    /// ```toml
    /// [LAr_doped]
    /// density = 1.40
    /// stopping-power = 1.51
    /// radiation-length = 14.0
    /// ```
    pub fn load(path: &Path) -> Result<Self, MaterialError> {
        let mut database = Self::new();
        database.extend_from_file(path)?;
        Ok(database)
    }

    pub fn extend_from_file(&mut self, path: &Path) -> Result<(), MaterialError> {
        let content = std::fs::read_to_string(path).map_err(|e| MaterialError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let entries: HashMap<String, MaterialProperties> =
            toml::from_str(&content).map_err(|e| MaterialError::Toml {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
        debug!(
            "Loaded {} user-defined material(s) from {:?}",
            entries.len(),
            path
        );
        for (name, properties) in entries {
            self.insert(&name, properties)?;
        }
        Ok(())
    }

    pub fn insert(
        &mut self,
        name: &str,
        properties: MaterialProperties,
    ) -> Result<(), MaterialError> {
        let checks = [
            ("density", properties.density),
            ("stopping-power", properties.stopping_power),
            ("radiation-length", properties.radiation_length),
        ];
        for (property, value) in checks {
            if !(value.is_finite() && value > 0.0) {
                return Err(MaterialError::InvalidProperty {
                    name: name.to_string(),
                    property,
                    value,
                });
            }
        }
        self.custom.insert(name.to_string(), properties);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.custom.contains_key(name) || NIST_MATERIALS.contains_key(name)
    }

    /// Resolves a material by name, the way the toolkit's NIST manager does.
    pub fn find_or_build(&self, name: &str) -> Result<Material, MaterialError> {
        let properties = self
            .custom
            .get(name)
            .or_else(|| NIST_MATERIALS.get(name))
            .copied()
            .ok_or_else(|| MaterialError::NotFound(name.to_string()))?;
        Ok(Material {
            name: name.to_string(),
            properties,
        })
    }

    /// All resolvable material names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = NIST_MATERIALS
            .keys()
            .map(|k| k.to_string())
            .chain(self.custom.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}
