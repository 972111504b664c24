use phf::{Map, phf_map};

/// Static properties of a particle species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleDefinition {
    pub name: &'static str,
    /// Rest mass in MeV.
    pub mass: f64,
    /// Charge in units of the elementary charge.
    pub charge: f64,
}

impl ParticleDefinition {
    pub fn is_charged(&self) -> bool {
        self.charge != 0.0
    }
}

#[rustfmt::skip]
static PARTICLE_TABLE: Map<&'static str, ParticleDefinition> = phf_map! {
    "e-"              => ParticleDefinition { name: "e-",              mass: 0.51099895,  charge: -1.0 },
    "e+"              => ParticleDefinition { name: "e+",              mass: 0.51099895,  charge:  1.0 },
    "mu-"             => ParticleDefinition { name: "mu-",             mass: 105.6583755, charge: -1.0 },
    "mu+"             => ParticleDefinition { name: "mu+",             mass: 105.6583755, charge:  1.0 },
    "pi-"             => ParticleDefinition { name: "pi-",             mass: 139.57039,   charge: -1.0 },
    "pi+"             => ParticleDefinition { name: "pi+",             mass: 139.57039,   charge:  1.0 },
    "proton"          => ParticleDefinition { name: "proton",          mass: 938.272088,  charge:  1.0 },
    "gamma"           => ParticleDefinition { name: "gamma",           mass: 0.0,         charge:  0.0 },
    "geantino"        => ParticleDefinition { name: "geantino",        mass: 0.0,         charge:  0.0 },
    "chargedgeantino" => ParticleDefinition { name: "chargedgeantino", mass: 0.0,         charge:  1.0 },
};

pub struct ParticleTable;

impl ParticleTable {
    pub fn find(name: &str) -> Option<&'static ParticleDefinition> {
        PARTICLE_TABLE.get(name)
    }

    pub fn names() -> Vec<&'static str> {
        let mut names: Vec<_> = PARTICLE_TABLE.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
