/// Values used when neither the configuration file nor the command line sets them.
/// Lengths are in the units the file uses (metres unless the key says otherwise).
pub struct DefaultsConfig {
    pub world_name: String,
    pub world_material: String,
    pub world_half_extent_m: f64,
    pub detector_name: String,
    pub detector_material: String,
    pub detector_half_extent_m: f64,
    pub particle: String,
    pub energy_gev: f64,
    pub launch_radius_m: f64,
    pub theta: (f64, f64, f64, bool),
    pub phi: (f64, f64, f64, bool),
    pub physics_list: String,
    pub max_step_mm: f64,
    pub tracking_cut_mev: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            world_name: "World".to_string(),
            world_material: "G4_AIR".to_string(),
            world_half_extent_m: 2.0,
            detector_name: "LArBox".to_string(),
            detector_material: "G4_lAr".to_string(),
            detector_half_extent_m: 1.0,
            particle: "mu-".to_string(),
            energy_gev: 1.0,
            launch_radius_m: 1.9,
            theta: (0.0, 180.0, 30.0, true),
            phi: (0.0, 360.0, 30.0, false),
            physics_list: "FTFP_BERT".to_string(),
            max_step_mm: 10.0,
            tracking_cut_mev: 1.0,
        }
    }
}
