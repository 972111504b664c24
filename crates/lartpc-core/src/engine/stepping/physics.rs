use crate::core::materials::Material;
use crate::core::particles::ParticleDefinition;
use rand::Rng;
use std::f64::consts::TAU;

/// Relative width of the Gaussian energy-loss fluctuation.
pub const ENERGY_LOSS_SPREAD: f64 = 0.1;

/// Highland constant, MeV.
const HIGHLAND_SCALE: f64 = 13.6;
const HIGHLAND_LOG_COEFFICIENT: f64 = 0.038;

/// Mean continuous ionization loss over `step_length`, scaled by charge².
pub fn mean_energy_loss(
    material: &Material,
    particle: &ParticleDefinition,
    step_length: f64,
) -> f64 {
    if !particle.is_charged() {
        return 0.0;
    }
    material.linear_stopping_power() * step_length * particle.charge.powi(2)
}

/// Gaussian-fluctuated loss around `mean`, never negative.
pub fn sample_energy_loss(mean: f64, spread: f64, rng: &mut impl Rng) -> f64 {
    if mean <= 0.0 {
        return 0.0;
    }
    (mean * (1.0 + spread * standard_normal(rng))).max(0.0)
}

/// RMS plane scattering angle from the Highland formula, in radians.
pub fn highland_width(
    material: &Material,
    particle: &ParticleDefinition,
    kinetic_energy: f64,
    step_length: f64,
) -> f64 {
    if !particle.is_charged() || kinetic_energy <= 0.0 || step_length <= 0.0 {
        return 0.0;
    }
    let momentum = (kinetic_energy * (kinetic_energy + 2.0 * particle.mass)).sqrt();
    let total_energy = kinetic_energy + particle.mass;
    let beta = momentum / total_energy;
    let thickness = step_length / material.radiation_length();
    let z = particle.charge.abs();

    let log_term = (thickness * z * z / (beta * beta)).ln();
    let correction = (1.0 + HIGHLAND_LOG_COEFFICIENT * log_term).max(0.0);
    HIGHLAND_SCALE / (beta * momentum) * z * thickness.sqrt() * correction
}

/// Polar angle and azimuth of a scattering deflection with plane width `width`.
pub fn sample_deflection(width: f64, rng: &mut impl Rng) -> (f64, f64) {
    let x = standard_normal(rng);
    let y = standard_normal(rng);
    let polar = width * (x * x + y * y).sqrt();
    let azimuth = rng.gen_range(0.0..TAU);
    (polar, azimuth)
}

/// Box-Muller draw from N(0, 1).
pub fn standard_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::materials::MaterialDatabase;
    use crate::core::particles::ParticleTable;
    use crate::core::units::{CM, GEV, MEV};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn argon() -> Material {
        MaterialDatabase::new().find_or_build("G4_lAr").unwrap()
    }

    fn muon() -> &'static ParticleDefinition {
        ParticleTable::find("mu-").unwrap()
    }

    #[test]
    fn muon_loses_about_2_1_mev_per_cm_in_argon() {
        let loss = mean_energy_loss(&argon(), muon(), 1.0 * CM);
        assert!((loss - 2.105168 * MEV).abs() < 1e-6);
    }

    #[test]
    fn neutral_particles_lose_nothing() {
        let gamma = ParticleTable::find("gamma").unwrap();
        assert_eq!(mean_energy_loss(&argon(), gamma, 10.0 * CM), 0.0);
        assert_eq!(highland_width(&argon(), gamma, 1.0 * GEV, 10.0 * CM), 0.0);
    }

    #[test]
    fn sampled_loss_without_spread_equals_mean() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(sample_energy_loss(3.0, 0.0, &mut rng), 3.0);
        assert_eq!(sample_energy_loss(0.0, 0.1, &mut rng), 0.0);
    }

    #[test]
    fn sampled_loss_is_non_negative_and_centred_on_mean() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let loss = sample_energy_loss(2.0, ENERGY_LOSS_SPREAD, &mut rng);
            assert!(loss >= 0.0);
            sum += loss;
        }
        let mean = sum / n as f64;
        assert!((mean - 2.0).abs() < 0.01, "mean was {mean}");
    }

    #[test]
    fn standard_normal_has_unit_variance() {
        let mut rng = StdRng::seed_from_u64(42);
        let samples: Vec<f64> = (0..20_000).map(|_| standard_normal(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.05, "mean was {mean}");
        assert!((var - 1.0).abs() < 0.05, "variance was {var}");
    }

    #[test]
    fn highland_width_for_gev_muon_over_one_radiation_length() {
        let material = argon();
        let width = highland_width(&material, muon(), 1.0 * GEV, material.radiation_length());
        assert!(width > 0.0120 && width < 0.0128, "width was {width}");
    }

    #[test]
    fn highland_width_shrinks_with_energy() {
        let material = argon();
        let low = highland_width(&material, muon(), 100.0 * MEV, 1.0 * CM);
        let high = highland_width(&material, muon(), 10.0 * GEV, 1.0 * CM);
        assert!(low > high);
    }

    #[test]
    fn deflection_azimuth_is_within_full_turn() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let (polar, azimuth) = sample_deflection(0.01, &mut rng);
            assert!(polar >= 0.0);
            assert!((0.0..TAU).contains(&azimuth));
        }
    }
}
