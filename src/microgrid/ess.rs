//! Energy storage system (battery) with charge/discharge efficiency limits.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::EssConfig;

#[derive(Debug, Clone, Copy)]
pub struct Ess {
    pub energy: f64,
    max_energy: f64,
    max_charge_power: f64,
    max_discharge_power: f64,
    charge_efficiency: f64,
    discharge_efficiency: f64,
}

impl Ess {
    pub fn new(energy: f64, config: &EssConfig) -> Self {
        debug_assert!(config.max_charge > 0.0);
        debug_assert!(config.max_discharge > 0.0);
        debug_assert!(config.charge_efficiency > 0.0 && config.charge_efficiency <= 1.0);
        debug_assert!(config.discharge_efficiency > 0.0 && config.discharge_efficiency <= 1.0);
        Ess {
            energy,
            max_energy: config.max_energy,
            max_charge_power: config.max_charge,
            max_discharge_power: config.max_discharge,
            charge_efficiency: config.charge_efficiency,
            discharge_efficiency: config.discharge_efficiency,
        }
    }

    /// Initial charge sampled from `Normal(250, 100)`, clipped to
    /// `[100, max_energy]`.
    pub fn from_config(config: &EssConfig, rng: &mut impl Rng) -> Self {
        let energy: f64 = Normal::<f64>::new(250.0, 100.0)
            .unwrap()
            .sample(rng)
            .max(100.0)
            .min(config.max_energy);
        Ess::new(energy, config)
    }

    pub fn soc(&self) -> f64 {
        self.energy / self.max_energy
    }

    /// Charge with `power`, returning energy that could not be absorbed.
    pub fn charge(&mut self, power: f64) -> f64 {
        self.update(power, 0.0)
    }

    /// Discharge `power`, returning energy actually provided.
    pub fn discharge(&mut self, power: f64) -> f64 {
        self.update(0.0, power)
    }

    fn update(&mut self, charge_power: f64, discharge_power: f64) -> f64 {
        let max_intake = (self.max_energy - self.energy) / self.charge_efficiency;
        let charging = charge_power.max(0.0).min(self.max_charge_power).min(max_intake);

        let max_output = self.energy * self.discharge_efficiency;
        let discharging = discharge_power.max(0.0).min(self.max_discharge_power).min(max_output);

        self.energy += self.charge_efficiency * charging - discharging / self.discharge_efficiency;
        discharging + charge_power - charging
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_cap_returns_expected_excess() {
        let config = EssConfig {
            charge_efficiency: 0.9,
            discharge_efficiency: 0.9,
            max_charge: 250.0,
            max_discharge: 250.0,
            max_energy: 500.0,
        };
        let mut ess = Ess::new(450.0, &config);
        let excess = ess.charge(100.0);
        assert!((ess.energy - 500.0).abs() < 1e-9);
        assert!((excess - 44.444444).abs() < 1e-4);
    }

    #[test]
    fn energy_stays_within_bounds_after_many_cycles() {
        let config = EssConfig::default();
        let mut ess = Ess::new(250.0, &config);
        for i in 0..100 {
            if i % 2 == 0 {
                ess.charge(300.0);
            } else {
                ess.discharge(300.0);
            }
            assert!(ess.energy >= -1e-6 && ess.energy <= config.max_energy + 1e-6);
        }
    }
}
