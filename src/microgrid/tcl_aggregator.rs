//! Fleet of TCLs controlled as one aggregate by the dispatch agent.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::TclConfig;

use super::tcl::{BackupController, Tcl, TclTemperatureModel};

pub struct TclAggregator {
    tcls: Vec<Tcl>,
    out_temps: Vec<f64>,
}

impl TclAggregator {
    /// Builds a fleet of `config.num_tcls` TCLs with thermal properties
    /// sampled from `config`'s Gaussian distributions, clipped to sane
    /// ranges.
    pub fn from_config(config: &TclConfig, out_temps: Vec<f64>, rng: &mut impl Rng) -> Self {
        let tcls = (0..config.num_tcls)
            .map(|_| {
                let backup_controller = BackupController {
                    min_temp: config.min_temp,
                    max_temp: config.max_temp,
                };
                let temp_model = Self::sample_temp_model(config, &out_temps, rng);
                let (mean, std) = config.nominal_power;
                let power = Normal::new(mean, std).unwrap().sample(rng);
                Tcl::new(power, backup_controller, temp_model)
            })
            .collect();
        TclAggregator { tcls, out_temps }
    }

    fn sample_temp_model(config: &TclConfig, out_temps: &[f64], rng: &mut impl Rng) -> TclTemperatureModel {
        let mid = (config.max_temp + config.min_temp) / 2.0;
        let in_temp = Normal::new(mid, 1.5)
            .unwrap()
            .sample(rng)
            .clamp(config.min_temp, config.max_temp);
        let building_temp = Normal::new(mid, 3.5)
            .unwrap()
            .sample(rng)
            .clamp(config.min_temp, config.max_temp);

        let (mean, std) = config.thermal_mass_air;
        let therm_mass_air = Normal::new(mean, std).unwrap().sample(rng).max(0.001);
        let (mean, std) = config.thermal_mass_building;
        let therm_mass_building = Normal::new(mean, std).unwrap().sample(rng).max(0.01);
        let (mean, std) = config.internal_heating;
        let internal_heating = Normal::new(mean, std).unwrap().sample(rng);

        TclTemperatureModel::new(
            in_temp,
            out_temps.first().copied().unwrap_or(0.0),
            building_temp,
            therm_mass_air,
            therm_mass_building,
            internal_heating,
        )
    }

    pub fn outdoor_temperature(&self, idx: usize) -> Option<f64> {
        self.out_temps.get(idx).copied()
    }

    pub fn num_out_temps(&self) -> usize {
        self.out_temps.len()
    }

    pub fn state_of_charge(&self) -> f64 {
        self.tcls.iter().map(|t| t.soc).sum::<f64>() / self.tcls.len() as f64
    }

    pub fn num_tcls(&self) -> usize {
        self.tcls.len()
    }

    /// Allocate `energy` across the fleet, SoC-ascending first, returning the
    /// amount actually consumed.
    pub fn allocate_energy(&mut self, mut energy: f64, idx: usize) -> f64 {
        let out_temp = self.out_temps.get(idx).copied().unwrap_or(0.0);
        self.tcls.sort_by(|a, b| a.soc.partial_cmp(&b.soc).unwrap());

        let mut consumed = 0.0;
        for tcl in &mut self.tcls {
            let action = if tcl.nominal_power < energy { 1 } else { 0 };
            let used = tcl.update(out_temp, action);
            consumed += used;
            energy -= used;
        }
        consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn allocate_energy_sorts_by_soc_and_returns_nonnegative_consumption() {
        let config = TclConfig::default();
        let mut rng = rand::rngs::StdRng::seed_from_u64(9);
        let out_temps = vec![10.0; 48];
        let mut agg = TclAggregator::from_config(&config, out_temps, &mut rng);
        let consumed = agg.allocate_energy(config.num_tcls as f64 * 1.5, 0);
        assert!(consumed >= 0.0);
    }

    #[test]
    fn state_of_charge_is_mean_of_fleet() {
        let config = TclConfig::default();
        let mut rng = rand::rngs::StdRng::seed_from_u64(10);
        let agg = TclAggregator::from_config(&config, vec![10.0; 24], &mut rng);
        let soc = agg.state_of_charge();
        assert!((0.0..=1.0).contains(&soc));
    }
}
