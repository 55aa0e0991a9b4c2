//! Configuration surfaces for the evolutionary core and the microgrid.
//!
//! Both [`NeatConfig`] and [`MicrogridConfig`] are plain, `serde`-deserializable
//! structs so they can be loaded from a layered source the way
//! `config::Config::builder().add_source(...).build()` does for any other
//! struct, or built directly with [`Default`] plus field overrides.

use serde::{Deserialize, Serialize};

use crate::error::NeatError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeatConfig {
    pub population_size: usize,

    pub repro_survival_rate: f64,
    pub min_species_size: usize,
    pub max_stagnation: usize,
    pub num_surviving_elite_species: usize,

    pub compatibility_threshold: f64,
    pub disjoint_coefficient: f64,
    pub weight_coefficient: f64,

    pub keep_disabled_probability: f64,
    pub node_mutation_probability: f64,
    pub connection_mutation_probability: f64,
    pub adjust_weight_prob: f64,
    pub replace_weight_prob: f64,
    pub adjust_bias_prob: f64,
    pub replace_bias_prob: f64,

    pub weight_init_mean: f64,
    pub weight_init_stdev: f64,
    pub weight_max_adjust: f64,
    pub weight_min_val: f64,
    pub weight_max_val: f64,

    pub bias_init_mean: f64,
    pub bias_init_stdev: f64,
    pub bias_max_adjust: f64,
    pub bias_min_val: f64,
    pub bias_max_val: f64,
}

impl Default for NeatConfig {
    fn default() -> Self {
        NeatConfig {
            population_size: 150,
            repro_survival_rate: 0.2,
            min_species_size: 2,
            max_stagnation: 15,
            num_surviving_elite_species: 2,
            compatibility_threshold: 3.0,
            disjoint_coefficient: 1.0,
            weight_coefficient: 0.5,
            keep_disabled_probability: 0.2,
            node_mutation_probability: 0.03,
            connection_mutation_probability: 0.05,
            adjust_weight_prob: 0.8,
            replace_weight_prob: 0.1,
            adjust_bias_prob: 0.7,
            replace_bias_prob: 0.1,
            weight_init_mean: 0.0,
            weight_init_stdev: 1.0,
            weight_max_adjust: 0.5,
            weight_min_val: -30.0,
            weight_max_val: 30.0,
            bias_init_mean: 0.0,
            bias_init_stdev: 1.0,
            bias_max_adjust: 0.5,
            bias_min_val: -30.0,
            bias_max_val: 30.0,
        }
    }
}

impl NeatConfig {
    pub fn validate(&self) -> Result<(), NeatError> {
        if self.population_size == 0 {
            return Err(NeatError::Config("population_size must be > 0".into()));
        }
        if self.min_species_size == 0 {
            return Err(NeatError::Config("min_species_size must be >= 1".into()));
        }
        if self.weight_min_val >= self.weight_max_val {
            return Err(NeatError::Config(
                "weight_min_val must be < weight_max_val".into(),
            ));
        }
        if self.bias_min_val >= self.bias_max_val {
            return Err(NeatError::Config(
                "bias_min_val must be < bias_max_val".into(),
            ));
        }
        for (name, p) in [
            ("repro_survival_rate", self.repro_survival_rate),
            ("keep_disabled_probability", self.keep_disabled_probability),
            ("node_mutation_probability", self.node_mutation_probability),
            (
                "connection_mutation_probability",
                self.connection_mutation_probability,
            ),
            ("adjust_weight_prob", self.adjust_weight_prob),
            ("replace_weight_prob", self.replace_weight_prob),
            ("adjust_bias_prob", self.adjust_bias_prob),
            ("replace_bias_prob", self.replace_bias_prob),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(NeatError::Config(format!("{name} must be in [0, 1]")));
            }
        }
        Ok(())
    }
}

/// Gaussian sampling parameters: `(mean, standard deviation)`.
pub type GaussianParams = (f64, f64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TclConfig {
    pub num_tcls: usize,
    pub thermal_mass_air: GaussianParams,
    pub thermal_mass_building: GaussianParams,
    pub internal_heating: GaussianParams,
    pub nominal_power: GaussianParams,
    pub min_temp: f64,
    pub max_temp: f64,
}

impl Default for TclConfig {
    fn default() -> Self {
        TclConfig {
            num_tcls: 100,
            thermal_mass_air: (0.004, 0.0008),
            thermal_mass_building: (0.3, 0.004),
            internal_heating: (0.0, 0.01),
            nominal_power: (1.5, 0.01),
            min_temp: 19.0,
            max_temp: 25.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EssConfig {
    pub charge_efficiency: f64,
    pub discharge_efficiency: f64,
    pub max_charge: f64,
    pub max_discharge: f64,
    pub max_energy: f64,
}

impl Default for EssConfig {
    fn default() -> Self {
        EssConfig {
            charge_efficiency: 0.9,
            discharge_efficiency: 0.9,
            max_charge: 250.0,
            max_discharge: 250.0,
            max_energy: 500.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainGridConfig {
    pub import_transmission_price: f64,
    pub export_transmission_price: f64,
}

impl Default for MainGridConfig {
    fn default() -> Self {
        MainGridConfig {
            import_transmission_price: 0.0097,
            export_transmission_price: 0.0009,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerConfig {
    pub generation_cost: f64,
}

impl Default for DerConfig {
    fn default() -> Self {
        DerConfig {
            generation_cost: 0.032,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentialConfig {
    pub num_households: usize,
    pub patience: GaussianParams,
    pub sensitivity: GaussianParams,
    pub price_interval: f64,
    pub over_pricing_threshold: i64,
}

impl Default for ResidentialConfig {
    fn default() -> Self {
        ResidentialConfig {
            num_households: 150,
            patience: (10.0, 6.0),
            sensitivity: (0.4, 0.3),
            price_interval: 0.0015,
            over_pricing_threshold: 4,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MicrogridConfig {
    pub tcl: TclConfig,
    pub ess: EssConfig,
    pub main_grid: MainGridConfig,
    pub der: DerConfig,
    pub residential: ResidentialConfig,
}

impl MicrogridConfig {
    pub fn validate(&self) -> Result<(), NeatError> {
        if self.tcl.num_tcls == 0 {
            return Err(NeatError::Config("num_tcls must be > 0".into()));
        }
        if self.tcl.min_temp >= self.tcl.max_temp {
            return Err(NeatError::Config("min_temp must be < max_temp".into()));
        }
        if self.residential.num_households == 0 {
            return Err(NeatError::Config("num_households must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.ess.charge_efficiency)
            || self.ess.charge_efficiency <= 0.0
            || !(0.0..=1.0).contains(&self.ess.discharge_efficiency)
            || self.ess.discharge_efficiency <= 0.0
        {
            return Err(NeatError::Config(
                "ess efficiencies must be in (0, 1]".into(),
            ));
        }
        if self.ess.max_energy <= 0.0 || self.ess.max_charge <= 0.0 || self.ess.max_discharge <= 0.0 {
            return Err(NeatError::Config(
                "ess capacities/power limits must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Loads a [`NeatConfig`] by layering defaults under an optional config file
/// and environment variables prefixed `NEAT_`, mirroring the
/// `Config::builder().add_source(...)` idiom used elsewhere in the ecosystem.
pub fn load_neat_config(path: Option<&str>) -> Result<NeatConfig, NeatError> {
    let defaults = NeatConfig::default();
    let mut builder = config::Config::builder().add_source(
        config::Config::try_from(&defaults).map_err(|e| NeatError::Config(e.to_string()))?,
    );
    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path));
    }
    builder = builder.add_source(config::Environment::with_prefix("NEAT"));
    let cfg: NeatConfig = builder
        .build()
        .map_err(|e| NeatError::Config(e.to_string()))?
        .try_deserialize()
        .map_err(|e| NeatError::Config(e.to_string()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_neat_config_is_valid() {
        NeatConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_population() {
        let mut cfg = NeatConfig::default();
        cfg.population_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_weight_bounds() {
        let mut cfg = NeatConfig::default();
        cfg.weight_min_val = 10.0;
        cfg.weight_max_val = -10.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn default_microgrid_config_is_valid() {
        MicrogridConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_tcls() {
        let mut cfg = MicrogridConfig::default();
        cfg.tcl.num_tcls = 0;
        assert!(cfg.validate().is_err());
    }
}
