//! Aggregates price-responsive household loads and the shared pricing state.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::ResidentialConfig;
use crate::microgrid::pricing::PricingManager;
use crate::microgrid::price_responsive::PriceResponsiveLoad;

/// Based on Figure 13 in https://doi.org/10.1016/j.segan.2020.100413
pub const BASE_HOURLY_RESIDENTIAL_LOADS: [f64; 24] = [
    0.4, 0.3, 0.2, 0.2, 0.2, 0.2, 0.3, 0.5, 0.6, 0.6, 0.5, 0.5, 0.5, 0.4, 0.4, 0.6, 0.8, 1.4, 1.2,
    0.9, 0.8, 0.6, 0.5, 0.4,
];

pub struct HouseholdsManager {
    pr_loads: Vec<PriceResponsiveLoad>,
    prices: Vec<f64>,
    price_interval: f64,
    pricing_manager: PricingManager,
}

impl HouseholdsManager {
    pub fn new(pr_loads: Vec<PriceResponsiveLoad>, prices: Vec<f64>, config: &ResidentialConfig) -> Self {
        HouseholdsManager {
            pr_loads,
            prices,
            price_interval: config.price_interval,
            pricing_manager: PricingManager::new(config.over_pricing_threshold),
        }
    }

    /// Samples `num_households` loads from the configured sensitivity/patience
    /// distributions.
    pub fn from_config(prices: Vec<f64>, config: &ResidentialConfig, rng: &mut impl Rng) -> Self {
        let (sens_mean, sens_stdev) = config.sensitivity;
        let (pat_mean, pat_stdev) = config.patience;
        let sensitivity_dist = Normal::new(sens_mean, sens_stdev).unwrap();
        let patience_dist = Normal::new(pat_mean, pat_stdev).unwrap();
        let pr_loads = (0..config.num_households)
            .map(|_| {
                let sensitivity = sensitivity_dist.sample(rng).max(0.0);
                let patience = patience_dist.sample(rng).max(1.0).round() as u32;
                PriceResponsiveLoad::new(sensitivity, patience)
            })
            .collect();
        HouseholdsManager::new(pr_loads, prices, config)
    }

    pub fn pricing_counter(&self) -> i64 {
        self.pricing_manager.price_levels_sum
    }

    pub fn validate_price_level(&mut self, price_level: i64) -> i64 {
        self.pricing_manager.validate_price_level(price_level)
    }

    /// Total household consumption and the profit earned selling it, at the
    /// given hour-of-day, effective price level, and data index into `prices`.
    pub fn get_consumption_and_profit(
        &mut self,
        hour_of_day: u8,
        price_level: i64,
        price_idx: usize,
        rng: &mut impl Rng,
    ) -> Result<(f64, f64), crate::error::NeatError> {
        let consumption = self.residential_consumption(hour_of_day, price_level, rng);
        let price = self
            .prices
            .get(price_idx)
            .copied()
            .ok_or(crate::error::NeatError::IndexOutOfRange {
                index: price_idx,
                len: self.prices.len(),
            })?
            + price_level as f64 * self.price_interval;
        Ok((consumption, price * consumption))
    }

    fn residential_consumption(&mut self, hour_of_day: u8, price_level: i64, rng: &mut impl Rng) -> f64 {
        let base_load = BASE_HOURLY_RESIDENTIAL_LOADS[hour_of_day as usize % 24];
        self.pr_loads
            .iter_mut()
            .map(|pr_load| pr_load.get_load(base_load, price_level, rng))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn consumption_scales_with_household_count() {
        let config = ResidentialConfig {
            num_households: 10,
            ..ResidentialConfig::default()
        };
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut manager = HouseholdsManager::from_config(vec![5.48; 24], &config, &mut rng);
        let (consumption, profit) = manager.get_consumption_and_profit(17, 0, 0, &mut rng).unwrap();
        assert!(consumption > 0.0);
        assert!(profit > 0.0);
    }

    #[test]
    fn out_of_range_price_index_is_reported() {
        let config = ResidentialConfig { num_households: 1, ..ResidentialConfig::default() };
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let mut manager = HouseholdsManager::from_config(vec![5.48], &config, &mut rng);
        assert!(manager.get_consumption_and_profit(0, 0, 5, &mut rng).is_err());
    }
}
