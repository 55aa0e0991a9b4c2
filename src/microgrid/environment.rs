//! Combines every microgrid component into one steppable simulation.

use rand::Rng;

use crate::config::MicrogridConfig;
use crate::error::NeatError;
use crate::microgrid::action::{Action, DeficiencyPriority, ExcessPriority};
use crate::microgrid::der::Der;
use crate::microgrid::ess::Ess;
use crate::microgrid::households::HouseholdsManager;
use crate::microgrid::main_grid::MainGrid;
use crate::microgrid::observation::Observation;
use crate::microgrid::tcl_aggregator::TclAggregator;

pub struct Environment {
    tcl_aggregator: TclAggregator,
    ess: Ess,
    der: Der,
    main_grid: MainGrid,
    households: HouseholdsManager,
    idx: usize,
}

impl Environment {
    pub fn new(
        tcl_aggregator: TclAggregator,
        ess: Ess,
        der: Der,
        main_grid: MainGrid,
        households: HouseholdsManager,
        start_idx: usize,
    ) -> Self {
        Environment {
            tcl_aggregator,
            ess,
            der,
            main_grid,
            households,
            idx: start_idx,
        }
    }

    /// Builds an environment with every component's fleet/series sampled
    /// from `config`, starting at data index `start_idx`.
    pub fn from_config(
        config: &MicrogridConfig,
        out_temps: Vec<f64>,
        up_prices: Vec<f64>,
        down_prices: Vec<f64>,
        generated_energy: Vec<f64>,
        hourly_base_prices: Vec<f64>,
        start_idx: usize,
        rng: &mut impl Rng,
    ) -> Self {
        let tcl_aggregator = TclAggregator::from_config(&config.tcl, out_temps, rng);
        let ess = Ess::from_config(&config.ess, rng);
        let der = Der::new(generated_energy, config.der.generation_cost);
        let main_grid = MainGrid::new(up_prices, down_prices, &config.main_grid);
        let households = HouseholdsManager::from_config(hourly_base_prices, &config.residential, rng);
        Environment::new(tcl_aggregator, ess, der, main_grid, households, start_idx)
    }

    /// Options are `{0%, 33%, 67%, 100%}` of the fleet's maximum consumption.
    fn tcl_energy(&self, tcl_level: u8) -> f64 {
        let max_consumption = self.tcl_aggregator.num_tcls() as f64 * 1.5;
        max_consumption * tcl_level as f64 / 3.0
    }

    /// Each call consumes one data index, starting at the index passed to
    /// [`Environment::new`] and advancing by one per call thereafter — the
    /// same index is used for both the action's consequences and the
    /// observation returned for it.
    pub fn step(&mut self, action: &Action, rng: &mut impl Rng) -> Result<(Observation, f64), NeatError> {
        let reward = self.apply_action(action, rng)?;
        let observation = self.observation()?;
        self.idx += 1;
        Ok((observation, reward))
    }

    fn apply_action(&mut self, action: &Action, rng: &mut impl Rng) -> Result<f64, NeatError> {
        let tcl_consumption = self.tcl_aggregator.allocate_energy(self.tcl_energy(action.tcl_level), self.idx);

        let hour_of_day = Der::hour_of_day(self.idx);
        let effective_price_level = self.households.validate_price_level(action.price_level);
        let (residential_consumption, residential_profit) =
            self.households
                .get_consumption_and_profit(hour_of_day, effective_price_level, self.idx, rng)?;

        let generated_energy = self.der.get_generated_energy(self.idx)?;
        let excess = generated_energy - tcl_consumption - residential_consumption;

        let main_grid_returns = if excess > 0.0 {
            self.handle_excess_energy(excess, action.excess_priority)?
        } else {
            -self.cover_energy_deficiency(-excess, action.deficiency_priority)?
        };

        Ok(Self::compute_reward(
            tcl_consumption,
            self.der.generation_cost,
            residential_profit,
            main_grid_returns,
        ))
    }

    fn cover_energy_deficiency(&mut self, energy: f64, priority: DeficiencyPriority) -> Result<f64, NeatError> {
        match priority {
            DeficiencyPriority::BuyFirst => self.main_grid.bought_cost(energy, self.idx),
            DeficiencyPriority::EssFirst => {
                let ess_energy = self.ess.discharge(energy);
                self.main_grid.bought_cost(energy - ess_energy, self.idx)
            }
        }
    }

    fn handle_excess_energy(&mut self, energy: f64, priority: ExcessPriority) -> Result<f64, NeatError> {
        match priority {
            ExcessPriority::SellFirst => self.main_grid.sold_profit(energy, self.idx),
            ExcessPriority::StoreFirst => {
                let ess_excess = self.ess.charge(energy);
                self.main_grid.sold_profit(energy - ess_excess, self.idx)
            }
        }
    }

    fn compute_reward(tcl_consumption: f64, generation_cost: f64, residential_profit: f64, main_grid_profit: f64) -> f64 {
        tcl_consumption * generation_cost + residential_profit + main_grid_profit
    }

    pub fn observation(&self) -> Result<Observation, NeatError> {
        let hour_of_day = Der::hour_of_day(self.idx);
        Ok(Observation {
            tcl_soc: self.tcl_aggregator.state_of_charge().clamp(0.0, 1.0),
            ess_soc: self.ess.soc().clamp(0.0, 1.0),
            out_temp: self.tcl_aggregator.outdoor_temperature(self.idx).ok_or(
                NeatError::IndexOutOfRange { index: self.idx, len: self.tcl_aggregator.num_out_temps() },
            )?,
            generated_energy: self.der.get_generated_energy(self.idx)?,
            up_price: self.main_grid.up_price(self.idx)?,
            base_residential_load: crate::microgrid::households::BASE_HOURLY_RESIDENTIAL_LOADS
                [hour_of_day as usize % 24],
            pricing_counter: self.households.pricing_counter(),
            hour_of_day,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::microgrid::action::{Action, DeficiencyPriority, ExcessPriority};
    use rand::SeedableRng;

    fn small_config() -> MicrogridConfig {
        let mut config = MicrogridConfig::default();
        config.tcl.num_tcls = 5;
        config.residential.num_households = 5;
        config
    }

    #[test]
    fn step_produces_finite_reward_and_observation() {
        let config = small_config();
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let series_len = 48;
        let mut env = Environment::from_config(
            &config,
            vec![10.0; series_len],
            vec![1.0; series_len],
            vec![0.5; series_len],
            vec![100.0; series_len],
            vec![5.48; series_len],
            0,
            &mut rng,
        );
        let action = Action::new(1, 0, DeficiencyPriority::BuyFirst, ExcessPriority::SellFirst).unwrap();
        let (obs, reward) = env.step(&action, &mut rng).unwrap();
        assert!(reward.is_finite());
        assert!((0.0..=1.0).contains(&obs.tcl_soc));
        assert!((0.0..=1.0).contains(&obs.ess_soc));
    }

    #[test]
    fn stepping_past_series_end_is_reported() {
        let config = small_config();
        let mut rng = rand::rngs::StdRng::seed_from_u64(6);
        let mut env = Environment::from_config(
            &config,
            vec![10.0; 1],
            vec![1.0; 1],
            vec![0.5; 1],
            vec![100.0; 1],
            vec![5.48; 1],
            0,
            &mut rng,
        );
        let action = Action::new(0, 0, DeficiencyPriority::BuyFirst, ExcessPriority::SellFirst).unwrap();
        assert!(env.step(&action, &mut rng).is_ok());
        assert!(env.step(&action, &mut rng).is_err());
    }
}
