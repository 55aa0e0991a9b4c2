//! Price-responsive household load: shifts consumption earlier/later based
//! on the current price signal and how long a shift has been waiting.

use std::collections::HashMap;

use rand::Rng;

pub struct PriceResponsiveLoad {
    pub sensitivity: f64,
    pub patience: u32,
    shifted_loads: HashMap<u64, f64>,
    timestep_counter: u64,
}

impl PriceResponsiveLoad {
    pub fn new(sensitivity: f64, patience: u32) -> Self {
        PriceResponsiveLoad {
            sensitivity,
            patience: patience.max(1),
            shifted_loads: HashMap::new(),
            timestep_counter: 0,
        }
    }

    /// Advance by one timestep and return the load to actually draw.
    pub fn get_load(&mut self, base_load: f64, price_level: i64, rng: &mut impl Rng) -> f64 {
        let timestep = self.timestep_counter;
        self.timestep_counter += 1;

        let executed = self.execute_due_loads(price_level, timestep, rng);
        let load_to_shift = base_load * self.sensitivity * price_level as f64;
        self.shifted_loads.insert(timestep, load_to_shift);
        base_load - load_to_shift + executed
    }

    fn execute_due_loads(&mut self, price_level: i64, current_timestep: u64, rng: &mut impl Rng) -> f64 {
        let mut executed = 0.0;
        let due: Vec<u64> = self
            .shifted_loads
            .iter()
            .filter(|&(&ts, &load)| Self::should_execute(load, ts, current_timestep, price_level, self.patience, rng))
            .map(|(&ts, _)| ts)
            .collect();
        for ts in due {
            if let Some(load) = self.shifted_loads.remove(&ts) {
                executed += load;
            }
        }
        executed
    }

    fn should_execute(load: f64, load_timestep: u64, current_timestep: u64, price_level: i64, patience: u32, rng: &mut impl Rng) -> bool {
        let price_term = -(price_level as f64) * load.signum() / 2.0;
        let time_term = (current_timestep - load_timestep) as f64 / patience as f64;
        let exec_prob = (price_term + time_term).clamp(0.0, 1.0);
        rng.random::<f64>() < exec_prob
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn shift_eventually_executes_as_patience_runs_out() {
        let mut load = PriceResponsiveLoad::new(0.5, 1);
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        load.get_load(1.0, 2, &mut rng);
        let mut executed_something = false;
        for _ in 0..20 {
            let l = load.get_load(1.0, 0, &mut rng);
            if (l - 1.0).abs() > 1e-9 {
                executed_something = true;
            }
        }
        assert!(executed_something);
    }

    #[test]
    fn zero_price_level_does_not_shift_load() {
        let mut load = PriceResponsiveLoad::new(0.5, 10);
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let l = load.get_load(2.0, 0, &mut rng);
        assert!((l - 2.0).abs() < 1e-9);
    }
}
