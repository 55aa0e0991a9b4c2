//! The external grid: two-price import/export with transmission costs.

use crate::config::MainGridConfig;
use crate::error::NeatError;

pub struct MainGrid {
    up_prices: Vec<f64>,
    down_prices: Vec<f64>,
    import_transmission_cost: f64,
    export_transmission_cost: f64,
}

impl MainGrid {
    pub fn new(up_prices: Vec<f64>, down_prices: Vec<f64>, config: &MainGridConfig) -> Self {
        MainGrid {
            up_prices,
            down_prices,
            import_transmission_cost: config.import_transmission_price,
            export_transmission_cost: config.export_transmission_price,
        }
    }

    pub fn up_price(&self, idx: usize) -> Result<f64, NeatError> {
        self.up_prices
            .get(idx)
            .copied()
            .ok_or(NeatError::IndexOutOfRange { index: idx, len: self.up_prices.len() })
    }

    pub fn down_price(&self, idx: usize) -> Result<f64, NeatError> {
        self.down_prices
            .get(idx)
            .copied()
            .ok_or(NeatError::IndexOutOfRange { index: idx, len: self.down_prices.len() })
    }

    pub fn bought_cost(&self, bought_energy: f64, idx: usize) -> Result<f64, NeatError> {
        Ok(bought_energy * (self.up_price(idx)? + self.import_transmission_cost))
    }

    pub fn sold_profit(&self, sold_energy: f64, idx: usize) -> Result<f64, NeatError> {
        Ok(sold_energy * (self.down_price(idx)? - self.export_transmission_cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bought_cost_includes_transmission_price() {
        let config = MainGridConfig { import_transmission_price: 0.01, export_transmission_price: 0.0 };
        let grid = MainGrid::new(vec![1.0], vec![0.5], &config);
        let cost = grid.bought_cost(10.0, 0).unwrap();
        assert!((cost - 10.10).abs() < 1e-9);
    }

    #[test]
    fn rejects_out_of_range_index() {
        let config = MainGridConfig::default();
        let grid = MainGrid::new(vec![1.0], vec![0.5], &config);
        assert!(grid.up_price(3).is_err());
    }
}
