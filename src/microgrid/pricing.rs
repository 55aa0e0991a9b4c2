//! Over-pricing throttle shared by every household's effective price level.

pub struct PricingManager {
    over_pricing_threshold: i64,
    pub price_levels_sum: i64,
}

impl PricingManager {
    pub fn new(over_pricing_threshold: i64) -> Self {
        PricingManager {
            over_pricing_threshold,
            price_levels_sum: 0,
        }
    }

    /// Validate and apply `price_level`, forcing it to `0` once the running
    /// sum has exceeded the threshold. Returns the effective level.
    pub fn validate_price_level(&mut self, price_level: i64) -> i64 {
        let level = if self.price_levels_sum > self.over_pricing_threshold {
            0
        } else {
            price_level
        };
        self.price_levels_sum += level;
        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forces_zero_once_threshold_exceeded() {
        let mut pm = PricingManager::new(4);
        let levels = [2, 2, 2, 0, 1];
        let effective: Vec<i64> = levels.iter().map(|&l| pm.validate_price_level(l)).collect();
        assert_eq!(effective, vec![2, 2, 2, 0, 0]);
    }
}
