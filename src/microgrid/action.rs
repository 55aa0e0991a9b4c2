//! The four-dimensional control action the evolved network outputs.

use crate::error::NeatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeficiencyPriority {
    BuyFirst,
    EssFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcessPriority {
    SellFirst,
    StoreFirst,
}

#[derive(Debug, Clone, Copy)]
pub struct Action {
    /// TCL dispatch level in `0..=3`, mapped to `{0%, 33%, 67%, 100%}` of fleet capacity.
    pub tcl_level: u8,
    /// Price level in `{-2, -1, 0, 1, 2}`.
    pub price_level: i64,
    pub deficiency_priority: DeficiencyPriority,
    pub excess_priority: ExcessPriority,
}

impl Action {
    pub fn new(
        tcl_level: u8,
        price_level: i64,
        deficiency_priority: DeficiencyPriority,
        excess_priority: ExcessPriority,
    ) -> Result<Self, NeatError> {
        if tcl_level > 3 {
            return Err(NeatError::InvalidAction(format!("tcl_level {tcl_level} out of range 0..=3")));
        }
        if !(-2..=2).contains(&price_level) {
            return Err(NeatError::InvalidAction(format!("price_level {price_level} out of range -2..=2")));
        }
        Ok(Action {
            tcl_level,
            price_level,
            deficiency_priority,
            excess_priority,
        })
    }

    /// Builds an action from four raw network outputs in `[0, 1)`, the way the
    /// demonstration binary translates a genome's decoded outputs into a
    /// control decision.
    pub fn from_outputs(outputs: &[f64]) -> Result<Self, NeatError> {
        if outputs.len() != 4 {
            return Err(NeatError::InvalidAction(format!(
                "expected 4 network outputs, got {}",
                outputs.len()
            )));
        }
        let tcl_level = (outputs[0] * 4.0).floor().min(3.0).max(0.0) as u8;
        let price_level = (outputs[1] * 5.0).floor().min(4.0).max(0.0) as i64 - 2;
        let deficiency_priority = if outputs[2] >= 0.5 {
            DeficiencyPriority::EssFirst
        } else {
            DeficiencyPriority::BuyFirst
        };
        let excess_priority = if outputs[3] >= 0.5 {
            ExcessPriority::StoreFirst
        } else {
            ExcessPriority::SellFirst
        };
        Action::new(tcl_level, price_level, deficiency_priority, excess_priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_tcl_level() {
        assert!(Action::new(4, 0, DeficiencyPriority::BuyFirst, ExcessPriority::SellFirst).is_err());
    }

    #[test]
    fn rejects_out_of_range_price_level() {
        assert!(Action::new(0, 3, DeficiencyPriority::BuyFirst, ExcessPriority::SellFirst).is_err());
    }

    #[test]
    fn from_outputs_maps_full_range() {
        let action = Action::from_outputs(&[0.99, 0.99, 0.9, 0.1]).unwrap();
        assert_eq!(action.tcl_level, 3);
        assert_eq!(action.price_level, 2);
        assert_eq!(action.deficiency_priority, DeficiencyPriority::EssFirst);
        assert_eq!(action.excess_priority, ExcessPriority::SellFirst);
    }

    #[test]
    fn from_outputs_wrong_length_is_invalid() {
        assert!(Action::from_outputs(&[0.1, 0.2]).is_err());
    }
}
