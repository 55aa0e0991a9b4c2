//! Node and connection genes: the atomic, historically-marked units of a
//! [`super::genome::Genome`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// Cannot have inputs added or removed.
    Sensor,
    /// Retains its original connections; may gain new incoming ones.
    Output,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeGene {
    pub idx: usize,
    pub node_type: NodeType,
    pub bias: f64,
}

impl NodeGene {
    pub fn new(idx: usize, node_type: NodeType, bias: f64) -> Self {
        NodeGene {
            idx,
            node_type,
            bias,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionGene {
    pub in_idx: usize,
    pub out_idx: usize,
    pub weight: f64,
    pub enabled: bool,
    pub innovation_num: usize,
}

impl ConnectionGene {
    pub fn new(in_idx: usize, out_idx: usize, weight: f64, enabled: bool, innovation_num: usize) -> Self {
        ConnectionGene {
            in_idx,
            out_idx,
            weight,
            enabled,
            innovation_num,
        }
    }

    /// Crossover two matching connection genes (same innovation number).
    ///
    /// Weight is inherited from either parent with equal probability;
    /// a connection disabled in either parent has `keep_disable_prob` odds
    /// of staying disabled in the child.
    pub fn crossover(&self, other: &ConnectionGene, keep_disable_prob: f64, rng: &mut impl rand::Rng) -> ConnectionGene {
        debug_assert_eq!(self.in_idx, other.in_idx);
        debug_assert_eq!(self.out_idx, other.out_idx);
        debug_assert_eq!(self.innovation_num, other.innovation_num);

        let weight = if rng.random_bool(0.5) {
            self.weight
        } else {
            other.weight
        };

        let enabled = !((!self.enabled || !other.enabled) && rng.random_bool(keep_disable_prob));

        ConnectionGene::new(self.in_idx, self.out_idx, weight, enabled, self.innovation_num)
    }

    /// Weight distance between two matching connection genes.
    pub fn distance(a: &ConnectionGene, b: &ConnectionGene) -> f64 {
        debug_assert_eq!(a.innovation_num, b.innovation_num);
        (a.weight - b.weight).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn crossover_preserves_identity() {
        let a = ConnectionGene::new(0, 1, 0.5, true, 3);
        let b = ConnectionGene::new(0, 1, -0.5, true, 3);
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let child = a.crossover(&b, 0.1, &mut rng);
        assert_eq!(child.in_idx, 0);
        assert_eq!(child.out_idx, 1);
        assert_eq!(child.innovation_num, 3);
        assert!(child.weight == 0.5 || child.weight == -0.5);
    }

    #[test]
    fn distance_is_absolute_weight_difference() {
        let a = ConnectionGene::new(0, 1, 0.5, true, 3);
        let b = ConnectionGene::new(0, 1, -0.5, true, 3);
        assert!((ConnectionGene::distance(&a, &b) - 1.0).abs() < 1e-12);
    }
}
