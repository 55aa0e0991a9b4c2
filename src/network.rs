//! Recurrent network decoding and activation.
//!
//! A genome's connection graph may contain cycles, so the phenotype keeps
//! two value buffers and ping-pongs between them every activation rather
//! than relying on a topological ordering.

use std::collections::{HashMap, HashSet};

use crate::error::NetworkError;
use crate::genome::Genome;

/// A network that can be decoded from a genome and driven one step at a time.
pub trait Network {
    fn activate(&mut self, inputs: &[f64]) -> Result<Vec<f64>, NetworkError>;
    fn reset(&mut self);
}

/// Nodes whose value is required to compute the network's outputs, pruning
/// everything upstream of unreachable dead ends.
pub fn required_for_output(
    inputs: &HashSet<usize>,
    outputs: &[usize],
    connections: &HashMap<(usize, usize), crate::genome::ConnectionGene>,
) -> HashSet<usize> {
    let mut required: HashSet<usize> = outputs.iter().copied().collect();
    let mut s: HashSet<usize> = outputs.iter().copied().collect();

    loop {
        let t: HashSet<usize> = connections
            .keys()
            .filter(|(_, b)| s.contains(b))
            .map(|(a, _)| *a)
            .filter(|a| !s.contains(a))
            .collect();

        if t.is_empty() {
            break;
        }

        let layer_nodes: HashSet<usize> = t.iter().copied().filter(|a| !inputs.contains(a)).collect();
        if layer_nodes.is_empty() {
            break;
        }

        required.extend(&layer_nodes);
        s.extend(&t);
    }

    required
}

struct NodeEval {
    node: usize,
    bias: f64,
    links: Vec<(usize, f64)>,
}

/// Decoded phenotype of a [`Genome`]. Holds no reference to the genome after
/// construction; values are double-buffered to support cycles.
pub struct RecurrentNetwork {
    input_nodes: Vec<usize>,
    output_nodes: Vec<usize>,
    node_evals: Vec<NodeEval>,
    values: [HashMap<usize, f64>; 2],
    active: usize,
}

impl RecurrentNetwork {
    pub fn create(genome: &Genome) -> Self {
        let input_nodes: Vec<usize> = genome.inputs.keys().copied().collect();
        let input_set: HashSet<usize> = input_nodes.iter().copied().collect();
        let required = required_for_output(&input_set, &genome.output_keys, &genome.connections);

        let mut node_inputs: HashMap<usize, Vec<(usize, f64)>> = HashMap::new();
        for conn in genome.connections.values().filter(|c| c.enabled) {
            if !required.contains(&conn.out_idx) && !required.contains(&conn.in_idx) {
                continue;
            }
            node_inputs.entry(conn.out_idx).or_default().push((conn.in_idx, conn.weight));
        }

        let mut node_evals = Vec::with_capacity(node_inputs.len());
        for (node_key, links) in node_inputs {
            let bias = genome.nodes.get(&node_key).map(|n| n.bias).unwrap_or(0.0);
            node_evals.push(NodeEval { node: node_key, bias, links });
        }

        let mut values = [HashMap::new(), HashMap::new()];
        for val_dict in &mut values {
            for &k in input_nodes.iter().chain(genome.output_keys.iter()) {
                val_dict.insert(k, 0.0);
            }
            for eval in &node_evals {
                val_dict.insert(eval.node, 0.0);
                for &(i, _) in &eval.links {
                    val_dict.entry(i).or_insert(0.0);
                }
            }
        }

        RecurrentNetwork {
            input_nodes,
            output_nodes: genome.output_keys.clone(),
            node_evals,
            values,
            active: 0,
        }
    }
}

impl Network for RecurrentNetwork {
    fn activate(&mut self, inputs: &[f64]) -> Result<Vec<f64>, NetworkError> {
        if inputs.len() != self.input_nodes.len() {
            return Err(NetworkError::InvalidInput(format!(
                "expected {} inputs, got {}",
                self.input_nodes.len(),
                inputs.len()
            )));
        }

        let src_idx = self.active;
        let dst_idx = 1 - self.active;
        self.active = dst_idx;

        for (&node, &v) in self.input_nodes.iter().zip(inputs.iter()) {
            self.values[src_idx].insert(node, v);
            self.values[dst_idx].insert(node, v);
        }

        for eval in &self.node_evals {
            let s: f64 = eval
                .links
                .iter()
                .map(|&(i, w)| self.values[src_idx].get(&i).copied().unwrap_or(0.0) * w)
                .sum();
            let new_value = crate::activation::sigmoid(eval.bias + s);
            self.values[dst_idx].insert(eval.node, new_value);
        }

        Ok(self
            .output_nodes
            .iter()
            .map(|i| self.values[dst_idx].get(i).copied().unwrap_or(0.0))
            .collect())
    }

    fn reset(&mut self) {
        for v in &mut self.values {
            for value in v.values_mut() {
                *value = 0.0;
            }
        }
        self.active = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NeatConfig;
    use crate::innovation::Counter;

    #[test]
    fn minimal_genome_decodes_to_expected_output() {
        let config = NeatConfig::default();
        let mut node_counter = Counter::starting_at(0);
        let mut conn_counter = Counter::starting_at(0);
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);

        let mut genome = Genome::create_new(0, 2, 1, &config, &mut rng, &mut node_counter, &mut conn_counter);
        let input_ids: Vec<usize> = {
            let mut v: Vec<usize> = genome.inputs.keys().copied().collect();
            v.sort();
            v
        };
        let output_id = genome.output_keys[0];
        genome.nodes.get_mut(&output_id).unwrap().bias = 0.0;
        for (k, conn) in genome.connections.iter_mut() {
            if k.0 == input_ids[0] {
                conn.weight = 1.0;
            } else {
                conn.weight = -1.0;
            }
        }

        let mut net = RecurrentNetwork::create(&genome);
        let out = net.activate(&[1.0, 1.0]).unwrap();
        assert!((out[0] - 0.5).abs() < 1e-9);

        let out2 = net.activate(&[1.0, 0.0]).unwrap();
        assert!((out2[0] - crate::activation::sigmoid(1.0)).abs() < 1e-9);
    }

    #[test]
    fn activate_rejects_wrong_input_length() {
        let config = NeatConfig::default();
        let mut node_counter = Counter::starting_at(0);
        let mut conn_counter = Counter::starting_at(0);
        let mut rng = rand::rngs::StdRng::seed_from_u64(2);
        use rand::SeedableRng;
        let genome = Genome::create_new(0, 2, 1, &config, &mut rng, &mut node_counter, &mut conn_counter);
        let mut net = RecurrentNetwork::create(&genome);
        assert!(net.activate(&[1.0]).is_err());
    }

    #[test]
    fn required_for_output_prunes_dead_ends() {
        use crate::genome::ConnectionGene;
        let inputs: HashSet<usize> = [0, 1].into_iter().collect();
        let outputs = vec![2];
        let mut connections = HashMap::new();
        connections.insert((0, 2), ConnectionGene::new(0, 2, 1.0, true, 0));
        connections.insert((1, 3), ConnectionGene::new(1, 3, 1.0, true, 1)); // dead end, node 3 unused
        let required = required_for_output(&inputs, &outputs, &connections);
        assert!(required.contains(&2));
        assert!(!required.contains(&3));
    }
}
