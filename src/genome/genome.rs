//! Genome: a graph of node and connection genes, addressed by stable integer
//! ids rather than owned parent/child links, since the graph may be cyclic.

use std::collections::HashMap;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::NeatConfig;
use crate::innovation::{Counter, Innovations};

use super::genes::{ConnectionGene, NodeGene, NodeType};

#[derive(Debug, Clone)]
pub struct Genome {
    pub key: usize,
    pub inputs: HashMap<usize, NodeGene>,
    pub output_keys: Vec<usize>,
    pub nodes: HashMap<usize, NodeGene>,
    pub connections: HashMap<(usize, usize), ConnectionGene>,
    /// Derived index: innovation number -> connection key. Rebuilt whenever
    /// `connections` changes shape.
    pub conns_by_innovation: HashMap<usize, (usize, usize)>,
    pub fitness: Option<f64>,
}

impl Genome {
    fn rebuild_innovation_index(&mut self) {
        self.conns_by_innovation = self
            .connections
            .values()
            .map(|c| (c.innovation_num, (c.in_idx, c.out_idx)))
            .collect();
    }

    fn sample_weight(config: &NeatConfig, rng: &mut impl Rng) -> f64 {
        let dist = Normal::new(config.weight_init_mean, config.weight_init_stdev).unwrap();
        dist.sample(rng).clamp(config.weight_min_val, config.weight_max_val)
    }

    fn sample_bias(config: &NeatConfig, rng: &mut impl Rng) -> f64 {
        let dist = Normal::new(config.bias_init_mean, config.bias_init_stdev).unwrap();
        dist.sample(rng).clamp(config.bias_min_val, config.bias_max_val)
    }

    /// Build a minimal genome: one sensor per input, one output node per
    /// output, fully connected, no hidden nodes.
    pub fn create_new(
        key: usize,
        num_inputs: usize,
        num_outputs: usize,
        config: &NeatConfig,
        rng: &mut impl Rng,
        node_counter: &mut Counter,
        conn_counter: &mut Counter,
    ) -> Self {
        let mut inputs = HashMap::with_capacity(num_inputs);
        let mut input_ids = Vec::with_capacity(num_inputs);
        for _ in 0..num_inputs {
            let idx = node_counter.next();
            inputs.insert(idx, NodeGene::new(idx, NodeType::Sensor, 0.0));
            input_ids.push(idx);
        }

        let mut nodes = HashMap::with_capacity(num_outputs);
        let mut output_keys = Vec::with_capacity(num_outputs);
        for _ in 0..num_outputs {
            let idx = node_counter.next();
            let bias = Self::sample_bias(config, rng);
            nodes.insert(idx, NodeGene::new(idx, NodeType::Output, bias));
            output_keys.push(idx);
        }

        let mut connections = HashMap::with_capacity(num_inputs * num_outputs);
        for &i in &input_ids {
            for &o in &output_keys {
                let innovation_num = conn_counter.next();
                let weight = Self::sample_weight(config, rng);
                connections.insert((i, o), ConnectionGene::new(i, o, weight, true, innovation_num));
            }
        }

        let mut genome = Genome {
            key,
            inputs,
            output_keys,
            nodes,
            connections,
            conns_by_innovation: HashMap::new(),
            fitness: None,
        };
        genome.rebuild_innovation_index();
        genome
    }

    /// Produce an offspring genome via crossover. `self` is treated as the
    /// fitter parent when fitnesses are equal (stable tie-break).
    pub fn crossover(
        &self,
        other: &Genome,
        child_key: usize,
        keep_disable_prob: f64,
        rng: &mut impl Rng,
    ) -> Genome {
        let (fitter, weaker) = if other.fitness.unwrap_or(f64::NEG_INFINITY)
            > self.fitness.unwrap_or(f64::NEG_INFINITY)
        {
            (other, self)
        } else {
            (self, other)
        };

        let mut connections = HashMap::with_capacity(fitter.connections.len());
        for (innov, key) in &fitter.conns_by_innovation {
            let conn = &fitter.connections[key];
            let child_conn = match weaker.conns_by_innovation.get(innov) {
                Some(weaker_key) => conn.crossover(&weaker.connections[weaker_key], keep_disable_prob, rng),
                None => *conn,
            };
            connections.insert(*key, child_conn);
        }

        let mut genome = Genome {
            key: child_key,
            inputs: fitter.inputs.clone(),
            output_keys: fitter.output_keys.clone(),
            nodes: fitter.nodes.clone(),
            connections,
            conns_by_innovation: HashMap::new(),
            fitness: None,
        };
        genome.rebuild_innovation_index();
        genome
    }

    pub fn mutate(
        &mut self,
        config: &NeatConfig,
        rng: &mut impl Rng,
        innovations: &mut Innovations,
        node_counter: &mut Counter,
        conn_counter: &mut Counter,
    ) {
        if rng.random::<f64>() < config.node_mutation_probability {
            self.mutate_add_node(config, rng, innovations, node_counter, conn_counter);
        }
        if rng.random::<f64>() < config.connection_mutation_probability {
            self.mutate_add_connection(rng, innovations, conn_counter);
        }
        self.mutate_weights(config, rng);
        self.mutate_biases(config, rng);
    }

    fn mutate_add_node(
        &mut self,
        config: &NeatConfig,
        rng: &mut impl Rng,
        innovations: &mut Innovations,
        node_counter: &mut Counter,
        conn_counter: &mut Counter,
    ) {
        if self.connections.is_empty() {
            return;
        }
        let keys: Vec<(usize, usize)> = self.connections.keys().copied().collect();
        let key = keys[rng.random_range(0..keys.len())];
        let conn = *self.connections.get(&key).unwrap();
        self.connections.get_mut(&key).unwrap().enabled = false;

        let new_node_idx = innovations.node_for_split(conn.in_idx, conn.out_idx, node_counter);
        self.nodes
            .entry(new_node_idx)
            .or_insert_with(|| NodeGene::new(new_node_idx, NodeType::Hidden, Self::sample_bias(config, rng)));

        let in_innov = innovations.innovation_for_connection(conn.in_idx, new_node_idx, conn_counter);
        self.connections.insert(
            (conn.in_idx, new_node_idx),
            ConnectionGene::new(conn.in_idx, new_node_idx, 1.0, true, in_innov),
        );
        let out_innov = innovations.innovation_for_connection(new_node_idx, conn.out_idx, conn_counter);
        self.connections.insert(
            (new_node_idx, conn.out_idx),
            ConnectionGene::new(new_node_idx, conn.out_idx, conn.weight, true, out_innov),
        );
        self.rebuild_innovation_index();
    }

    fn mutate_add_connection(&mut self, rng: &mut impl Rng, innovations: &mut Innovations, conn_counter: &mut Counter) {
        let mut possible_inputs: Vec<usize> = self.nodes.keys().copied().collect();
        possible_inputs.extend(self.inputs.keys().copied());
        if possible_inputs.is_empty() || self.nodes.is_empty() {
            return;
        }
        let in_key = possible_inputs[rng.random_range(0..possible_inputs.len())];
        let node_keys: Vec<usize> = self.nodes.keys().copied().collect();
        let out_key = node_keys[rng.random_range(0..node_keys.len())];

        if let Some(existing) = self.connections.get_mut(&(in_key, out_key)) {
            existing.enabled = true;
            return;
        }
        if !self.inputs.contains_key(&in_key) {
            let in_is_output = self.nodes.get(&in_key).map(|n| n.node_type == NodeType::Output).unwrap_or(false);
            let out_is_output = self.nodes.get(&out_key).map(|n| n.node_type == NodeType::Output).unwrap_or(false);
            if in_is_output && out_is_output {
                return;
            }
        }

        let innovation_num = innovations.innovation_for_connection(in_key, out_key, conn_counter);
        let weight = rng.random_range(-1.0..1.0);
        self.connections
            .insert((in_key, out_key), ConnectionGene::new(in_key, out_key, weight, true, innovation_num));
        self.rebuild_innovation_index();
    }

    fn mutate_weights(&mut self, config: &NeatConfig, rng: &mut impl Rng) {
        for conn in self.connections.values_mut() {
            let r: f64 = rng.random();
            if r < config.replace_weight_prob {
                conn.weight = Self::sample_weight(config, rng);
            } else if r < config.replace_weight_prob + config.adjust_weight_prob {
                let delta = rng.random_range(-config.weight_max_adjust..config.weight_max_adjust);
                conn.weight = (conn.weight + delta).clamp(config.weight_min_val, config.weight_max_val);
            }
        }
    }

    fn mutate_biases(&mut self, config: &NeatConfig, rng: &mut impl Rng) {
        for node in self.nodes.values_mut() {
            if node.node_type == NodeType::Sensor {
                continue;
            }
            let r: f64 = rng.random();
            if r < config.replace_bias_prob {
                node.bias = Self::sample_bias(config, rng);
            } else if r < config.replace_bias_prob + config.adjust_bias_prob {
                let delta = rng.random_range(-config.bias_max_adjust..config.bias_max_adjust);
                node.bias = (node.bias + delta).clamp(config.bias_min_val, config.bias_max_val);
            }
        }
    }

    /// Genetic distance used for speciation (see module docs for the
    /// disjoint/matching-weight formula).
    pub fn distance(&self, other: &Genome, config: &NeatConfig) -> f64 {
        self.node_distance(other, config) + self.connection_distance(other, config)
    }

    fn node_distance(&self, other: &Genome, config: &NeatConfig) -> f64 {
        if self.nodes.is_empty() && other.nodes.is_empty() {
            return 0.0;
        }
        let mut disjoint = 0usize;
        for k in self.nodes.keys() {
            if !other.nodes.contains_key(k) {
                disjoint += 1;
            }
        }
        for k in other.nodes.keys() {
            if !self.nodes.contains_key(k) {
                disjoint += 1;
            }
        }
        let max_nodes = self.nodes.len().max(other.nodes.len()) as f64;
        let norm = (max_nodes.log2()).max(1.0);
        config.disjoint_coefficient * disjoint as f64 / norm
    }

    fn connection_distance(&self, other: &Genome, config: &NeatConfig) -> f64 {
        if self.connections.is_empty() && other.connections.is_empty() {
            return 0.0;
        }
        let mut weight_diff = 0.0;
        let mut matching = 0usize;
        let mut disjoint = 0usize;
        for (innov, key) in &self.conns_by_innovation {
            match other.conns_by_innovation.get(innov) {
                Some(other_key) => {
                    matching += 1;
                    weight_diff += (self.connections[key].weight - other.connections[other_key].weight).abs();
                }
                None => disjoint += 1,
            }
        }
        for innov in other.conns_by_innovation.keys() {
            if !self.conns_by_innovation.contains_key(innov) {
                disjoint += 1;
            }
        }
        let max_conn = self.connections.len().max(other.connections.len()) as f64;
        let norm = (max_conn.log2()).max(1.0);
        let weight_term = if matching > 0 { config.weight_coefficient * weight_diff / matching as f64 } else { 0.0 };
        config.disjoint_coefficient * disjoint as f64 / norm + weight_term
    }

    pub fn hidden_node_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| n.node_type == NodeType::Hidden)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(7)
    }

    #[test]
    fn create_new_fully_connects_inputs_to_outputs() {
        let config = NeatConfig::default();
        let mut node_counter = Counter::starting_at(0);
        let mut conn_counter = Counter::starting_at(0);
        let g = Genome::create_new(0, 2, 1, &config, &mut rng(), &mut node_counter, &mut conn_counter);
        assert_eq!(g.inputs.len(), 2);
        assert_eq!(g.output_keys.len(), 1);
        assert_eq!(g.connections.len(), 2);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let config = NeatConfig::default();
        let mut node_counter = Counter::starting_at(0);
        let mut conn_counter = Counter::starting_at(0);
        let g = Genome::create_new(0, 2, 1, &config, &mut rng(), &mut node_counter, &mut conn_counter);
        assert_eq!(g.distance(&g, &config), 0.0);
    }

    #[test]
    fn crossover_only_inherits_innovations_known_to_fitter_parent() {
        let config = NeatConfig::default();
        let mut node_counter = Counter::starting_at(0);
        let mut conn_counter = Counter::starting_at(0);
        let mut p1 = Genome::create_new(0, 2, 1, &config, &mut rng(), &mut node_counter, &mut conn_counter);
        let p2 = Genome::create_new(1, 2, 1, &config, &mut rng(), &mut node_counter, &mut conn_counter);
        p1.fitness = Some(10.0);
        let mut r = rng();
        let child = p1.crossover(&p2, 2, 0.2, &mut r);
        for innov in child.conns_by_innovation.keys() {
            assert!(p1.conns_by_innovation.contains_key(innov));
        }
    }

    #[test]
    fn add_node_mutation_disables_split_connection() {
        let config = NeatConfig::default();
        let mut node_counter = Counter::starting_at(0);
        let mut conn_counter = Counter::starting_at(0);
        let mut g = Genome::create_new(0, 2, 1, &config, &mut rng(), &mut node_counter, &mut conn_counter);
        let mut innovations = Innovations::new();
        g.mutate_add_node(&config, &mut rng(), &mut innovations, &mut node_counter, &mut conn_counter);
        assert!(g.connections.values().any(|c| !c.enabled));
    }
}
