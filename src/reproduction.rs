//! Reproduction: shared-fitness adjustment, stagnation, spawn allocation and
//! offspring generation for one generation transition.

use std::collections::HashMap;

use rand::Rng;

use crate::config::NeatConfig;
use crate::error::NeatError;
use crate::genome::Genome;
use crate::innovation::{Counter, Innovations};
use crate::species::{Species, SpeciesSet};

/// Aggregates a species' member fitnesses into one comparable value.
/// Defaults to the arithmetic mean, matching the reference implementation.
pub type SpeciesFitnessFn = fn(&[f64]) -> f64;

pub fn mean_fitness(fitnesses: &[f64]) -> f64 {
    fitnesses.iter().sum::<f64>() / fitnesses.len() as f64
}

/// Round half to even, matching Python's `round` (Rust's `f64::round` is half-away-from-zero).
fn round_half_even(x: f64) -> f64 {
    let floor = x.floor();
    match x - floor {
        d if d < 0.5 => floor,
        d if d > 0.5 => floor + 1.0,
        _ if (floor as i64) % 2 == 0 => floor,
        _ => floor + 1.0,
    }
}

pub struct Reproduction {
    num_inputs: usize,
    num_outputs: usize,
    genome_indexer: Counter,
    node_counter: Counter,
    conn_counter: Counter,
    species_fitness_fn: SpeciesFitnessFn,
    /// genome id -> (parent 1 id, parent 2 id), empty for the founding population.
    pub ancestors: HashMap<usize, (usize, usize)>,
}

impl Reproduction {
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self {
        Reproduction {
            num_inputs,
            num_outputs,
            genome_indexer: Counter::starting_at(1),
            node_counter: Counter::starting_at(num_inputs + num_outputs),
            conn_counter: Counter::starting_at(num_inputs * num_outputs),
            species_fitness_fn: mean_fitness,
            ancestors: HashMap::new(),
        }
    }

    pub fn with_species_fitness_fn(mut self, f: SpeciesFitnessFn) -> Self {
        self.species_fitness_fn = f;
        self
    }

    pub fn create_new_population(
        &mut self,
        population_size: usize,
        config: &NeatConfig,
        rng: &mut impl Rng,
    ) -> HashMap<usize, Genome> {
        let mut genomes = HashMap::with_capacity(population_size);
        for _ in 0..population_size {
            let key = self.genome_indexer.next();
            let genome = Genome::create_new(
                key,
                self.num_inputs,
                self.num_outputs,
                config,
                rng,
                &mut self.node_counter,
                &mut self.conn_counter,
            );
            genomes.insert(key, genome);
            self.ancestors.insert(key, (0, 0));
        }
        genomes
    }

    /// Produce the next generation's population from `species_set`, which is
    /// mutated in place to retain only surviving species (emptied of members;
    /// [`SpeciesSet::speciate`] repopulates them next).
    pub fn reproduce(
        &mut self,
        species_set: &mut SpeciesSet,
        population_size: usize,
        generation: usize,
        config: &NeatConfig,
        rng: &mut impl Rng,
    ) -> Result<HashMap<usize, Genome>, NeatError> {
        for species in species_set.species.values_mut() {
            Self::adjust_fitnesses_for_species(species)?;
        }

        let stagnant = self.stagnant_species(species_set, generation, config);

        let mut all_fitnesses = Vec::new();
        let mut surviving_keys = Vec::new();
        for (species_id, is_stagnant) in &stagnant {
            if !is_stagnant {
                let species = &species_set.species[species_id];
                all_fitnesses.extend(species.fitnesses());
                surviving_keys.push(*species_id);
            }
        }

        if all_fitnesses.is_empty() {
            return Err(NeatError::EmptyCrossover);
        }

        let adjusted = Self::adjusted_fitnesses(&all_fitnesses, &surviving_keys, species_set);
        let previous_sizes: Vec<usize> = surviving_keys
            .iter()
            .map(|k| species_set.species[k].members.len())
            .collect();
        let spawn_amounts =
            Self::compute_spawn_amounts(&adjusted, &previous_sizes, population_size, config.min_species_size);

        let mut new_population = HashMap::new();
        let mut innovations = Innovations::new();

        for (&species_id, &spawn_amount) in surviving_keys.iter().zip(spawn_amounts.iter()) {
            let species = species_set.species.get_mut(&species_id).unwrap();
            let parents = Self::select_genomes_for_reproduction(species, config, &mut new_population)?;
            let remaining = spawn_amount.saturating_sub(1);
            if remaining == 0 {
                continue;
            }
            self.spawn_offspring(remaining, &parents, &mut new_population, &mut innovations, config, rng);
        }

        species_set.species.retain(|k, _| surviving_keys.contains(k));

        Ok(new_population)
    }

    fn adjust_fitnesses_for_species(species: &mut Species) -> Result<(), NeatError> {
        let count = species.members.len();
        if count == 0 {
            return Ok(());
        }
        for genome in species.members.values_mut() {
            let f = genome.fitness.ok_or(NeatError::MissingFitness(genome.key))?;
            genome.fitness = Some(f / count as f64);
        }
        Ok(())
    }

    fn stagnant_species(
        &self,
        species_set: &mut SpeciesSet,
        generation: usize,
        config: &NeatConfig,
    ) -> Vec<(usize, bool)> {
        let mut data: Vec<usize> = species_set.species.keys().copied().collect();
        for &id in &data {
            let species = species_set.species.get_mut(&id).unwrap();
            let prev_fitness = species.fitness_history.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let fitness = (self.species_fitness_fn)(&species.fitnesses());
            species.fitness_history.push(fitness);
            species.adjusted_fitness = None;
            if fitness > prev_fitness {
                species.last_improved = generation;
            }
            species.fitness = Some(fitness);
        }

        data.sort_by(|a, b| {
            species_set.species[a]
                .fitness
                .partial_cmp(&species_set.species[b].fitness)
                .unwrap()
        });

        let mut result = Vec::with_capacity(data.len());
        let mut num_non_stagnant = data.len();
        for (idx, id) in data.iter().enumerate() {
            let species = &species_set.species[id];
            let stagnant_time = generation.saturating_sub(species.last_improved);
            let mut is_stagnant = num_non_stagnant > config.num_surviving_elite_species
                && stagnant_time >= config.max_stagnation;
            if data.len() - idx <= config.num_surviving_elite_species {
                is_stagnant = false;
            }
            if is_stagnant {
                num_non_stagnant -= 1;
            }
            result.push((*id, is_stagnant));
        }
        result
    }

    fn adjusted_fitnesses(fitnesses: &[f64], surviving_keys: &[usize], species_set: &mut SpeciesSet) -> Vec<f64> {
        let min_fitness = fitnesses.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_fitness = fitnesses.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let range = (max_fitness - min_fitness).max(1.0);

        surviving_keys
            .iter()
            .map(|id| {
                let species = species_set.species.get_mut(id).unwrap();
                let fs = species.fitnesses();
                let mean = fs.iter().sum::<f64>() / fs.len() as f64;
                let adjusted = (mean - min_fitness) / range;
                species.adjusted_fitness = Some(adjusted);
                adjusted
            })
            .collect()
    }

    fn compute_spawn_amounts(
        adjusted_fitnesses: &[f64],
        prev_sizes: &[usize],
        population_size: usize,
        min_species_size: usize,
    ) -> Vec<usize> {
        let sum: f64 = adjusted_fitnesses.iter().sum();
        let mut spawn_amounts: Vec<i64> = Vec::with_capacity(adjusted_fitnesses.len());

        for (&adj, &prev_size) in adjusted_fitnesses.iter().zip(prev_sizes.iter()) {
            let size = if adj > 0.0 {
                (adj / sum * population_size as f64).max(min_species_size as f64)
            } else {
                min_species_size as f64
            };
            let diff = (size - prev_size as f64) * 0.5;
            let change = round_half_even(diff) as i64;
            let mut spawn = prev_size as i64;
            if change.abs() > 0 {
                spawn += change;
            } else if diff > 0.0 {
                spawn += 1;
            } else if diff < 0.0 {
                spawn -= 1;
            }
            spawn_amounts.push(spawn);
        }

        let total_spawn: i64 = spawn_amounts.iter().sum();
        let total_spawn = total_spawn.max(1) as f64;
        let norm = population_size as f64 / total_spawn;

        spawn_amounts
            .iter()
            .map(|&n| (round_half_even(n as f64 * norm) as i64).max(min_species_size as i64) as usize)
            .collect()
    }

    fn select_genomes_for_reproduction(
        species: &mut Species,
        config: &NeatConfig,
        new_population: &mut HashMap<usize, Genome>,
    ) -> Result<Vec<Genome>, NeatError> {
        let mut old_members: Vec<Genome> = std::mem::take(&mut species.members).into_values().collect();
        if old_members.is_empty() {
            return Err(NeatError::EmptyCrossover);
        }
        old_members.sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap());

        let elite = old_members[0].clone();
        new_population.insert(elite.key, elite);

        let repro_cutoff = ((config.repro_survival_rate * old_members.len() as f64).ceil() as usize).max(2);
        Ok(old_members.into_iter().take(repro_cutoff).collect())
    }

    fn spawn_offspring(
        &mut self,
        spawn_amount: usize,
        possible_parents: &[Genome],
        new_population: &mut HashMap<usize, Genome>,
        innovations: &mut Innovations,
        config: &NeatConfig,
        rng: &mut impl Rng,
    ) {
        for _ in 0..spawn_amount {
            let parent_1 = &possible_parents[rng.random_range(0..possible_parents.len())];
            let parent_2 = &possible_parents[rng.random_range(0..possible_parents.len())];

            let genome_id = self.genome_indexer.next();
            let mut offspring = parent_1.crossover(parent_2, genome_id, config.keep_disabled_probability, rng);
            offspring.mutate(config, rng, innovations, &mut self.node_counter, &mut self.conn_counter);
            self.ancestors.insert(genome_id, (parent_1.key, parent_2.key));
            new_population.insert(genome_id, offspring);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::SpeciesSet;
    use rand::SeedableRng;

    fn rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(11)
    }

    #[test]
    fn create_new_population_has_requested_size() {
        let config = NeatConfig::default();
        let mut repro = Reproduction::new(2, 1);
        let pop = repro.create_new_population(20, &config, &mut rng());
        assert_eq!(pop.len(), 20);
    }

    #[test]
    fn full_cycle_produces_next_generation() {
        let config = NeatConfig::default();
        let mut repro = Reproduction::new(2, 1);
        let mut r = rng();
        let mut pop = repro.create_new_population(30, &config, &mut r);
        for (i, g) in pop.iter_mut() {
            g.fitness = Some(*i as f64);
        }
        let mut species_set = SpeciesSet::new(config.compatibility_threshold);
        species_set.speciate(&pop, 0, &config);
        let next_gen = repro.reproduce(&mut species_set, 30, 1, &config, &mut r).unwrap();
        assert!(!next_gen.is_empty());
    }

    #[test]
    fn spawn_normalization_matches_expected_magnitudes() {
        // adjusted_fitnesses=[0.6, 0.2], prev_sizes=[10, 10]: diffs/2 = [2.5, -2.5].
        // Half-to-even rounding sends both to their even neighbor (2, -2), so
        // s=[12, 8], norm=20/20=1, spawns=[12, 8].
        let amounts = Reproduction::compute_spawn_amounts(&[0.6, 0.2], &[10, 10], 20, 2);
        assert_eq!(amounts, vec![12, 8]);
    }

    #[test]
    fn round_half_even_matches_python_round() {
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(-2.5), -2.0);
        assert_eq!(round_half_even(3.5), 4.0);
        assert_eq!(round_half_even(-3.5), -4.0);
        assert_eq!(round_half_even(2.4), 2.0);
        assert_eq!(round_half_even(2.6), 3.0);
    }
}
