//! Top-level generation loop: fitness evaluation (optionally parallel via
//! `rayon`), species-history snapshotting and best-genome tracking.

use std::collections::HashMap;

use log::{debug, info};
use rand::Rng;
use rayon::prelude::*;

use crate::config::NeatConfig;
use crate::error::NeatError;
use crate::genome::Genome;
use crate::reproduction::Reproduction;
use crate::species::SpeciesSet;

/// One generation's species snapshot, kept for post-hoc inspection.
pub struct SpeciesSnapshot {
    pub members: Vec<Genome>,
    pub created: usize,
    pub fitness: Option<f64>,
}

pub struct Evolution {
    config: NeatConfig,
    pub generation: usize,
    pub population: HashMap<usize, Genome>,
    reproduction: Reproduction,
    pub species_set: SpeciesSet,
    pub species_history: Vec<HashMap<usize, SpeciesSnapshot>>,
    pub best_genome: Option<Genome>,
}

impl Evolution {
    pub fn new(num_inputs: usize, num_outputs: usize, config: NeatConfig, rng: &mut impl Rng) -> Result<Self, NeatError> {
        config.validate()?;
        let mut reproduction = Reproduction::new(num_inputs, num_outputs);
        let population = reproduction.create_new_population(config.population_size, &config, rng);
        let mut species_set = SpeciesSet::new(config.compatibility_threshold);
        species_set.speciate(&population, 0, &config);

        info!(
            "initialized population of {} genomes into {} species",
            population.len(),
            species_set.species.len()
        );

        Ok(Evolution {
            config,
            generation: 0,
            population,
            reproduction,
            species_set,
            species_history: Vec::new(),
            best_genome: None,
        })
    }

    /// Evaluate the population sequentially with `fitness_fn`, which must
    /// assign `fitness` to every genome it receives.
    pub fn evaluate(&mut self, fitness_fn: impl Fn(&mut Genome)) {
        for genome in self.population.values_mut() {
            fitness_fn(genome);
        }
    }

    /// Evaluate the population in parallel via a data-parallel iterator. Each
    /// genome is evaluated in isolation; `fitness_fn` must be safe to call
    /// concurrently from multiple threads.
    pub fn evaluate_parallel(&mut self, fitness_fn: impl Fn(&mut Genome) + Sync) {
        self.population.par_iter_mut().for_each(|(_, genome)| fitness_fn(genome));
    }

    /// Run up to `n` generations, stopping early once `best_genome`'s fitness
    /// exceeds `fitness_goal`. `fitness_fn` is invoked once per generation and
    /// must assign fitness to every genome in the population it is given.
    pub fn run(
        &mut self,
        mut fitness_fn: impl FnMut(&mut HashMap<usize, Genome>),
        fitness_goal: f64,
        n: usize,
        rng: &mut impl Rng,
    ) -> Result<Genome, NeatError> {
        for _ in 0..n {
            info!(
                "generation {}, population size {}, species count {}",
                self.generation,
                self.population.len(),
                self.species_set.species.len()
            );

            fitness_fn(&mut self.population);

            let snapshot: HashMap<usize, SpeciesSnapshot> = self
                .species_set
                .species
                .iter()
                .map(|(&id, s)| {
                    (
                        id,
                        SpeciesSnapshot {
                            members: s.members.values().cloned().collect(),
                            created: s.created,
                            fitness: s.fitness,
                        },
                    )
                })
                .collect();
            self.species_history.push(snapshot);

            let best = self.best_in_population()?;
            if self.best_genome.as_ref().map(|b| b.fitness).unwrap_or(None).unwrap_or(f64::NEG_INFINITY)
                < best.fitness.unwrap()
            {
                debug!(
                    "new all-time best genome {} fitness {:.4} hidden nodes {}",
                    best.key,
                    best.fitness.unwrap(),
                    best.hidden_node_count()
                );
                self.best_genome = Some(best.clone());
            }

            if self.best_genome.as_ref().unwrap().fitness.unwrap() > fitness_goal {
                break;
            }

            self.population = self.reproduction.reproduce(
                &mut self.species_set,
                self.config.population_size,
                self.generation,
                &self.config,
                rng,
            )?;
            self.species_set.speciate(&self.population, self.generation, &self.config);
            self.generation += 1;
        }

        Ok(self.best_genome.clone().expect("at least one generation must run"))
    }

    pub fn best_in_population(&self) -> Result<Genome, NeatError> {
        let mut best: Option<&Genome> = None;
        for genome in self.population.values() {
            if genome.fitness.is_none() {
                return Err(NeatError::MissingFitness(genome.key));
            }
            if best.map(|b| genome.fitness > b.fitness).unwrap_or(true) {
                best = Some(genome);
            }
        }
        Ok(best.expect("population must be non-empty").clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn run_one_generation_updates_best_genome() {
        let config = NeatConfig::default();
        let mut rng = rand::rngs::StdRng::seed_from_u64(4);
        let mut evo = Evolution::new(2, 1, config, &mut rng).unwrap();
        let best = evo
            .run(
                |pop| {
                    for (i, g) in pop.iter_mut() {
                        g.fitness = Some(*i as f64);
                    }
                },
                f64::INFINITY,
                1,
                &mut rng,
            )
            .unwrap();
        assert!(best.fitness.is_some());
    }

    #[test]
    fn missing_fitness_is_reported() {
        let config = NeatConfig::default();
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let evo = Evolution::new(2, 1, config, &mut rng).unwrap();
        assert!(evo.best_in_population().is_err());
    }
}
