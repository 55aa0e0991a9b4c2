//! Species and speciation: partitioning a population into compatibility
//! classes, tracked across generations by representative genomes.

use std::collections::HashMap;

use crate::config::NeatConfig;
use crate::genome::Genome;

#[derive(Debug, Clone)]
pub struct Species {
    pub key: usize,
    pub created: usize,
    pub last_improved: usize,
    pub representative: Option<Genome>,
    pub members: HashMap<usize, Genome>,
    pub fitness: Option<f64>,
    pub adjusted_fitness: Option<f64>,
    pub fitness_history: Vec<f64>,
}

impl Species {
    pub fn new(key: usize, created: usize) -> Self {
        Species {
            key,
            created,
            last_improved: created,
            representative: None,
            members: HashMap::new(),
            fitness: None,
            adjusted_fitness: None,
            fitness_history: Vec::new(),
        }
    }

    pub fn fitnesses(&self) -> Vec<f64> {
        self.members.values().filter_map(|g| g.fitness).collect()
    }
}

/// Memoizes [`Genome::distance`] symmetrically for the duration of one
/// speciation pass.
pub struct DistanceCache<'a> {
    config: &'a NeatConfig,
    distances: HashMap<(usize, usize), f64>,
}

impl<'a> DistanceCache<'a> {
    pub fn new(config: &'a NeatConfig) -> Self {
        DistanceCache {
            config,
            distances: HashMap::new(),
        }
    }

    pub fn distance(&mut self, a: &Genome, b: &Genome) -> f64 {
        if let Some(&d) = self.distances.get(&(a.key, b.key)) {
            return d;
        }
        let d = a.distance(b, self.config);
        self.distances.insert((a.key, b.key), d);
        self.distances.insert((b.key, a.key), d);
        d
    }
}

/// Owns every [`Species`] across generations and the genome -> species index.
pub struct SpeciesSet {
    next_species_key: usize,
    pub species: HashMap<usize, Species>,
    genome_to_species: HashMap<usize, usize>,
    compatibility_threshold: f64,
}

impl SpeciesSet {
    pub fn new(compatibility_threshold: f64) -> Self {
        SpeciesSet {
            next_species_key: 1,
            species: HashMap::new(),
            genome_to_species: HashMap::new(),
            compatibility_threshold,
        }
    }

    pub fn species_of(&self, genome_id: usize) -> Option<usize> {
        self.genome_to_species.get(&genome_id).copied()
    }

    /// Partition `population` into species for `generation`, reusing
    /// representatives from the previous pass where possible.
    pub fn speciate(&mut self, population: &HashMap<usize, Genome>, generation: usize, config: &NeatConfig) {
        let mut unspeciated: Vec<usize> = population.keys().copied().collect();
        unspeciated.sort_unstable();
        unspeciated.reverse();
        let mut distances = DistanceCache::new(config);

        let mut representatives: HashMap<usize, usize> = HashMap::new();
        let mut members: HashMap<usize, Vec<usize>> = HashMap::new();

        let mut existing_ids: Vec<usize> = self.species.keys().copied().collect();
        existing_ids.sort_unstable();
        for species_id in existing_ids {
            let rep = self.species[&species_id].representative.clone();
            let Some(rep) = rep else { continue };
            let mut best: Option<(f64, usize)> = None;
            for &gid in &unspeciated {
                let d = distances.distance(&rep, &population[&gid]);
                if best.map(|(bd, _)| d < bd).unwrap_or(true) {
                    best = Some((d, gid));
                }
            }
            if let Some((_, new_rep_id)) = best {
                representatives.insert(species_id, new_rep_id);
                members.insert(species_id, vec![new_rep_id]);
                unspeciated.retain(|&id| id != new_rep_id);
            }
        }

        // unspeciated is reverse-sorted, so popping from the end yields ascending key order.
        while let Some(genome_id) = unspeciated.pop() {
            let genome = &population[&genome_id];
            let mut candidates: Vec<(f64, usize)> = Vec::new();
            let mut rep_ids: Vec<usize> = representatives.keys().copied().collect();
            rep_ids.sort_unstable();
            for species_id in rep_ids {
                let rep_id = representatives[&species_id];
                let d = distances.distance(&population[&rep_id], genome);
                if d < self.compatibility_threshold {
                    candidates.push((d, species_id));
                }
            }
            if let Some(&(_, species_id)) = candidates
                .iter()
                .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap())
            {
                members.get_mut(&species_id).unwrap().push(genome_id);
            } else {
                let species_id = self.next_species_key;
                self.next_species_key += 1;
                representatives.insert(species_id, genome_id);
                members.insert(species_id, vec![genome_id]);
            }
        }

        self.genome_to_species.clear();
        for (species_id, rep_id) in &representatives {
            let species = self
                .species
                .entry(*species_id)
                .or_insert_with(|| Species::new(*species_id, generation));

            let member_ids = &members[species_id];
            for &gid in member_ids {
                self.genome_to_species.insert(gid, *species_id);
            }
            let member_map: HashMap<usize, Genome> = member_ids.iter().map(|&id| (id, population[&id].clone())).collect();
            species.representative = Some(population[rep_id].clone());
            species.members = member_map;
        }

        self.species.retain(|id, _| representatives.contains_key(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::innovation::Counter;
    use rand::SeedableRng;

    fn sample_population(n: usize) -> HashMap<usize, Genome> {
        let config = NeatConfig::default();
        let mut node_counter = Counter::starting_at(0);
        let mut conn_counter = Counter::starting_at(0);
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        (0..n)
            .map(|i| {
                let mut g = Genome::create_new(i, 2, 1, &config, &mut rng, &mut node_counter, &mut conn_counter);
                g.fitness = Some(i as f64);
                (i, g)
            })
            .collect()
    }

    #[test]
    fn distance_cache_is_symmetric() {
        let config = NeatConfig::default();
        let pop = sample_population(2);
        let mut cache = DistanceCache::new(&config);
        let d1 = cache.distance(&pop[&0], &pop[&1]);
        let d2 = cache.distance(&pop[&1], &pop[&0]);
        assert_eq!(d1, d2);
    }

    #[test]
    fn speciate_assigns_every_genome_to_exactly_one_species() {
        let config = NeatConfig::default();
        let pop = sample_population(10);
        let mut set = SpeciesSet::new(config.compatibility_threshold);
        set.speciate(&pop, 0, &config);
        for gid in pop.keys() {
            assert!(set.species_of(*gid).is_some());
        }
        for species in set.species.values() {
            assert!(!species.members.is_empty());
        }
    }
}
