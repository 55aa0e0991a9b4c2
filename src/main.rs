use std::collections::HashMap;

use neat::config::{MicrogridConfig, NeatConfig};
use neat::microgrid::{Action, DeficiencyPriority, Environment, ExcessPriority, Observation};
use neat::network::{Network, RecurrentNetwork};
use neat::{Evolution, Genome};

use log::info;
use rand::SeedableRng;

const NUM_INPUTS: usize = 8;
const NUM_OUTPUTS: usize = 4;
const STEPS_PER_EPISODE: usize = 48;

fn synthetic_series(len: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
    let out_temps: Vec<f64> = (0..len).map(|i| 15.0 + 5.0 * ((i as f64) * 0.1).sin()).collect();
    let up_prices: Vec<f64> = vec![1.0; len];
    let down_prices: Vec<f64> = vec![0.4; len];
    let generated_energy: Vec<f64> = (0..len).map(|i| 80.0 + 20.0 * ((i as f64) * 0.2).cos()).collect();
    let hourly_base_prices: Vec<f64> = vec![5.48; len];
    (out_temps, up_prices, down_prices, generated_energy, hourly_base_prices)
}

fn observation_inputs(obs: &Observation) -> Vec<f64> {
    vec![
        obs.tcl_soc,
        obs.ess_soc,
        obs.out_temp,
        obs.generated_energy,
        obs.up_price,
        obs.base_residential_load,
        obs.pricing_counter as f64,
        obs.hour_of_day as f64,
    ]
}

fn run_episode(genome: &Genome, microgrid_config: &MicrogridConfig, rng: &mut impl rand::Rng) -> f64 {
    let (out_temps, up_prices, down_prices, generated_energy, hourly_base_prices) =
        synthetic_series(STEPS_PER_EPISODE + 1);
    let mut env = Environment::from_config(
        microgrid_config,
        out_temps,
        up_prices,
        down_prices,
        generated_energy,
        hourly_base_prices,
        0,
        rng,
    );
    let mut net = RecurrentNetwork::create(genome);

    let mut total_reward = 0.0;
    let mut obs = match env.observation() {
        Ok(obs) => obs,
        Err(_) => return total_reward,
    };
    for _ in 0..STEPS_PER_EPISODE {
        let outputs = match net.activate(&observation_inputs(&obs)) {
            Ok(outputs) => outputs,
            Err(_) => break,
        };
        let action = match Action::from_outputs(&outputs) {
            Ok(action) => action,
            Err(_) => Action::new(0, 0, DeficiencyPriority::BuyFirst, ExcessPriority::SellFirst).unwrap(),
        };
        match env.step(&action, rng) {
            Ok((next_obs, reward)) => {
                total_reward += reward;
                obs = next_obs;
            }
            Err(_) => break,
        }
    }
    total_reward
}

fn main() {
    env_logger::init();

    let neat_config = NeatConfig {
        population_size: 20,
        ..NeatConfig::default()
    };
    let mut microgrid_config = MicrogridConfig::default();
    microgrid_config.tcl.num_tcls = 10;
    microgrid_config.residential.num_households = 10;

    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let mut evo = Evolution::new(NUM_INPUTS, NUM_OUTPUTS, neat_config, &mut rng)
        .expect("default configuration must be valid");

    let fitness_fn = |population: &mut HashMap<usize, Genome>| {
        for genome in population.values_mut() {
            let mut episode_rng = rand::rngs::StdRng::seed_from_u64(genome.key as u64);
            let reward = run_episode(genome, &microgrid_config, &mut episode_rng);
            genome.fitness = Some(reward);
        }
    };

    let best = evo
        .run(fitness_fn, f64::INFINITY, 5, &mut rng)
        .expect("population is never empty once constructed");

    info!(
        "best genome {} after {} generations: fitness {:.3}, {} hidden nodes",
        best.key,
        evo.generation,
        best.fitness.unwrap_or(f64::NAN),
        best.hidden_node_count()
    );
}
