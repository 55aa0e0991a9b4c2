//! The state vector handed back to the agent after each simulated timestep.

#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub tcl_soc: f64,
    pub ess_soc: f64,
    pub out_temp: f64,
    pub generated_energy: f64,
    pub up_price: f64,
    pub base_residential_load: f64,
    pub pricing_counter: i64,
    pub hour_of_day: u8,
}
