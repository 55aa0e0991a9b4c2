//! Error types for the evolutionary core and the microgrid simulation.

/// Top-level error for everything outside network decoding/activation.
#[derive(thiserror::Error, miette::Diagnostic, Debug)]
pub enum NeatError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("genome {0} has no assigned fitness")]
    MissingFitness(usize),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("index {index} out of range (series length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no parent genomes available for reproduction")]
    EmptyCrossover,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Network(#[from] NetworkError),
}

/// Errors raised while decoding a genome into a network or driving it.
#[derive(thiserror::Error, miette::Diagnostic, Debug)]
pub enum NetworkError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
