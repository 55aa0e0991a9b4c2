pub mod genes;
pub mod genome;

pub use genes::{ConnectionGene, NodeGene, NodeType};
pub use genome::Genome;
