pub mod config;
pub mod copy_tree;
pub mod error;
pub mod generator;
pub mod mutants;
pub mod operators;
pub mod output;
pub mod runner;
pub mod safety;
pub mod scan;
pub mod score;
pub mod state;
pub mod store;

pub use config::RunConfig;
pub use error::{Error, Result};
pub use generator::{SourceUnit, generate};
pub use mutants::{MutantCandidate, MutantRecord, MutantStatus};
pub use operators::{Category, MutationOperator, Priority, default_catalog};
pub use state::{MutationSession, Report};
