pub mod observability;
pub mod persistence;
pub mod repositories;
pub mod simulation;

pub use repositories::InMemoryDecisionRepository;
