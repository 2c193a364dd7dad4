//! Provider implementations for the supported model families

pub mod cohere;
pub mod generic;

pub use cohere::CohereProvider;
pub use generic::GenericProvider;
