//! Configuration, answer generation, and the retrieval-augmented answer pipeline.

pub mod answer;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod products;
pub mod secret;

pub use answer::{Answer, AnswerError, AnswerGenerator, AnswerRequest, AnswerState};
pub use config::{Config, ConfigError};
pub use error::RagError;
pub use pipeline::{RagAnswer, RagOutcome, RagPipeline};
pub use products::{ProductCatalog, ProductError, ProductGroup, compose_query};
pub use secret::Secret;
