//! Research pipeline: expand a user query into sub-queries, search, dedupe,
//! fetch the top sources concurrently and pack their text into a bounded
//! context for answer synthesis.

pub mod config;
pub mod error;
pub mod fanout;
pub mod models;
pub mod pipeline;
pub mod tasks;
pub mod tools;

pub use config::{ResearchConfig, ServiceSettings};
pub use error::{FetchErrorKind, ResearchError, ServiceError};
pub use models::{AssembledContext, ContextSegment, FetchResult, ResearchOutcome, SearchResult};
pub use pipeline::{ResearchPipeline, Stage};
