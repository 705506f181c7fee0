//! Streaming Medline/PubMed citation ingestion.
//!
//! One pass over a directory tree of (optionally gzipped) Medline XML
//! files: each `MedlineCitation`/`BookDocument` subtree is folded into a
//! [`models::Citation`] aggregate by a tag-driven builder, screened
//! against the store for duplicates, and committed in its own
//! transaction. Files already recorded in the store are skipped before
//! any parsing starts, so re-running over a grown corpus is idempotent.

pub mod dates;
pub mod error;
pub mod models;
pub mod normalise;
pub mod parser;
pub mod pipeline;
pub mod repository;

pub use error::IngestError;
pub use models::Citation;
pub use parser::CitationReader;
pub use pipeline::{run_ingestion, RunConfig, RunReport};
pub use repository::IngestionRepository;
