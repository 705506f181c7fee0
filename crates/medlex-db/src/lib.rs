//! Medlex Database Layer
//!
//! This crate owns the relational store the ingestion pipeline writes to:
//! connection pooling, schema management and the queries used for
//! incremental-load screening (loaded-file membership, citation existence).
//!
//! The citation graph itself is written by
//! `medlex-ingestion/src/repository.rs`, which borrows the pool from
//! [`Database`] and commits one citation per transaction.
//!
//! # Example
//!
//! ```rust,no_run
//! use medlex_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite://medlex.db?mode=rwc", 4).await?;
//!     db.create_schema().await?;
//!     assert!(!db.citation_exists(24_000_001).await?);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod schema;

pub use database::{Database, DatabaseStats};
pub use error::{DbError, Result};
