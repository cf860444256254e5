//! # Academia Database Crate
//!
//! This crate is the persistence gateway for the academic records: students,
//! subjects and enrollments.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** All SQL lives here. The rest of the application talks to the
//!   `AcademicStore` and `TransactionalStore` traits and never sees a query.
//! - **Scoped Transactions:** `begin_serializable` hands out a `StoreTransaction`
//!   that commits explicitly and rolls back when dropped, so no exit path can
//!   leave a half-applied change behind.
//! - **Two Backends:** `DbRepository` runs on PostgreSQL through a pooled `sqlx`
//!   connection; `InMemoryRepository` keeps everything in process for tests and
//!   local runs.
//!
//! ## Public API
//!
//! - `connect`, `run_migrations`: pool creation and schema setup.
//! - `DbRepository`, `InMemoryRepository`: the two store implementations.
//! - `DbError`: the error type, with serialization failures and unique
//!   violations already classified.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use gateway::{AcademicStore, StoreTransaction, TransactionalStore, TxHandle};
pub use memory::InMemoryRepository;
pub use repository::{DbRepository, PgStoreTransaction};
