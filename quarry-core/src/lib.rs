// quarry-core/src/lib.rs

// 1. Mandatory documentation for production code
#![allow(missing_docs)]

// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Contracts for table I/O and cached JSON fetches.
pub mod ports;

// 2. Domain (business core)
// Frame helpers, transforms, quality gates, join, config and run metadata.
// Depends on nothing else in the crate (no infra, no app).
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB table store, HTTP cache, YAML config loader, atomic writes.
// Depends on the Domain and the Ports.
pub mod infrastructure;

// 4. Application (Use Cases)
// Full ETL run and the staged runs.
// Depends on the Domain, the Infra and the Ports.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
// `use quarry_core::QuarryError;`
pub use error::QuarryError;
