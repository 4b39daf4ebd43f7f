//! # TableGate Adapters
//!
//! Reference backends implementing the [`DataAdapter`] capability interface.
//!
//! This crate provides multiple backends:
//!
//! - **Memory**: In-process storage for development and testing
//! - **Rest**: A PostgREST-compatible HTTP service (Supabase REST and similar),
//!   behind the `rest` feature
//!
//! ## Example
//!
//! ```rust,ignore
//! use tablegate_adapters::{DataAdapter, MemoryAdapter};
//! use tablegate_core::QueryOptions;
//!
//! let adapter = MemoryAdapter::new();
//! let user = adapter.create("users", record).await?;
//! let page = adapter.find_many("users", &QueryOptions::new().limit(10)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod memory;
#[cfg(feature = "rest")]
mod rest;

pub use memory::MemoryAdapter;
#[cfg(feature = "rest")]
pub use rest::{RestAdapter, RestConfig};

// Re-export the trait from core
pub use tablegate_core::traits::DataAdapter;
