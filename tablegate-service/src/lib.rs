//! # TableGate Service
//!
//! The validated, cached data layer that sits between callers and a
//! [`DataAdapter`](tablegate_core::DataAdapter).
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tablegate_adapters::MemoryAdapter;
//! use tablegate_service::{DataService, ServiceConfig};
//!
//! let service = DataService::new(Arc::new(MemoryAdapter::new()), ServiceConfig::default());
//! let user = service.create("users", record).await?;
//! let cached = service.find_one("users", &id).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod service;

pub use service::{DataService, ServiceConfig};
