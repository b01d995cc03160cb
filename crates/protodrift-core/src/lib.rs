//! # protodrift-core
//!
//! A library for detecting and stripping unknown protobuf fields.
//!
//! Unknown fields show up when a peer's schema is newer than ours: the wire
//! carries field numbers we have never heard of, and the decoder parks them
//! in the message's unknown slot. This crate provides:
//!
//! - A recursive scanner that finds (or clears) unknown fields anywhere in a
//!   message tree
//! - An RPC interceptor that runs the scanner on every received message,
//!   calls user callbacks, and optionally strips the unknown data
//! - Helpers for checking stored messages outside of any RPC
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`scanner`]: Unknown-field traversal over `prost_reflect::DynamicMessage`
//! - [`interceptor`]: Wrap points for unary and streaming calls
//! - [`schema`]: Descriptor pool loading
//! - [`framing`]: Splitting and joining stored message records
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use protodrift_core::{decode_records, find_message, load_descriptor_pool, Framing};
//! use protodrift_core::scanner::{drop_unknown_fields, unknown_field_sites};
//!
//! let pool = load_descriptor_pool("api.binpb")?;
//! let desc = find_message(&pool, "acme.v1.Order")?;
//! let data = std::fs::read("orders.bin")?;
//!
//! for mut order in decode_records(&desc, &data, Framing::Delimited)? {
//!     for site in unknown_field_sites(&order) {
//!         println!("{}", site);
//!     }
//!     drop_unknown_fields(&mut order);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`Interceptor`]: Implement to add other per-call behavior at the same
//!   wrap points
//! - [`UnknownFieldCallback`]: Implement to decide what happens when drift
//!   is found
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod error;
pub mod framing;
pub mod interceptor;
pub mod scanner;
pub mod schema;

#[cfg(test)]
pub(crate) mod testing;

// Re-export primary types for convenience
pub use error::{Error, Result};
pub use framing::{decode_records, encode_records, split_records, Framing};
pub use interceptor::{
    CallSpec, Interceptor, InterceptorConfig, StreamType, UnknownFieldCallback,
    UnknownFieldsInterceptor,
};
pub use scanner::{
    drop_unknown_fields, for_each_unknown_field, for_each_unknown_field_mut, has_unknown_fields,
    UnknownFieldSite,
};
pub use schema::{find_message, load_descriptor_pool};

// Runtime crates whose types appear in the public API
pub use prost_reflect;
pub use tonic;

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
