//! Strata Core - Core types and definitions for the Strata content repository
//!
//! This crate provides the fundamental types used across the Strata ecosystem:
//! - Content-type definitions (the schema a record must conform to)
//! - Records (typed, schema-validated property containers)
//! - Sequences (repeatable property groups decoded from JSON)
//! - Data dimensions (workspace / language / time-shift addressing)
//! - Error types

pub mod definition;
pub mod dimensions;
pub mod error;
pub mod ident;
pub mod record;
pub mod sequence;
pub mod user_info;

// Re-export commonly used types
pub use definition::{ClippingDefinition, ContentTypeDefinition, ContentTypeDefinitionBuilder};
pub use dimensions::DataDimensions;
pub use error::CoreError;
pub use record::Record;
pub use sequence::{Sequence, SequenceItem};
pub use user_info::UserInfo;
