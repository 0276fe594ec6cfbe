//! Foundation types for the symres crate.
//!
//! This module provides the primitives used throughout the resolver:
//! - [`SymbolName`] - Validated qualified names
//! - [`LocationId`] - Handles into the configured search order
//!
//! This module has NO dependencies on other symres modules apart from the
//! error type.

mod location_id;
mod name;

pub use location_id::LocationId;
pub use name::SymbolName;
