//! # Decoding Round-Report Files into Ordered JSON Mappings
//!
//! This module decodes raw snapshot bytes into an ordered JSON mapping and,
//! on failure, classifies the underlying decoder fault into a fixed set of
//! diagnostic reasons. The classification distinguishes depth-limit faults,
//! structural inconsistencies, unescaped control characters, malformed
//! encodings, generic syntax faults, and the legacy snapshot format (detected
//! by its `\mapname\` field marker, which takes priority over the generic
//! syntax diagnosis).
//!
//! ## Submodules
//!
//! - **classifier**: Contains the decoding entry point and fault classification logic.

mod classifier;

pub use classifier::{decode_report, DecodeError, DecodeErrorKind, LEGACY_MARKER};
