//! Domain model for partner branding, versioned configs, screens and fields.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep the JSON blob shapes (`*_config`, `field_config`) opaque except for
//!   the normalization rules core owns.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Screens and fields belong to exactly one config version.
//! - Order of screens/fields is carried by id arrays, not row order.

pub mod config;
pub mod partner;
pub mod screen;
