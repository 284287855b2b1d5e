//! Worker Job manifest handling
//!
//! Turns a caller-supplied Job description into one that can be submitted
//! over and over: namespace resolved, marker and group labels attached, a
//! unique name, a restart policy and a single-pass `INTERVAL`.
//! Pure transformation crate, no API calls.

mod error;
mod manifest;
mod normalize;
mod random;

pub use error::ManifestError;
pub use manifest::Manifest;
pub use normalize::{
    ensure_namespace, group_name, is_normalized, normalize, resolve_namespace, DEFAULT_RESTART_POLICY,
    INTERVAL_ENV,
};
pub use random::{random_suffix, SUFFIX_LEN};
