//! Request fingerprint/dedup filtering (SPEC_FULL.md §4.2).
//!
//! [`simple::SimpleFilter`] is straight-uniqueness dedup plus domain/static
//! scoping. [`smart::SmartFilter`] runs a `SimpleFilter` first, then
//! collapses pseudo-static URLs by marking parameter names/values and path
//! segments into symbolic tokens (see [`marker`]) before computing the
//! final identity.

pub mod marker;
pub mod simple;
pub mod smart;

pub use simple::SimpleFilter;
pub use smart::SmartFilter;

use md5::{Digest, Md5};

/// Hex-encoded MD5 of `input`. The only call site for hashing in the
/// crate — every identity (`pathId`, `queryMapId`, `uniqueId`, ...) goes
/// through this.
pub fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Filtering mode, as configured by `FilterMode` (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Straight uniqueness only.
    Simple,
    /// Pseudo-static marker collapse, non-strict value classification.
    Smart,
    /// Pseudo-static marker collapse, strict value classification
    /// (`{{no_lower}}`/`{{mix_str}}` branches enabled).
    Strict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_is_stable_and_matches_known_vector() {
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }
}
