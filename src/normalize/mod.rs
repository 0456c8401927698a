//! Region-name canonicalization and the fixed lookup tables it relies on.
//!
//! - [`key`]: the two join-key variants (strip-KOTA for aggregation,
//!   retain-KOTA for the boundary join) and the exception dictionary.
//! - [`codes`]: BPS administrative code to region name table for West Java.

pub mod codes;
pub mod key;
