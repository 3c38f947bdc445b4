//! Conversions between Rust values and the OCI internal encodings

pub mod date;
pub(crate) mod number;

pub use number::Number;
