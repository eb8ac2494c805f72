//! Domain types for revscan.

pub mod bar;

pub use bar::{validate_series, Bar, BarError};

/// Security code type alias (six-digit exchange code, e.g. "600519").
pub type Code = String;
