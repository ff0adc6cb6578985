//! Structural manipulation detection over extracted page text

pub mod layout;
pub mod structure;

pub use layout::*;
pub use structure::*;
