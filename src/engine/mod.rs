//! Engine orchestration: single-statement verification and batch driving

pub mod batch;
pub mod core;

pub use batch::*;
pub use self::core::*;
