//! Command surfaces built on the core engine.

pub mod lint;
pub mod resolve;
