//! Command context and options

pub mod context;
pub mod options;
