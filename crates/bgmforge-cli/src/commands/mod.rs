//! CLI command implementations

pub mod batch;
pub mod build;
pub mod export;
pub mod extract;

mod options;
mod reporting;

pub use options::BuilderOptions;
