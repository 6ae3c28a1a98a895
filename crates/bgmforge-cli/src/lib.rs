//! bgmforge CLI library.
//!
//! Command implementations and logging setup for the `bgmforge` binary.

pub mod commands;
pub mod logging;
