//! Command implementations, one module per subcommand.

pub mod clear;
pub mod export;
pub mod run;
pub mod show;
pub mod status;
