//! clinv-aws: AWS source adapters
//!
//! Calls the `aws` command line for every cloud kind and normalizes the
//! answers into clinv source records.

pub mod adapters;
pub mod client;
pub mod error;
pub mod runner;

pub use adapters::{AwsAdapter, registry};
pub use client::{AwsCli, AwsConfig};
pub use error::AwsError;
pub use runner::{CommandResult, CommandRunner, LocalRunner};
