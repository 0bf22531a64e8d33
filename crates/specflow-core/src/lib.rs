pub mod bundle;
pub mod config;
pub mod error;
pub mod project;
pub mod publish;
pub mod spec_tree;
pub mod summary;
pub mod task;
pub mod types;

pub use error::{Result, SpecflowError};
