//! Configuration for problem setup.

pub mod options;
pub use options::ProblemOptions;
