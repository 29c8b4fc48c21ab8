//! Retention: policy evaluation and cleanup execution.

pub mod cleanup;
pub mod policy;
