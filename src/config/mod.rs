//! # Configuration
//!
//! Operator-level settings. Resource-level settings live on the CRDs.

mod operator;

pub use operator::{LogFormat, OperatorConfig};
