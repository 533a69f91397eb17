//! External resource analysis for Insight traces
//!
//! Locates the remote HTTP endpoints a trace called, labels them, and
//! collapses repeated calls into one descriptor per endpoint.

pub mod error;
pub mod http;
pub mod uri;

pub use error::{TopologyError, TopologyResult};
pub use crate::http::{CorrelationTokens, HttpExternalResourceAnalyzer};

pub use insight_core::topology::{
    ExternalResourceAnalyzer, ExternalResourceDescriptor, ExternalResourceType,
};
