//! Insight Core - Trace model, topology types, and configuration
//!
//! This crate provides the foundational types shared by trace analyzers:
//!
//! - **Trace**: frames, operations, and frame-tree navigation
//! - **Topology**: external resource descriptors and the analyzer trait
//! - **Collaborators**: token registry, name generation, colour assignment
//! - **Config**: TOML configuration with environment overrides

pub mod color;
pub mod config;
pub mod naming;
pub mod operation;
pub mod tokens;
pub mod topology;
pub mod trace;

// Re-export commonly used types
pub use color::{ColorManager, NoColor, PaletteColorManager};
pub use config::{AnalyzerConfig, ConfigError, ConfigLoader};
pub use naming::create_name;
pub use operation::{Operation, OperationMap};
pub use tokens::TokenNames;
pub use topology::{ExternalResourceAnalyzer, ExternalResourceDescriptor, ExternalResourceType};
pub use trace::{Frame, FrameTree, Trace};

/// Crate version
pub const INSIGHT_VERSION: &str = env!("CARGO_PKG_VERSION");
