//! External resources - endpoints contacted during a trace
//!
//! Analyzers turn frames into [`ExternalResourceDescriptor`]s. Descriptors
//! deduplicate by value, so repeated calls to the same endpoint collapse into
//! one entry.

use crate::trace::{Frame, Trace};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// Kind of external resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalResourceType {
    WebServer,
    Database,
    Queue,
    Other,
}

impl ExternalResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalResourceType::WebServer => "WEB_SERVER",
            ExternalResourceType::Database => "DATABASE",
            ExternalResourceType::Queue => "QUEUE",
            ExternalResourceType::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for ExternalResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One distinct external endpoint contacted during a trace.
///
/// Equality and hashing cover the identity of the endpoint only: name,
/// label, type, vendor, host, port, and direction. The originating frame,
/// the colour, and the correlation tokens are carried along but do not make
/// two descriptors distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalResourceDescriptor {
    /// Frame the descriptor was built from
    pub frame_id: String,

    /// Stable identity derived from `host:port`
    pub name: String,

    /// Display label
    pub label: String,

    pub resource_type: ExternalResourceType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,

    pub host: String,

    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Whether the resource called into the traced application
    pub incoming: bool,

    /// Application token reported by the remote side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,

    /// Server token reported by the remote side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Endpoint token reported by the remote side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl ExternalResourceDescriptor {
    /// `host:port`
    pub fn host_port(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl PartialEq for ExternalResourceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.label == other.label
            && self.resource_type == other.resource_type
            && self.vendor == other.vendor
            && self.host == other.host
            && self.port == other.port
            && self.incoming == other.incoming
    }
}

impl Eq for ExternalResourceDescriptor {}

impl Hash for ExternalResourceDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.label.hash(state);
        self.resource_type.hash(state);
        self.vendor.hash(state);
        self.host.hash(state);
        self.port.hash(state);
        self.incoming.hash(state);
    }
}

/// Locates the external resources a trace talks to
pub trait ExternalResourceAnalyzer: Send + Sync {
    /// Analyzer name
    fn name(&self) -> &str;

    /// Operation types whose frames this analyzer inspects
    fn operation_types(&self) -> &[String];

    /// Build the deduplicated descriptor set for the given candidate frames
    fn locate_external_resources(
        &self,
        trace: &Trace,
        frames: &[&Frame],
    ) -> HashSet<ExternalResourceDescriptor>;

    /// Select candidate frames from the trace, then locate their resources
    fn locate_in_trace(&self, trace: &Trace) -> HashSet<ExternalResourceDescriptor> {
        let frames = trace.frames_of_type(self.operation_types());
        self.locate_external_resources(trace, &frames)
    }
}
