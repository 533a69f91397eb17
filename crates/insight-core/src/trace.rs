//! Traces - trees of captured execution frames
//!
//! A trace owns every frame captured for one end-to-end request. Frames link
//! to their parent by id; the frame without a parent is the root.

use crate::operation::Operation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A completed trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    /// Unique trace ID
    pub trace_id: String,

    /// When the trace started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// All frames in this trace
    #[serde(default)]
    pub frames: Vec<Frame>,
}

impl Trace {
    /// Create a new, empty trace
    pub fn new() -> Self {
        Self {
            trace_id: ulid::Ulid::new().to_string(),
            started_at: Some(Utc::now()),
            frames: Vec::new(),
        }
    }

    /// Append a frame, returning its id
    pub fn push(&mut self, frame: Frame) -> String {
        let id = frame.frame_id.clone();
        self.frames.push(frame);
        id
    }

    pub fn frame(&self, frame_id: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.frame_id == frame_id)
    }

    /// The first frame without a parent
    pub fn root_frame(&self) -> Option<&Frame> {
        self.frames.iter().find(|f| f.is_root())
    }

    /// Frames whose operation type is one of `types`
    pub fn frames_of_type<S: AsRef<str>>(&self, types: &[S]) -> Vec<&Frame> {
        self.frames
            .iter()
            .filter(|f| types.iter().any(|t| t.as_ref() == f.operation.op_type))
            .collect()
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}

/// One node of the execution tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame ID, unique within the trace
    pub frame_id: String,

    /// Parent frame ID (`None` for the root)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Captured operation
    pub operation: Operation,
}

impl Frame {
    pub fn new(operation: Operation) -> Self {
        Self {
            frame_id: ulid::Ulid::new().to_string(),
            parent_id: None,
            operation,
        }
    }

    pub fn with_parent(mut self, parent: &Frame) -> Self {
        self.parent_id = Some(parent.frame_id.clone());
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Id index over the frames of one trace
pub struct FrameTree<'a> {
    by_id: HashMap<&'a str, &'a Frame>,
}

impl<'a> FrameTree<'a> {
    pub fn new(trace: &'a Trace) -> Self {
        let by_id = trace
            .frames
            .iter()
            .map(|f| (f.frame_id.as_str(), f))
            .collect();
        Self { by_id }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, frame_id: &str) -> Option<&'a Frame> {
        self.by_id.get(frame_id).copied()
    }

    pub fn parent(&self, frame: &Frame) -> Option<&'a Frame> {
        frame.parent_id.as_deref().and_then(|id| self.get(id))
    }

    /// Walk parent links up to the root.
    ///
    /// A parent id that is not part of the trace ends the walk at the last
    /// frame reached. Returns `None` only when the walk exceeds the number of
    /// frames in the trace, which means the parent links form a cycle.
    pub fn root_of(&self, frame: &'a Frame) -> Option<&'a Frame> {
        let mut current = frame;
        let mut steps = 0usize;

        while let Some(parent_id) = current.parent_id.as_deref() {
            match self.get(parent_id) {
                Some(parent) => current = parent,
                None => {
                    debug!(
                        "Frame {} references unknown parent {}",
                        current.frame_id, parent_id
                    );
                    return Some(current);
                }
            }

            steps += 1;
            if steps > self.by_id.len() {
                warn!("Parent links of frame {} form a cycle", frame.frame_id);
                return None;
            }
        }

        Some(current)
    }
}
