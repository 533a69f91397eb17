//! UI colour assignment for external resources

use crate::operation::Operation;
use sha2::{Digest, Sha256};

/// Default palette, used when no colours are configured
pub const DEFAULT_PALETTE: &[&str] = &[
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
    "#9c755f", "#bab0ac",
];

/// Assigns a display colour to an operation
pub trait ColorManager: Send + Sync {
    fn color(&self, operation: &Operation) -> Option<String>;
}

/// Picks a colour from a fixed palette, keyed by operation type
#[derive(Debug, Clone)]
pub struct PaletteColorManager {
    palette: Vec<String>,
}

impl PaletteColorManager {
    pub fn new(palette: Vec<String>) -> Self {
        Self { palette }
    }
}

impl Default for PaletteColorManager {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect())
    }
}

impl ColorManager for PaletteColorManager {
    fn color(&self, operation: &Operation) -> Option<String> {
        if self.palette.is_empty() {
            return None;
        }

        let digest = Sha256::digest(operation.op_type.as_bytes());
        let idx = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
            % self.palette.len();
        self.palette.get(idx).cloned()
    }
}

/// Never assigns a colour
#[derive(Debug, Clone, Copy, Default)]
pub struct NoColor;

impl ColorManager for NoColor {
    fn color(&self, _operation: &Operation) -> Option<String> {
        None
    }
}
