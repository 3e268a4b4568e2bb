//! Error types for shapefile export

use thiserror::Error;

/// Errors that can occur when exporting a track
#[derive(Error, Debug)]
pub enum ExportError {
    /// Not enough points to form a polyline
    #[error("At least 2 points are required for a polyline, got {points}")]
    InsufficientGeometry { points: usize },

    /// Directory creation or file write failed
    #[error("Export I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// True if the failure came from the filesystem rather than the input
    pub fn is_io(&self) -> bool {
        matches!(self, ExportError::Io(_))
    }
}
