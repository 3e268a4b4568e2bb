//! # AVL Core
//!
//! Track recording and shapefile export for automatic vehicle location.
//!
//! This crate contains the recording and encoding logic with **no network or
//! async dependencies**. The server crate feeds it validated position samples
//! and asks it to export recorded tracks.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  avl-core (no tokio/axum deps)                              │
//! │  ├── geo/        (coordinates, haversine, bounding boxes)   │
//! │  ├── track/      (per-device distance-filtered recorder)    │
//! │  └── shapefile/  (.shp / .shx / .dbf writers)               │
//! └─────────────────────────────────────────────────────────────┘
//!                               ▲
//!                  ┌────────────┴────────────┐
//!                  │  avl-server             │
//!                  │  (REST API, sessions)   │
//!                  └─────────────────────────┘
//! ```
//!
//! ## Example: Recording and Exporting a Track
//!
//! ```rust,no_run
//! use avl_core::{shapefile, Coordinate, PathRecorder};
//! use std::path::Path;
//!
//! let mut recorder = PathRecorder::new();
//! recorder.start();
//! recorder.ingest("dev1", Coordinate::new(35.70, 51.40));
//! recorder.ingest("dev1", Coordinate::new(35.71, 51.41));
//!
//! let tracks = recorder.stop();
//! let track = &tracks["dev1"];
//! let artifact = shapefile::export(track.points(), Path::new("/tmp/tracks"), "dev1")?;
//! println!("Wrote {}", artifact.shp.display());
//! # Ok::<(), avl_core::ExportError>(())
//! ```

pub mod error;
pub mod geo;
pub mod shapefile;
pub mod track;

// Re-export commonly used types
pub use error::ExportError;
pub use geo::{haversine_distance, BoundingBox, Coordinate};
pub use shapefile::ExportArtifact;
pub use track::{DeviceTrack, PathRecorder, MIN_POINT_SPACING_M};
