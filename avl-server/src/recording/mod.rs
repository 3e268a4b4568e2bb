//! Track recording sessions and shapefile export.
//!
//! This module provides functionality to:
//! - Start and stop the operator-controlled recording session
//! - Feed incoming position reports to the distance-filtered recorder
//! - Export selected device tracks as `.shp`/`.shx`/`.dbf` triples
//!
//! The recorder itself lives in [`avl_core::track`]; this module owns it
//! behind a lock and maps device identifiers to file names in the configured
//! export directory.

pub mod controller;
pub mod naming;

pub use controller::{
    ControlError, DeviceExport, DeviceExportFailure, ExportReport, RecordingController,
    RecordingStatus, StopOutcome,
};
pub use naming::{safe_base_name, unique_base_name};
