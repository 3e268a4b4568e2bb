//! Recording control: start/stop of the recording session and export of the
//! selected device tracks.

use log::{error, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use avl_core::{shapefile, Coordinate, DeviceTrack, ExportArtifact, ExportError, PathRecorder};

use super::naming::unique_base_name;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("No devices selected")]
    NoDevicesSelected,
}

/// Recording status information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStatus {
    pub active: bool,
    /// Retained point count per device
    pub devices: BTreeMap<String, usize>,
}

/// A device track that was written successfully
#[derive(Debug, Clone)]
pub struct DeviceExport {
    pub device_id: String,
    pub artifact: ExportArtifact,
}

/// A device track that could not be written
#[derive(Debug)]
pub struct DeviceExportFailure {
    pub device_id: String,
    pub error: ExportError,
}

/// Per-device results of one stop-and-export command
#[derive(Debug, Default)]
pub struct ExportReport {
    pub exported: Vec<DeviceExport>,
    pub failed: Vec<DeviceExportFailure>,
    /// Selected devices without any recorded point
    pub skipped: Vec<String>,
}

impl ExportReport {
    /// Geometry file names of all successful exports
    pub fn files(&self) -> Vec<String> {
        self.exported
            .iter()
            .map(|e| e.artifact.shp_filename())
            .collect()
    }

    /// True if no export was attempted
    pub fn is_empty(&self) -> bool {
        self.exported.is_empty() && self.failed.is_empty()
    }
}

/// Result of stopping a recording session
#[derive(Debug)]
pub enum StopOutcome {
    /// The session ended without a single retained point
    NothingRecorded,
    Exported(ExportReport),
}

/// Owns the recording session and serializes all access to it.
///
/// Cloning yields another handle to the same session.
#[derive(Debug, Clone)]
pub struct RecordingController {
    recorder: Arc<Mutex<PathRecorder>>,
    export_dir: PathBuf,
}

impl RecordingController {
    pub fn new(export_dir: PathBuf) -> Self {
        RecordingController {
            recorder: Arc::new(Mutex::new(PathRecorder::new())),
            export_dir,
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    // The recorder has no multi-step invariants a panicking holder could
    // break, so a poisoned lock is still safe to use.
    fn recorder(&self) -> MutexGuard<'_, PathRecorder> {
        self.recorder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new session, discarding tracks of the previous one
    pub fn start(&self) {
        self.recorder().start();
        info!("Recording started");
    }

    /// Stop the session and return a copy of all recorded tracks
    pub fn stop(&self) -> HashMap<String, DeviceTrack> {
        let mut recorder = self.recorder();
        let tracks = recorder.stop().clone();
        info!(
            "Recording stopped: {} devices, {} points",
            tracks.len(),
            recorder.point_count()
        );
        tracks
    }

    pub fn is_active(&self) -> bool {
        self.recorder().is_active()
    }

    /// Offer a validated sample to the recorder; true if it was retained
    pub fn ingest(&self, device_id: &str, coordinate: Coordinate) -> bool {
        self.recorder().ingest(device_id, coordinate)
    }

    pub fn status(&self) -> RecordingStatus {
        let recorder = self.recorder();
        RecordingStatus {
            active: recorder.is_active(),
            devices: recorder
                .tracks()
                .iter()
                .map(|(id, track)| (id.clone(), track.len()))
                .collect(),
        }
    }

    /// Stop recording and export the tracks of `selected` devices.
    ///
    /// Recording is stopped even when an error is returned. Export failures of
    /// single devices are collected in the report and do not abort the others.
    pub fn stop_and_export(&self, selected: &[String]) -> Result<StopOutcome, ControlError> {
        let tracks = self.stop();
        if tracks.values().all(|t| t.is_empty()) {
            info!("No points recorded");
            return Ok(StopOutcome::NothingRecorded);
        }
        if selected.is_empty() {
            return Err(ControlError::NoDevicesSelected);
        }

        let mut report = ExportReport::default();
        let mut seen = HashSet::new();
        let mut used_names = HashSet::new();
        for device_id in selected {
            if !seen.insert(device_id.as_str()) {
                continue;
            }
            let track = match tracks.get(device_id) {
                Some(track) if !track.is_empty() => track,
                _ => {
                    warn!("No points recorded for {}", device_id);
                    report.skipped.push(device_id.clone());
                    continue;
                }
            };

            // Distinct ids can sanitize to the same name
            let base_name = unique_base_name(device_id, &mut used_names);
            match shapefile::export(track.points(), &self.export_dir, &base_name) {
                Ok(artifact) => {
                    info!(
                        "Shapefile saved as {} for {}",
                        artifact.shp_filename(),
                        device_id
                    );
                    report.exported.push(DeviceExport {
                        device_id: device_id.clone(),
                        artifact,
                    });
                }
                Err(e) => {
                    if e.is_io() {
                        error!("Failed to export track for {}: {}", device_id, e);
                    } else {
                        warn!("Cannot export track for {}: {}", device_id, e);
                    }
                    report.failed.push(DeviceExportFailure {
                        device_id: device_id.clone(),
                        error: e,
                    });
                }
            }
        }

        Ok(StopOutcome::Exported(report))
    }
}
