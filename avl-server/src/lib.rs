//! # AVL Server
//!
//! Vehicle location server with track recording and shapefile export.
//!
//! This crate provides a small server that:
//! - Accepts position reports from tracked devices
//! - Keeps the last known location of every device
//! - Records distance-filtered tracks while a recording session is active
//! - Exports recorded tracks as ESRI shapefiles on request
//!
//! ## Architecture
//!
//! The server is built on top of [`avl_core`] for track recording and file
//! encoding, with [`tokio`] and `axum` providing the HTTP side.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    avl-server                           │
//! │  ┌───────────────────────────────────────────────────┐  │
//! │  │ REST API (axum)                                   │  │
//! │  └──────┬──────────────────────────────┬─────────────┘  │
//! │         ▼                              ▼                │
//! │  ┌──────────────────────┐  ┌──────────────────────────┐ │
//! │  │ LocationStore        │  │ RecordingController      │ │
//! │  │ (Arc<RwLock>)        │  │ (Arc<Mutex<PathRecorder>>│ │
//! │  │ - last known report  │  │ - start / stop           │ │
//! │  │   per device         │  │ - shapefile export       │ │
//! │  └──────────────────────┘  └──────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## REST API
//!
//! | Endpoint | Description |
//! |----------|-------------|
//! | `POST /api/receive_location/` | Report a device position |
//! | `GET /api/receive_location/` | List recently active devices |
//! | `POST /start_recording/` | Start a new recording session |
//! | `POST /stop_recording/` | Stop recording and export selected devices |
//! | `GET /recording/status` | Recording state and points per device |
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for all available options. Key options:
//!
//! - `-p, --port` - HTTP server port (default: 8000)
//! - `-e, --export-dir` - Directory for exported shapefiles
//! - `-v` - Increase verbosity (use multiple times)

use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use avl_core::Coordinate;

pub mod config;
pub mod location;
pub mod recording;

use location::{DeviceLocation, LocationStore};
use recording::RecordingController;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Port for webserver
    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,

    /// Directory where exported shapefiles are written
    /// [default: <user data dir>/shapefiles]
    #[arg(short, long)]
    pub export_dir: Option<PathBuf>,

    /// Seconds since its last report for which a device counts as active
    #[arg(long, default_value_t = 300)]
    pub active_window_secs: u32,
}

impl Cli {
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(config::default_export_dir)
    }

    pub fn active_window(&self) -> Duration {
        Duration::seconds(self.active_window_secs as i64)
    }
}

pub struct SessionInner {
    pub args: Cli,
    pub locations: LocationStore,
}

/// Application state shared by all request handlers
#[derive(Clone)]
pub struct Session {
    pub inner: Arc<RwLock<SessionInner>>,
    recording: RecordingController,
}

impl Session {
    pub fn new(args: Cli) -> Self {
        let recording = RecordingController::new(args.export_dir());
        log::info!("Exporting shapefiles to {}", recording.export_dir().display());

        Session {
            inner: Arc::new(RwLock::new(SessionInner {
                args,
                locations: LocationStore::new(),
            })),
            recording,
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn recording(&self) -> &RecordingController {
        &self.recording
    }

    /// Store `location` as the device's last known position and offer it to
    /// the track recorder.
    ///
    /// Returns true if the position was added to the device's track.
    pub fn report_location(&self, location: DeviceLocation) -> bool {
        let coordinate = Coordinate::new(location.latitude, location.longitude);
        let device_id = location.device_id.clone();
        self.write().locations.upsert(location);
        self.recording.ingest(&device_id, coordinate)
    }

    /// Devices that reported within the configured active window
    pub fn active_devices(&self, now: DateTime<Utc>) -> Vec<DeviceLocation> {
        let inner = self.read();
        inner.locations.active_within(now, inner.args.active_window())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session {{ }}")
    }
}
