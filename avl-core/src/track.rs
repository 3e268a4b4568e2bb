//! Track Recording
//!
//! Per-device path buffers filled during a recording session. A new sample is
//! only kept when it lies more than [`MIN_POINT_SPACING_M`] from the last kept
//! point of the same device, which thins out GPS jitter while standing still.

use log::debug;
use std::collections::HashMap;

use crate::geo::Coordinate;

/// Minimum distance in meters between consecutive retained points
pub const MIN_POINT_SPACING_M: f64 = 5.0;

/// Retained path of a single device (oldest first)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceTrack {
    points: Vec<Coordinate>,
}

impl DeviceTrack {
    fn new(first: Coordinate) -> Self {
        DeviceTrack {
            points: vec![first],
        }
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Append `point` if it is far enough from the last retained point
    fn offer(&mut self, point: Coordinate) -> Option<f64> {
        let distance = self.points.last()?.distance_to(&point);
        if distance > MIN_POINT_SPACING_M {
            self.points.push(point);
            Some(distance)
        } else {
            None
        }
    }
}

/// Recording session state: the active flag plus all device tracks.
///
/// Not synchronized; the owner wraps it in a lock.
#[derive(Debug, Default)]
pub struct PathRecorder {
    active: bool,
    tracks: HashMap<String, DeviceTrack>,
}

impl PathRecorder {
    /// Create an inactive recorder with no tracks
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new session, discarding all previously recorded tracks
    pub fn start(&mut self) {
        self.tracks.clear();
        self.active = true;
    }

    /// End the session. Tracks are kept for export until the next `start`.
    pub fn stop(&mut self) -> &HashMap<String, DeviceTrack> {
        self.active = false;
        &self.tracks
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Offer a sample for `device_id`.
    ///
    /// Returns true if the sample was appended to the device's track.
    pub fn ingest(&mut self, device_id: &str, coordinate: Coordinate) -> bool {
        if !self.active {
            return false;
        }

        let track = match self.tracks.get_mut(device_id) {
            Some(track) => track,
            None => {
                debug!(
                    "Recorded first point {}, {} for {}",
                    coordinate.latitude, coordinate.longitude, device_id
                );
                self.tracks
                    .insert(device_id.to_string(), DeviceTrack::new(coordinate));
                return true;
            }
        };

        match track.offer(coordinate) {
            Some(distance) => {
                debug!(
                    "Recorded point {}, {} ({:.1}m) for {}",
                    coordinate.latitude, coordinate.longitude, distance, device_id
                );
                true
            }
            None => false,
        }
    }

    /// Get the track for a device
    pub fn track(&self, device_id: &str) -> Option<&DeviceTrack> {
        self.tracks.get(device_id)
    }

    /// Get all tracks
    pub fn tracks(&self) -> &HashMap<String, DeviceTrack> {
        &self.tracks
    }

    /// Number of devices with a track
    pub fn device_count(&self) -> usize {
        self.tracks.len()
    }

    /// Total number of retained points across all tracks
    pub fn point_count(&self) -> usize {
        self.tracks.values().map(|t| t.len()).sum()
    }
}
