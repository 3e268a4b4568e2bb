//! Polyline record and its index entry.

use std::io::{self, Write};

use super::header::{words, write_bbox, ShapeType};
use crate::error::ExportError;
use crate::geo::{BoundingBox, Coordinate};

/// Record header size in bytes (record number + content length)
pub const RECORD_HEADER_SIZE: usize = 8;

/// Index entry size in bytes
pub const INDEX_ENTRY_SIZE: usize = 8;

/// Single-part polyline record borrowing its vertices
#[derive(Debug, Clone)]
pub struct PolylineRecord<'a> {
    /// One-based record number
    pub record_number: i32,
    points: &'a [Coordinate],
    bbox: BoundingBox,
}

impl<'a> PolylineRecord<'a> {
    /// Build record 1 from `points`; a line needs at least two of them.
    pub fn new(points: &'a [Coordinate]) -> Result<Self, ExportError> {
        if points.len() < 2 {
            return Err(ExportError::InsufficientGeometry {
                points: points.len(),
            });
        }
        let bbox = BoundingBox::from_points(points).ok_or(ExportError::InsufficientGeometry {
            points: points.len(),
        })?;

        Ok(Self {
            record_number: 1,
            points,
            bbox,
        })
    }

    pub fn points(&self) -> &[Coordinate] {
        self.points
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn num_parts(&self) -> usize {
        1
    }

    /// Content size in bytes, record header excluded
    pub fn content_length(&self) -> usize {
        let shape_type = 4;
        let bbox = 32;
        let counts = 4 + 4; // parts, points
        let part_indices = 4 * self.num_parts();
        let vertices = 16 * self.points.len();
        shape_type + bbox + counts + part_indices + vertices
    }

    /// Content size in 16-bit words, as stored in the record and index headers
    pub fn content_length_words(&self) -> io::Result<i32> {
        words(self.content_length())
    }

    /// Record size in bytes, record header included
    pub fn size(&self) -> usize {
        RECORD_HEADER_SIZE + self.content_length()
    }

    /// Write record header and content to writer
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        // Record header (big endian)
        writer.write_all(&self.record_number.to_be_bytes())?;
        writer.write_all(&self.content_length_words()?.to_be_bytes())?;

        // Fixed part of the content (little endian)
        let mut buf = [0u8; 48];
        buf[0..4].copy_from_slice(&ShapeType::Polyline.code().to_le_bytes());
        write_bbox(&mut buf[4..36], &self.bbox);
        buf[36..40].copy_from_slice(&(self.num_parts() as i32).to_le_bytes());
        buf[40..44].copy_from_slice(&(self.points.len() as i32).to_le_bytes());
        // Single part starting at vertex 0 (already zeroed)
        writer.write_all(&buf)?;

        for point in self.points {
            writer.write_all(&point.x().to_le_bytes())?;
            writer.write_all(&point.y().to_le_bytes())?;
        }

        Ok(())
    }
}

/// `.shx` entry locating one record in the `.shp` file (8 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Offset of the record header from the start of the `.shp` file, in words
    pub offset_words: i32,
    /// Record content length in words
    pub content_length_words: i32,
}

impl IndexEntry {
    /// Write index entry to writer (big endian)
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.offset_words.to_be_bytes())?;
        writer.write_all(&self.content_length_words.to_be_bytes())
    }
}
