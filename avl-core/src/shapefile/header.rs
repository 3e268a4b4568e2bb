//! Main file header shared by `.shp` and `.shx` files.

use std::io::{self, Write};

use crate::geo::BoundingBox;

/// Magic file code at offset 0 (big endian)
pub const FILE_CODE: i32 = 9994;

/// Format version at offset 28 (little endian)
pub const VERSION: i32 = 1000;

/// Header size in bytes (fixed)
pub const HEADER_SIZE: usize = 100;

/// Header size in 16-bit words
pub const HEADER_WORDS: i32 = (HEADER_SIZE / 2) as i32;

/// Convert a byte length to the 16-bit word count stored in the files.
///
/// Fails with `InvalidInput` when the count does not fit the signed 32-bit
/// length fields.
pub fn words(bytes: usize) -> io::Result<i32> {
    i32::try_from(bytes / 2).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} bytes exceed the shapefile length limit", bytes),
        )
    })
}

/// Shape type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ShapeType {
    Polyline = 3,
}

impl ShapeType {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// File header (100 bytes fixed size)
#[derive(Debug, Clone)]
pub struct FileHeader {
    /// Total file length in 16-bit words, header included
    pub file_length_words: i32,
    pub shape_type: ShapeType,
    /// X/Y extent of every shape in the file. Z and M ranges are written as zero.
    pub bbox: BoundingBox,
}

impl FileHeader {
    /// Write header to writer
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut buf = [0u8; HEADER_SIZE];

        // File code (4 bytes, big endian)
        buf[0..4].copy_from_slice(&FILE_CODE.to_be_bytes());
        // 5 unused words (20 bytes, already zeroed)
        // File length in words (4 bytes, big endian)
        buf[24..28].copy_from_slice(&self.file_length_words.to_be_bytes());
        // Version (4 bytes, little endian)
        buf[28..32].copy_from_slice(&VERSION.to_le_bytes());
        // Shape type (4 bytes, little endian)
        buf[32..36].copy_from_slice(&self.shape_type.code().to_le_bytes());
        // Bounding box Xmin, Ymin, Xmax, Ymax (32 bytes, little endian)
        write_bbox(&mut buf[36..68], &self.bbox);
        // Zmin, Zmax, Mmin, Mmax (32 bytes, already zeroed)

        writer.write_all(&buf)
    }
}

/// Fill a 32-byte slice with Xmin, Ymin, Xmax, Ymax as little endian doubles
pub(crate) fn write_bbox(buf: &mut [u8], bbox: &BoundingBox) {
    buf[0..8].copy_from_slice(&bbox.min_x.to_le_bytes());
    buf[8..16].copy_from_slice(&bbox.min_y.to_le_bytes());
    buf[16..24].copy_from_slice(&bbox.max_x.to_le_bytes());
    buf[24..32].copy_from_slice(&bbox.max_y.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn be_i32(buf: &[u8], at: usize) -> i32 {
        i32::from_be_bytes(buf[at..at + 4].try_into().unwrap())
    }

    fn le_i32(buf: &[u8], at: usize) -> i32 {
        i32::from_le_bytes(buf[at..at + 4].try_into().unwrap())
    }

    fn le_f64(buf: &[u8], at: usize) -> f64 {
        f64::from_le_bytes(buf[at..at + 8].try_into().unwrap())
    }

    #[test]
    fn test_words_limit() {
        assert_eq!(words(HEADER_SIZE).unwrap(), HEADER_WORDS);
        assert_eq!(words(i32::MAX as usize * 2 + 1).unwrap(), i32::MAX);

        let err = words(i32::MAX as usize * 2 + 2).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(words(usize::MAX).is_err());
    }

    #[test]
    fn test_header_layout() {
        let header = FileHeader {
            file_length_words: 140,
            shape_type: ShapeType::Polyline,
            bbox: BoundingBox {
                min_x: 51.40,
                min_y: 35.70,
                max_x: 51.41,
                max_y: 35.71,
            },
        };

        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);

        assert_eq!(&buf[0..4], &[0x00, 0x00, 0x27, 0x0A]);
        assert!(buf[4..24].iter().all(|&b| b == 0));
        assert_eq!(be_i32(&buf, 24), 140);
        assert_eq!(&buf[28..32], &[0xE8, 0x03, 0x00, 0x00]);
        assert_eq!(le_i32(&buf, 32), 3);
        assert_eq!(le_f64(&buf, 36), 51.40);
        assert_eq!(le_f64(&buf, 44), 35.70);
        assert_eq!(le_f64(&buf, 52), 51.41);
        assert_eq!(le_f64(&buf, 60), 35.71);
        assert!(buf[68..100].iter().all(|&b| b == 0));
    }
}
