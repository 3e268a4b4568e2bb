//! ESRI shapefile export for recorded tracks.
//!
//! A track is written as a file triple sharing one base name:
//!
//! ```text
//! ┌──────────────────────────┐
//! │ name.shp                 │  header (100 bytes) + one polyline record
//! ├──────────────────────────┤
//! │ name.shx                 │  header (100 bytes) + one index entry
//! ├──────────────────────────┤
//! │ name.dbf                 │  dBase III table, single `ID` column
//! └──────────────────────────┘
//! ```
//!
//! Shapefile headers mix byte orders: file code, lengths, record headers and
//! index entries are big endian; version, shape type, bounding boxes and
//! vertices are little endian. All lengths and offsets in `.shp`/`.shx` are
//! counted in 16-bit words.
//!
//! Only single-record files are produced, so the index entry always points at
//! word 50, directly after the `.shp` header.

pub mod dbf;
pub mod header;
pub mod polyline;

use chrono::{Local, NaiveDate};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::geo::Coordinate;

pub use header::{words, FileHeader, ShapeType, HEADER_SIZE, HEADER_WORDS};
pub use polyline::{IndexEntry, PolylineRecord, INDEX_ENTRY_SIZE};

/// The three files produced by one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub directory: PathBuf,
    pub base_name: String,
    pub shp: PathBuf,
    pub shx: PathBuf,
    pub dbf: PathBuf,
}

impl ExportArtifact {
    fn new(directory: &Path, base_name: &str) -> Self {
        ExportArtifact {
            directory: directory.to_path_buf(),
            base_name: base_name.to_string(),
            shp: directory.join(format!("{}.shp", base_name)),
            shx: directory.join(format!("{}.shx", base_name)),
            dbf: directory.join(format!("{}.dbf", base_name)),
        }
    }

    /// Name of the geometry file, e.g. `dev1.shp`
    pub fn shp_filename(&self) -> String {
        format!("{}.shp", self.base_name)
    }
}

/// Write the `.shp` contents for a single polyline record
pub fn write_shp<W: Write>(writer: &mut W, record: &PolylineRecord) -> io::Result<()> {
    let header = FileHeader {
        file_length_words: words(HEADER_SIZE + record.size())?,
        shape_type: ShapeType::Polyline,
        bbox: *record.bbox(),
    };
    header.write(writer)?;
    record.write(writer)
}

/// Write the `.shx` contents indexing the single record of [`write_shp`]
pub fn write_shx<W: Write>(writer: &mut W, record: &PolylineRecord) -> io::Result<()> {
    let header = FileHeader {
        file_length_words: words(HEADER_SIZE + INDEX_ENTRY_SIZE)?,
        shape_type: ShapeType::Polyline,
        bbox: *record.bbox(),
    };
    header.write(writer)?;

    let entry = IndexEntry {
        offset_words: HEADER_WORDS,
        content_length_words: record.content_length_words()?,
    };
    entry.write(writer)
}

/// Write the `.dbf` contents with one row per vertex of `record`
pub fn write_dbf<W: Write>(
    writer: &mut W,
    record: &PolylineRecord,
    date: NaiveDate,
) -> io::Result<()> {
    dbf::write_id_table(writer, record.points().len() as u32, date)
}

/// Export `points` as `{base_name}.shp/.shx/.dbf` in `directory`.
///
/// The directory is created if needed. Nothing is written when fewer than two
/// points are given. On I/O failure files written so far are left in place.
pub fn export(
    points: &[Coordinate],
    directory: &Path,
    base_name: &str,
) -> Result<ExportArtifact, ExportError> {
    export_with_date(points, directory, base_name, Local::now().date_naive())
}

/// Like [`export`], stamping the attribute table with `date`
pub fn export_with_date(
    points: &[Coordinate],
    directory: &Path,
    base_name: &str,
    date: NaiveDate,
) -> Result<ExportArtifact, ExportError> {
    let record = PolylineRecord::new(points)?;

    fs::create_dir_all(directory)?;
    let artifact = ExportArtifact::new(directory, base_name);

    write_file(&artifact.shp, |w| write_shp(w, &record))?;
    write_file(&artifact.shx, |w| write_shx(w, &record))?;
    write_file(&artifact.dbf, |w| write_dbf(w, &record, date))?;

    info!(
        "Exported {} points to {}",
        points.len(),
        artifact.shp.display()
    );
    Ok(artifact)
}

fn write_file<F>(path: &Path, body: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    debug!("Writing {}", path.display());
    let mut writer = BufWriter::new(File::create(path)?);
    body(&mut writer)?;
    writer.flush()
}
