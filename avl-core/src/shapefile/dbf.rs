//! dBase III attribute table with a single character `ID` column.
//!
//! One row is written per exported vertex, numbered from 1.

use chrono::{Datelike, NaiveDate};
use std::io::{self, Write};

/// dBase III without memo
pub const DBF_VERSION: u8 = 0x03;

/// Fixed part of the header in bytes
pub const DBF_HEADER_BASE: usize = 32;

/// One field descriptor in bytes
pub const FIELD_DESCRIPTOR_SIZE: usize = 32;

/// Marks the end of the field descriptors
pub const HEADER_TERMINATOR: u8 = 0x0D;

/// Record prefix for a live (not deleted) row
pub const RECORD_ACTIVE: u8 = 0x20;

/// Written once after the last record
pub const END_OF_FILE: u8 = 0x1A;

/// Name of the only column
pub const ID_FIELD_NAME: &str = "ID";

/// Width of the `ID` column in characters
pub const ID_FIELD_LENGTH: u8 = 10;

/// Column definition (32 bytes on disk)
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Up to 10 ASCII characters
    pub name: &'static str,
    /// dBase type letter, `C` for character
    pub field_type: u8,
    pub length: u8,
    pub decimal_count: u8,
}

impl FieldDescriptor {
    pub fn id() -> Self {
        FieldDescriptor {
            name: ID_FIELD_NAME,
            field_type: b'C',
            length: ID_FIELD_LENGTH,
            decimal_count: 0,
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut buf = [0u8; FIELD_DESCRIPTOR_SIZE];

        // Name (11 bytes, NUL padded)
        let name = self.name.as_bytes();
        let n = name.len().min(10);
        buf[0..n].copy_from_slice(&name[..n]);
        // Type (1 byte)
        buf[11] = self.field_type;
        // Field data address (4 bytes, unused, already zeroed)
        // Length and decimal count (1 byte each)
        buf[16] = self.length;
        buf[17] = self.decimal_count;
        // Remaining 14 bytes are reserved (already zeroed)

        writer.write_all(&buf)
    }
}

/// Table header (32 bytes, followed by descriptors and a terminator)
#[derive(Debug, Clone)]
pub struct DbfHeader {
    /// Date of last update
    pub date: NaiveDate,
    pub record_count: u32,
    pub fields: Vec<FieldDescriptor>,
}

impl DbfHeader {
    /// Header length in bytes, descriptors and terminator included
    pub fn header_length(&self) -> u16 {
        (DBF_HEADER_BASE + FIELD_DESCRIPTOR_SIZE * self.fields.len() + 1) as u16
    }

    /// Record length in bytes, deletion flag included
    pub fn record_length(&self) -> u16 {
        1 + self.fields.iter().map(|f| f.length as u16).sum::<u16>()
    }

    /// Write header, field descriptors and terminator to writer
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut buf = [0u8; DBF_HEADER_BASE];

        // Version (1 byte)
        buf[0] = DBF_VERSION;
        // Last update as YY MM DD, year counted from 1900
        buf[1] = (self.date.year() - 1900).clamp(0, u8::MAX as i32) as u8;
        buf[2] = self.date.month() as u8;
        buf[3] = self.date.day() as u8;
        // Number of records (4 bytes)
        buf[4..8].copy_from_slice(&self.record_count.to_le_bytes());
        // Header length (2 bytes)
        buf[8..10].copy_from_slice(&self.header_length().to_le_bytes());
        // Record length (2 bytes)
        buf[10..12].copy_from_slice(&self.record_length().to_le_bytes());
        // Remaining 20 bytes are reserved (already zeroed)
        writer.write_all(&buf)?;

        for field in &self.fields {
            field.write(writer)?;
        }
        writer.write_all(&[HEADER_TERMINATOR])
    }
}

/// Write a complete table numbering `record_count` rows from 1
pub fn write_id_table<W: Write>(
    writer: &mut W,
    record_count: u32,
    date: NaiveDate,
) -> io::Result<()> {
    let header = DbfHeader {
        date,
        record_count,
        fields: vec![FieldDescriptor::id()],
    };
    header.write(writer)?;

    let width = ID_FIELD_LENGTH as usize;
    let mut row = Vec::with_capacity(header.record_length() as usize);
    for id in 1..=record_count {
        row.clear();
        row.push(RECORD_ACTIVE);
        let text = format!("{:<width$}", id, width = width);
        row.extend_from_slice(&text.as_bytes()[..width]);
        writer.write_all(&row)?;
    }

    writer.write_all(&[END_OF_FILE])
}
