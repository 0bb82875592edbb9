// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The CSV result file.
//!
//! ```text
//! Bit, 0to1, 1to0
//! 0,12,40
//! ...
//! 63,9,38
//!
//! Different bits, Total compared bits
//! 1234,549755813888
//! ProductName,20HRCTO1WW
//! Manufacturer,LENOVO
//! Date,2025-03-14 09:26:53
//! Temperature,
//! Time,
//! DIMM,DIMM 0,BANK 0,Samsung,M378A1K43CB2-CTD,0x1234ABCD,8192,2400
//! ```
//!
//! `Temperature` and `Time` are left empty, the operator fills them in after the measurement.
//! The file is meant to be edited in a spreadsheet, so the parser tolerates the `'` prefix
//! spreadsheets put in front of large numbers, surrounding whitespace and extra columns.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::{self, Write};

use crate::{Error, Operation, ResultSink};

pub const BITS_HEADER: [&str; 3] = ["Bit", "0to1", "1to0"];
pub const SUMMARY_HEADER: [&str; 2] = ["Different bits", "Total compared bits"];

pub const PRODUCT_NAME: &str = "ProductName";
pub const MANUFACTURER: &str = "Manufacturer";
pub const DATE: &str = "Date";
pub const TEMPERATURE: &str = "Temperature";
pub const TIME: &str = "Time";
pub const DIMM: &str = "DIMM";

/// A `key,value...` row at the end of the result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRow {
    pub key: String,
    pub values: Vec<String>,
}

/// Free-form information about the machine and the conditions of a measurement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    rows: Vec<MetadataRow>,
}

impl Metadata {
    #[must_use]
    pub const fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn push<V>(&mut self, key: &str, values: impl IntoIterator<Item = V>)
    where
        V: Into<String>,
    {
        self.rows.push(MetadataRow {
            key: key.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        });
    }

    /// Returns the first row with the given key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MetadataRow> {
        self.rows.iter().find(|row| row.key == key)
    }

    /// Returns the first non-empty value of the first row with the given key.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key)?
            .values
            .first()
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Returns all rows with the given key.
    pub fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a MetadataRow> + 'a {
        self.rows.iter().filter(move |row| row.key == key)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, MetadataRow> {
        self.rows.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// [`ResultSink`] producing the CSV result file into any [`fmt::Write`].
#[derive(Debug)]
pub struct CsvWriter<W> {
    out: W,
    records: u32,
}

impl<W: Write> CsvWriter<W> {
    pub const fn new(out: W) -> Self {
        Self { out, records: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_row<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) -> fmt::Result {
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                self.out.write_char(',')?;
            }
            write_field(&mut self.out, field)?;
        }
        self.out.write_char('\n')
    }
}

fn write_field(out: &mut impl Write, field: &str) -> fmt::Result {
    if !field.contains([',', '"', '\n', '\r']) {
        return out.write_str(field);
    }

    out.write_char('"')?;
    for c in field.chars() {
        if c == '"' {
            out.write_char('"')?;
        }
        out.write_char(c)?;
    }
    out.write_char('"')
}

fn write_failed(_: fmt::Error) -> Error {
    Error::platform(Operation::WriteResults, "formatting the result file failed")
}

impl<W: Write> ResultSink for CsvWriter<W> {
    fn append_record(
        &mut self,
        bit: u32,
        zero_to_one: u64,
        one_to_zero: u64,
    ) -> crate::Result<()> {
        if self.records == 0 {
            writeln!(self.out, "{}", BITS_HEADER.join(", ")).map_err(write_failed)?;
        }
        self.records += 1;

        writeln!(self.out, "{bit},{zero_to_one},{one_to_zero}").map_err(write_failed)
    }

    fn finalize(
        &mut self,
        differing_bits: u64,
        compared_bits: u64,
        metadata: &Metadata,
    ) -> crate::Result<()> {
        writeln!(self.out).map_err(write_failed)?;
        writeln!(self.out, "{}", SUMMARY_HEADER.join(", ")).map_err(write_failed)?;
        writeln!(self.out, "{differing_bits},{compared_bits}").map_err(write_failed)?;

        for row in metadata.iter() {
            self.write_row(
                core::iter::once(row.key.as_str()).chain(row.values.iter().map(String::as_str)),
            )
            .map_err(write_failed)?;
        }

        Ok(())
    }
}

/// One per-bit row of a result file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitRecord {
    pub bit: u32,
    pub zero_to_one: u64,
    pub one_to_zero: u64,
}

impl BitRecord {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.zero_to_one + self.one_to_zero
    }

    /// Mean of both directions, formatted with one decimal.
    #[must_use]
    pub fn average(&self) -> Average {
        Average(self.total())
    }
}

/// See [`BitRecord::average`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Average(u64);

impl fmt::Display for Average {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 2, (self.0 % 2) * 5)
    }
}

/// A parsed result file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultFile {
    pub bits: Vec<BitRecord>,
    pub differing_bits: u64,
    pub compared_bits: u64,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The `Bit, 0to1, 1to0` header was not found.
    MissingBitsHeader,
    /// The `Different bits, Total compared bits` header or the row following it is missing.
    MissingSummary,
    /// A field that must hold a number does not.
    InvalidNumber,
    /// Bit rows are not numbered 0, 1, 2... or exceed the word size.
    UnexpectedBit(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line number.
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: ", self.line)?;
        match self.kind {
            ParseErrorKind::MissingBitsHeader => {
                write!(f, "missing `{}` header", BITS_HEADER.join(", "))
            }
            ParseErrorKind::MissingSummary => {
                write!(f, "missing `{}` summary", SUMMARY_HEADER.join(", "))
            }
            ParseErrorKind::InvalidNumber => write!(f, "expected a number"),
            ParseErrorKind::UnexpectedBit(bit) => write!(f, "unexpected bit {bit}"),
        }
    }
}

impl core::error::Error for ParseError {}

/// Splits a CSV line into trimmed fields, honoring double quotes.
#[must_use]
pub fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(core::mem::take(&mut field).trim().to_string()),
            c => field.push(c),
        }
    }
    fields.push(field.trim().to_string());

    fields
}

/// Parses a number, ignoring the `'` spreadsheets prefix large numbers with.
fn number<T: core::str::FromStr>(field: Option<&String>, line: usize) -> Result<T, ParseError> {
    field
        .map(|f| f.trim_start_matches('\''))
        .and_then(|f| f.parse().ok())
        .ok_or(ParseError {
            line,
            kind: ParseErrorKind::InvalidNumber,
        })
}

fn is_header(fields: &[String], header: &[&str]) -> bool {
    fields.len() >= header.len() && fields.iter().zip(header).all(|(a, b)| a == b)
}

impl ResultFile {
    /// # Errors
    ///
    /// Returns an error if the file lacks one of the two tables or holds malformed numbers.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut lines = input
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, split_record(line)));
        let mut file = ResultFile::default();

        lines
            .by_ref()
            .find(|(_, fields)| is_header(fields, &BITS_HEADER))
            .ok_or(ParseError {
                line: 1,
                kind: ParseErrorKind::MissingBitsHeader,
            })?;

        let mut last_line = 1;
        for (line, fields) in lines.by_ref() {
            last_line = line;
            if fields.iter().all(String::is_empty) {
                break;
            }

            let record = BitRecord {
                bit: number(fields.first(), line)?,
                zero_to_one: number(fields.get(1), line)?,
                one_to_zero: number(fields.get(2), line)?,
            };
            let expected = u32::try_from(file.bits.len()).unwrap_or(u32::MAX);
            if record.bit != expected || record.bit >= u64::BITS {
                return Err(ParseError {
                    line,
                    kind: ParseErrorKind::UnexpectedBit(record.bit),
                });
            }
            file.bits.push(record);
        }

        let missing_summary = |line| ParseError {
            line,
            kind: ParseErrorKind::MissingSummary,
        };
        lines
            .by_ref()
            .find(|(_, fields)| is_header(fields, &SUMMARY_HEADER))
            .ok_or(missing_summary(last_line))?;
        let (line, fields) = lines.next().ok_or(missing_summary(last_line))?;
        file.differing_bits = number(fields.first(), line)?;
        file.compared_bits = number(fields.get(1), line)?;

        for (_, mut fields) in lines {
            if fields.iter().all(String::is_empty) {
                continue;
            }
            let key = fields.remove(0);
            file.metadata.rows.push(MetadataRow {
                key,
                values: fields,
            });
        }

        Ok(file)
    }
}
