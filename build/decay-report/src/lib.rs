// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Summaries of the result files written by the decay tester.

pub mod chart;

use std::fmt::{self, Write};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, bail};
use remanence::report::{
    BITS_HEADER, BitRecord, DIMM, PRODUCT_NAME, ResultFile, TEMPERATURE, TIME, split_record,
};

/// Header of the column added by [`augment`].
pub const AVERAGE_HEADER: &str = "average";

/// Reads and parses a result file.
///
/// # Errors
///
/// Returns an error if the file can not be read or is not a valid result file.
pub fn load(path: &Path) -> anyhow::Result<ResultFile> {
    let input = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    ResultFile::parse(&input).with_context(|| format!("failed to parse {}", path.display()))
}

/// Ratio of two bit counts, displayed as a percentage with four decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Share {
    part: u64,
    whole: u64,
}

impl Share {
    #[must_use]
    pub const fn new(part: u64, whole: u64) -> Self {
        Self { part, whole }
    }
}

impl fmt::Display for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.whole == 0 {
            return f.pad("-");
        }

        let ppm = u128::from(self.part) * 1_000_000 / u128::from(self.whole);
        f.pad(&format!("{}.{:04}%", ppm / 10_000, ppm % 10_000))
    }
}

/// Writes the per-bit table, the summary, the labels and the memory modules of a result file.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn render(file: &ResultFile, out: &mut impl Write) -> fmt::Result {
    writeln!(
        out,
        "{:>3} {:>16} {:>16} {:>17} {:>9}",
        BITS_HEADER[0], BITS_HEADER[1], BITS_HEADER[2], AVERAGE_HEADER, "share"
    )?;
    for record in &file.bits {
        writeln!(
            out,
            "{:>3} {:>16} {:>16} {:>17} {:>9}",
            record.bit,
            record.zero_to_one,
            record.one_to_zero,
            record.average().to_string(),
            Share::new(record.total(), file.compared_bits)
        )?;
    }

    writeln!(
        out,
        "{}/{} different bits ({})",
        file.differing_bits,
        file.compared_bits,
        Share::new(file.differing_bits, file.compared_bits)
    )?;

    for key in [PRODUCT_NAME, TEMPERATURE, TIME] {
        writeln!(out, "{key}: {}", file.metadata.value(key).unwrap_or("-"))?;
    }
    for row in file.metadata.all(DIMM) {
        writeln!(out, "{DIMM}: {}", row.values.join(", "))?;
    }

    Ok(())
}

/// Adds an `average` column to the per-bit table of a result file.
///
/// Everything outside the table, and rows of the table that do not hold counts, are copied
/// unchanged.
#[must_use]
pub fn augment(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 4);
    let mut in_table = false;

    for line in input.lines() {
        let fields = split_record(line);
        out.push_str(line);

        if in_table {
            if fields.iter().all(String::is_empty) {
                in_table = false;
            } else if let Some(record) = parse_record(&fields) {
                out.push(',');
                out.push_str(&record.average().to_string());
            }
        } else if fields.len() >= BITS_HEADER.len()
            && fields.iter().zip(BITS_HEADER).all(|(a, b)| a == b)
        {
            in_table = true;
            out.push(',');
            out.push_str(AVERAGE_HEADER);
        }

        out.push('\n');
    }

    out
}

fn parse_record(fields: &[String]) -> Option<BitRecord> {
    Some(BitRecord {
        bit: number(fields, 0)?,
        zero_to_one: number(fields, 1)?,
        one_to_zero: number(fields, 2)?,
    })
}

fn number<T: FromStr>(fields: &[String], i: usize) -> Option<T> {
    fields.get(i)?.trim_start_matches('\'').parse().ok()
}

/// Writes an [`augment`]ed copy of the result file at `path` into `dir`, keeping its file name.
///
/// # Errors
///
/// Returns an error if the file can not be read, the copy can not be written or would replace
/// the file itself.
pub fn augment_file(path: &Path, dir: &Path) -> anyhow::Result<PathBuf> {
    let Some(name) = path.file_name() else {
        bail!("{} does not name a file", path.display());
    };
    let output = dir.join(name);
    if output == path {
        bail!("refusing to overwrite {}", path.display());
    }

    let input = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    fs::write(&output, augment(&input))
        .with_context(|| format!("failed to write {}", output.display()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share() {
        assert_eq!(Share::new(1, 3).to_string(), "33.3333%");
        assert_eq!(Share::new(0, 64).to_string(), "0.0000%");
        assert_eq!(Share::new(u64::MAX, u64::MAX).to_string(), "100.0000%");
        assert_eq!(Share::new(5, 0).to_string(), "-");
        assert_eq!(format!("{:>9}", Share::new(1, 2)), " 50.0000%");
    }

    #[test]
    fn augment_only_touches_the_bit_table() {
        let input = "Bit, 0to1, 1to0\n0,'12,40\n1,3,0\n\nDifferent bits, Total compared bits\n55,1024\nDIMM,1,2,3\n";

        assert_eq!(
            augment(input),
            "Bit, 0to1, 1to0,average\n0,'12,40,26.0\n1,3,0,1.5\n\nDifferent bits, Total compared bits\n55,1024\nDIMM,1,2,3\n"
        );
    }

    #[test]
    fn augment_without_table() {
        assert_eq!(augment("ProductName,x"), "ProductName,x\n");
    }
}
