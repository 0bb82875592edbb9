// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Bar charts of the per-bit flip counts.
//!
//! Every bit gets a group of three bars (`0to1`, `1to0` and their average) measured on the left
//! axis, the right axis is a fixed 0-100% scale of the total memory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, ensure};
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};
use remanence::report::{BitRecord, PRODUCT_NAME, ResultFile, TEMPERATURE, TIME};

static FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

const HEIGHT: u32 = 800;
const MIN_WIDTH: u32 = 1000;
const WIDTH_PER_BIT: u32 = 20;
const BAR_WIDTH: f64 = 0.2;

type Series = (&'static str, RGBColor, fn(&BitRecord) -> f64);

const SERIES: [Series; 3] = [
    ("0to1", RGBColor(31, 119, 180), |r| height(r.zero_to_one)),
    ("1to0", RGBColor(255, 127, 14), |r| height(r.one_to_zero)),
    ("average", RGBColor(44, 160, 44), |r| height(r.total()) / 2.0),
];

/// Name of the chart of `file`, which was read from `path`.
///
/// Files labelled with a product name and a numeric temperature and time are named
/// `temp_{temperature}_time_{time}`, all others after the stem of `path`.
#[must_use]
pub fn name(file: &ResultFile, path: &Path) -> String {
    let labelled = file.metadata.value(PRODUCT_NAME).and_then(|_| {
        let temperature = number(file, TEMPERATURE)?;
        let time = number(file, TIME)?;
        // `{:?}` always spells out the fraction, -20 becomes -20.0
        Some(format!("temp_{temperature:?}_time_{time:?}"))
    });

    labelled.unwrap_or_else(|| {
        path.file_stem()
            .map_or_else(|| "chart".to_string(), |s| s.to_string_lossy().into_owned())
    })
}

fn number(file: &ResultFile, key: &str) -> Option<f64> {
    file.metadata.value(key)?.trim().parse().ok()
}

/// Draws the chart of `file` into `dir`, named by [`name`].
///
/// # Errors
///
/// Returns an error if `dir` can not be created or the chart can not be drawn or written.
pub fn chart_file(file: &ResultFile, path: &Path, dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let output = dir.join(format!("{}.png", name(file, path)));
    draw(file, &output).with_context(|| format!("failed to draw {}", output.display()))?;

    Ok(output)
}

/// Draws the chart of `file` as a PNG image at `output`.
///
/// # Errors
///
/// Returns an error if the image can not be drawn or written.
pub fn draw(file: &ResultFile, output: &Path) -> anyhow::Result<()> {
    load_font()?;

    let bits = u32::try_from(file.bits.len()).context("too many bits")?;
    let width = bits.saturating_mul(WIDTH_PER_BIT).max(MIN_WIDTH);
    let root = BitMapBackend::new(output, (width, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let top = file
        .bits
        .iter()
        .map(|r| r.zero_to_one.max(r.one_to_zero))
        .max()
        .unwrap_or(0)
        .max(1);
    let x_range = -0.5..f64::from(bits) - 0.5;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(110)
        .right_y_label_area_size(90)
        .build_cartesian_2d(x_range.clone(), 0.0..height(top) * 1.05)?
        .set_secondary_coord(x_range, 0.0..100.0);

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(file.bits.len())
        .x_label_formatter(&|x| format!("{x:.0}"))
        .y_label_formatter(&|y| thousands(*y))
        .x_desc("Bit number in data bus")
        .y_desc("Absolute Value (bits switched)")
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    chart
        .configure_secondary_axes()
        .y_label_formatter(&|y| format!("{y:.0}%"))
        .y_desc("Percentage of Total Memory")
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    for ((label, color, value), offset) in SERIES.into_iter().zip([-BAR_WIDTH, 0.0, BAR_WIDTH]) {
        chart
            .draw_series(file.bits.iter().map(|record| {
                let x = f64::from(record.bit) + offset;
                Rectangle::new(
                    [(x - BAR_WIDTH / 2.0, 0.0), (x + BAR_WIDTH / 2.0, value(record))],
                    color.filled(),
                )
            }))?
            .label(label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 14))
        .draw()?;

    root.present()?;
    log::debug!("drew {} bits into {}", bits, output.display());

    Ok(())
}

fn load_font() -> anyhow::Result<()> {
    static LOADED: OnceLock<bool> = OnceLock::new();

    let loaded = *LOADED.get_or_init(|| register_font("sans-serif", FontStyle::Normal, FONT).is_ok());
    ensure!(loaded, "the bundled chart font is invalid");
    Ok(())
}

#[expect(
    clippy::cast_precision_loss,
    reason = "bars only need to be drawn roughly to scale"
)]
fn height(count: u64) -> f64 {
    count as f64
}

/// Formats a non-negative axis value with thousands separators, `1234567.0` as `1,234,567`.
fn thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.max(0.0));
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }

    out
}

#[cfg(test)]
mod tests {
    use remanence::Metadata;

    use super::*;

    fn labelled(product: &str, temperature: &str, time: &str) -> ResultFile {
        let mut metadata = Metadata::new();
        metadata.push(PRODUCT_NAME, [product]);
        metadata.push(TEMPERATURE, [temperature]);
        metadata.push(TIME, [time]);

        ResultFile {
            bits: Vec::new(),
            differing_bits: 0,
            compared_bits: 0,
            metadata,
        }
    }

    #[test]
    fn named_after_labels() {
        let path = Path::new("/tmp/run-7.csv");

        assert_eq!(name(&labelled("Cold Box", "-20", "5"), path), "temp_-20.0_time_5.0");
        assert_eq!(name(&labelled("Cold Box", " 4.5", "30"), path), "temp_4.5_time_30.0");
        // every label is needed
        assert_eq!(name(&labelled("", "-20", "5"), path), "run-7");
        assert_eq!(name(&labelled("Cold Box", "cold", "5"), path), "run-7");
        assert_eq!(name(&labelled("Cold Box", "-20", ""), path), "run-7");
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(thousands(0.0), "0");
        assert_eq!(thousands(999.0), "999");
        assert_eq!(thousands(1000.0), "1,000");
        assert_eq!(thousands(1_234_567.4), "1,234,567");
        assert_eq!(thousands(-3.0), "0");
    }
}
