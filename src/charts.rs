//! Raster charts for the dashboard and the weekly PDF, drawn with plotters
//! into an RGB buffer.
//!
//! The daily chart sits on a calendar axis: every day in the span gets a
//! slot, and days without items are plotted at zero. The source chart is a
//! histogram over a category axis labelled with the source names.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use image::RgbImage;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::model::{DayCount, SourceCount};

pub const WIDTH: u32 = 1050;
pub const HEIGHT: u32 = 480;

const FONT: &str = "sans-serif";
const SERIES: RGBColor = RGBColor(31, 119, 180);
const SOURCE_LABEL_CHARS: usize = 14;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Draw on a white `WIDTH x HEIGHT` canvas and hand back the pixels.
fn render<F>(draw: F) -> Result<RgbImage>
where
    F: FnOnce(&Area<'_>) -> Result<()>,
{
    let mut buf = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
    }
    RgbImage::from_raw(WIDTH, HEIGHT, buf).context("chart buffer has the wrong size")
}

/// Daily item counts over `first..=last`, widened to cover every day in
/// `days`. Missing days count as zero.
pub fn line_chart(
    caption: &str,
    days: &[DayCount],
    first: NaiveDate,
    last: NaiveDate,
) -> Result<RgbImage> {
    let first = days.iter().map(|d| d.day).fold(first, NaiveDate::min);
    let last = days.iter().map(|d| d.day).fold(last.max(first), NaiveDate::max);

    let counts: BTreeMap<NaiveDate, i64> = days.iter().map(|d| (d.day, d.n.max(0))).collect();
    let series: Vec<(NaiveDate, i64)> = first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|d| (d, counts.get(&d).copied().unwrap_or(0)))
        .collect();
    let y_max = series.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1) + 1;
    let n_days = series.len();

    render(|root| {
        let mut chart = ChartBuilder::on(root)
            .caption(caption, (FONT, 24))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(55)
            .build_cartesian_2d(
                (first - Duration::days(1))..(last + Duration::days(1)),
                0i64..y_max,
            )?;

        chart
            .configure_mesh()
            .x_desc("Day (UTC)")
            .y_desc("# Items")
            .x_labels(n_days.clamp(2, 12))
            .y_labels(6)
            .x_label_formatter(&|d| d.format("%b %d").to_string())
            .draw()?;

        chart.draw_series(LineSeries::new(series.iter().copied(), SERIES.stroke_width(3)))?;
        chart.draw_series(
            series
                .iter()
                .filter(|(_, n)| *n > 0)
                .map(|&(d, n)| Circle::new((d, n), 4, SERIES.filled())),
        )?;
        Ok(())
    })
}

/// One bar per source, in the given order.
pub fn bar_chart(caption: &str, sources: &[SourceCount]) -> Result<RgbImage> {
    let names: Vec<String> = sources.iter().map(|s| short_label(&s.source)).collect();
    let slots = sources.len().max(1) as i32;
    let y_max = sources.iter().map(|s| s.n).max().unwrap_or(0).max(1) + 1;

    render(|root| {
        let mut chart = ChartBuilder::on(root)
            .caption(caption, (FONT, 24))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(55)
            .build_cartesian_2d((0..slots).into_segmented(), 0i64..y_max)?;

        let label = |v: &SegmentValue<i32>| match v {
            SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => {
                names.get(*i as usize).cloned().unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("Source")
            .y_desc("# Items")
            .x_labels(names.len().max(1))
            .y_labels(6)
            .x_label_formatter(&label)
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(SERIES.filled())
                .margin(12)
                .data(sources.iter().enumerate().map(|(i, s)| (i as i32, s.n.max(0)))),
        )?;
        Ok(())
    })
}

fn short_label(source: &str) -> String {
    if source.chars().count() <= SOURCE_LABEL_CHARS {
        source.to_string()
    } else {
        let mut s: String = source.chars().take(SOURCE_LABEL_CHARS - 1).collect();
        s.push('~');
        s
    }
}

/// Encode as an 8-bit RGB PNG.
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, img.width(), img.height());
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        encoder
            .write_header()
            .context("png header")?
            .write_image_data(img.as_raw())
            .context("png data")?;
    }
    Ok(buffer)
}
