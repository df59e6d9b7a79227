// src/report/pdf.rs
//! Letter-sized PDF layout: title page, chart page, ranked item table.

use anyhow::{anyhow, Result};
use chrono::Duration;
use image::{DynamicImage, RgbImage};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};

use super::WeeklyReport;
use crate::charts;
use crate::filter::WindowDays;

const PAGE_W: f32 = 215.9;
const PAGE_H: f32 = 279.4;
const MARGIN: f32 = 15.0;

/// Charts are scaled to 6.5in wide.
const CHART_DPI: f32 = charts::WIDTH as f32 / 6.5;
const CHART_H_MM: f32 = charts::HEIGHT as f32 / CHART_DPI * 25.4;

const ROW_H: f32 = 6.0;
const TITLE_MAX_CHARS: usize = 64;
const EMPTY_WINDOW: &str = "No items in the last 7 days.";

const OVERVIEW: &str = "This report summarizes the last 7 days of items across your sources. \
Charts show daily volume and top sources; the table lists the top 20 items by trend score.";

/// Table columns: (header, x offset from the left margin in mm).
const COLUMNS: [(&str, f32); 4] = [
    ("Time (UTC)", 0.0),
    ("Source", 36.0),
    ("Title", 62.0),
    ("Score", 172.0),
];

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Writes lines top-down on one layer.
struct Cursor {
    layer: PdfLayerReference,
    y: f32,
}

impl Cursor {
    fn top_of(layer: PdfLayerReference) -> Self {
        Self {
            layer,
            y: PAGE_H - MARGIN - 10.0,
        }
    }

    fn text_at(&self, text: &str, size: f32, x: f32, font: &IndirectFontRef) {
        self.layer
            .use_text(pdf_text(text), size, Mm(MARGIN + x), Mm(self.y), font);
    }

    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef, advance: f32) {
        self.text_at(text, size, 0.0, font);
        self.y -= advance;
    }

    fn image(&mut self, img: RgbImage) {
        self.y -= CHART_H_MM;
        Image::from_dynamic_image(&DynamicImage::ImageRgb8(img)).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN)),
                translate_y: Some(Mm(self.y)),
                dpi: Some(CHART_DPI),
                ..Default::default()
            },
        );
        self.y -= 6.0;
    }

    fn has_room(&self, needed: f32) -> bool {
        self.y - needed >= MARGIN
    }
}

fn pdf_err<E: std::fmt::Debug>(e: E) -> anyhow::Error {
    anyhow!("pdf: {e:?}")
}

fn new_page(doc: &PdfDocumentReference, name: &str) -> Cursor {
    let (page, layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), name);
    Cursor::top_of(doc.get_page(page).get_layer(layer))
}

/// Render the report; works for an empty window too (flat charts, empty-state lines).
pub fn render(report: &WeeklyReport) -> Result<Vec<u8>> {
    let title = report.title();
    let (doc, page, layer) = PdfDocument::new(pdf_text(&title), Mm(PAGE_W), Mm(PAGE_H), "title");
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?,
    };

    let mut cur = Cursor::top_of(doc.get_page(page).get_layer(layer));
    title_page(&mut cur, report, &fonts);

    let mut cur = new_page(&doc, "charts");
    chart_page(&mut cur, report, &fonts)?;

    let cur = new_page(&doc, "items");
    item_table(&doc, cur, report, &fonts);

    doc.save_to_bytes().map_err(pdf_err)
}

fn title_page(cur: &mut Cursor, report: &WeeklyReport, fonts: &Fonts) {
    cur.line(&report.title(), 22.0, &fonts.bold, 10.0);
    cur.line(
        &format!("Generated on {} (UTC)", report.generated_on.format("%Y-%m-%d")),
        11.0,
        &fonts.regular,
        14.0,
    );
    cur.line("Overview", 15.0, &fonts.bold, 8.0);
    for l in wrap(OVERVIEW, 95) {
        cur.line(&l, 10.0, &fonts.regular, 5.0);
    }
    cur.y -= 5.0;
    cur.line(
        &format!("Items in window: {}", report.kpi.n_items),
        11.0,
        &fonts.regular,
        6.0,
    );
    cur.line(
        &format!("Average trend score: {:.3}", report.kpi.avg_score),
        11.0,
        &fonts.regular,
        6.0,
    );
    cur.line(
        &format!("Days with activity: {}", report.by_day.len()),
        11.0,
        &fonts.regular,
        6.0,
    );
}

fn chart_page(cur: &mut Cursor, report: &WeeklyReport, fonts: &Fonts) -> Result<()> {
    cur.line("Daily volume", 14.0, &fonts.bold, 4.0);
    let first = report.generated_on - Duration::days(i64::from(WindowDays::WEEK.get()));
    cur.image(charts::line_chart(
        "Daily volume (7 days)",
        &report.by_day,
        first,
        report.generated_on,
    )?);
    match (report.by_day.first(), report.by_day.last()) {
        (Some(first), Some(last)) => {
            let peak = report.by_day.iter().max_by_key(|d| d.n).unwrap_or(first);
            cur.line(
                &format!(
                    "{} to {}; peak {} items on {}",
                    first.day, last.day, peak.n, peak.day
                ),
                9.0,
                &fonts.regular,
                10.0,
            );
        }
        _ => cur.line(EMPTY_WINDOW, 9.0, &fonts.regular, 10.0),
    }

    cur.line("Top sources", 14.0, &fonts.bold, 4.0);
    cur.image(charts::bar_chart("Top sources (7 days)", &report.by_source)?);
    if report.by_source.is_empty() {
        cur.line(EMPTY_WINDOW, 9.0, &fonts.regular, 4.2);
    }
    for (i, s) in report.by_source.iter().enumerate() {
        cur.line(
            &format!("{}. {} ({})", i + 1, s.source, s.n),
            9.0,
            &fonts.regular,
            4.2,
        );
    }
    Ok(())
}

fn item_table(doc: &PdfDocumentReference, mut cur: Cursor, report: &WeeklyReport, fonts: &Fonts) {
    cur.line("Top items (by trend score)", 14.0, &fonts.bold, 9.0);
    if report.top_items.is_empty() {
        cur.line(EMPTY_WINDOW, 10.0, &fonts.regular, ROW_H);
        return;
    }

    table_header(&mut cur, fonts);
    for it in &report.top_items {
        if !cur.has_room(ROW_H) {
            cur = new_page(doc, "items");
            table_header(&mut cur, fonts);
        }
        let cells = [
            it.ts.format("%Y-%m-%d %H:%M").to_string(),
            truncate(&it.source, 14),
            truncate(&it.title, TITLE_MAX_CHARS),
            format!("{:.3}", it.trend_score),
        ];
        for ((_, x), cell) in COLUMNS.iter().zip(cells.iter()) {
            cur.text_at(cell, 9.0, *x, &fonts.regular);
        }
        cur.y -= ROW_H;
    }
}

fn table_header(cur: &mut Cursor, fonts: &Fonts) {
    for (label, x) in COLUMNS {
        cur.text_at(label, 9.0, x, &fonts.bold);
    }
    cur.y -= ROW_H;
}

/// Builtin PDF fonts only cover Latin-1; map typographic punctuation to ASCII
/// and anything else outside ASCII to `?`.
pub fn pdf_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            '\t' | '\r' | '\n' => out.push(' '),
            c if c.is_ascii() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(max.saturating_sub(3)).collect();
        t.push_str("...");
        t
    }
}

/// Greedy word wrap at `width` characters.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        if !cur.is_empty() && cur.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(word);
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}
