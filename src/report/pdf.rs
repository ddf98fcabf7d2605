//! A small flowable layout engine on top of `printpdf`.
//!
//! Content is first turned into a list of [`Flowable`]s, laid out onto A4
//! pages by [`layout`] (pure, no PDF types involved), then drawn.

use std::io::{BufWriter, Cursor};

use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{BuiltinFont, Image, ImageTransform, Mm, PdfDocument};

use crate::charts::ChartImage;
use crate::error::{Error, Result};
use crate::report::ReportHeader;

const PAGE_WIDTH: f64 = 210.0;
const PAGE_HEIGHT: f64 = 297.0;
const MARGIN: f64 = 20.0;
const CONTENT_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN;
const PT_TO_MM: f64 = 0.3528;

const TITLE_SIZE: f64 = 20.0;
const HEADING_SIZE: f64 = 14.0;
const BODY_SIZE: f64 = 10.5;

#[derive(Debug, Clone, PartialEq)]
pub enum Flowable {
    Title(String),
    Heading(String),
    Bold(String),
    Paragraph(String),
    /// Vertical gap in millimetres.
    Spacer(f64),
    PageBreak,
    Image {
        png: Vec<u8>,
        width_px: u32,
        height_px: u32,
    },
}

impl Flowable {
    /// An image flowable, or `None` if `png` is not a PNG.
    pub fn png(png: Vec<u8>) -> Option<Self> {
        let (width_px, height_px) = png_dimensions(&png)?;
        Some(Flowable::Image {
            png,
            width_px,
            height_px,
        })
    }
}

/// Width and height from the IHDR chunk.
fn png_dimensions(png: &[u8]) -> Option<(u32, u32)> {
    const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    if png.len() < 24 || png[..8] != SIGNATURE || &png[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(png[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(png[20..24].try_into().ok()?);
    (width > 0 && height > 0).then_some((width, height))
}

/// Turn narrative Markdown into flowables, line by line: `#` lines become
/// headings, lines wrapped entirely in `**` become bold, everything else a
/// paragraph with emphasis markers removed. Blank lines are dropped.
pub fn narrative_flowables(narrative: &str) -> Vec<Flowable> {
    let mut out = Vec::new();
    for line in narrative.lines() {
        let line = line.trim();
        if line.is_empty() || line == "---" {
            continue;
        }
        let block = if line.starts_with('#') {
            Flowable::Heading(line.trim_start_matches('#').trim().to_string())
        } else if line.len() > 4 && line.starts_with("**") && line.ends_with("**") {
            Flowable::Bold(line.trim_matches('*').trim().to_string())
        } else {
            let text = line.replace("**", "");
            let text = match text.strip_prefix("* ") {
                Some(rest) => format!("- {rest}"),
                None => text,
            };
            Flowable::Paragraph(text)
        };
        out.push(block);
        out.push(Flowable::Spacer(2.0));
    }
    out
}

/// Title page block, narrative, then one chart per page.
pub fn document_flowables(header: &ReportHeader<'_>, narrative: &str, images: &[ChartImage]) -> Vec<Flowable> {
    let mut out = vec![
        Flowable::Title("Client Analytics Report".into()),
        Flowable::Spacer(6.0),
        Flowable::Paragraph(format!("Client: {}", header.client_name)),
        Flowable::Paragraph(format!("Generated on: {}", header.generated_on())),
        Flowable::Paragraph(format!("Generated by: {}", header.generated_by)),
        Flowable::Spacer(10.0),
    ];
    out.extend(narrative_flowables(narrative));

    let mut sorted: Vec<&ChartImage> = images.iter().collect();
    sorted.sort_by_key(|image| image.slot);
    let mut first = true;
    for image in sorted {
        let Some(flowable) = Flowable::png(image.png.clone()) else {
            log::warn!("Skipping {} in PDF: not a PNG image", image.slot.binding());
            continue;
        };
        out.push(Flowable::PageBreak);
        if first {
            out.push(Flowable::Title("Visual Analytics".into()));
            out.push(Flowable::Spacer(6.0));
            first = false;
        }
        out.push(Flowable::Heading(image.title.clone()));
        out.push(Flowable::Spacer(4.0));
        out.push(flowable);
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub enum Placed {
    Text {
        text: String,
        size: f64,
        bold: bool,
        x: f64,
        y: f64,
    },
    Image {
        png: Vec<u8>,
        x: f64,
        y: f64,
        dpi: f64,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub items: Vec<Placed>,
}

struct Layouter {
    pages: Vec<PageLayout>,
    /// Distance from the page bottom to the next free line, in mm.
    y: f64,
}

impl Layouter {
    fn new() -> Self {
        Self {
            pages: vec![PageLayout::default()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn current_is_empty(&self) -> bool {
        self.pages.last().map_or(true, |p| p.items.is_empty())
    }

    fn new_page(&mut self) {
        self.pages.push(PageLayout::default());
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn reserve(&mut self, height: f64) {
        if self.y - height < MARGIN && !self.current_is_empty() {
            self.new_page();
        }
    }

    fn place(&mut self, item: Placed) {
        if let Some(page) = self.pages.last_mut() {
            page.items.push(item);
        }
    }

    fn text(&mut self, text: &str, size: f64, bold: bool) {
        let line_height = size * PT_TO_MM * 1.4;
        let char_width = size * PT_TO_MM * if bold { 0.56 } else { 0.5 };
        let max_chars = ((CONTENT_WIDTH / char_width) as usize).max(10);
        for line in wrap_text(&latin1(text), max_chars) {
            self.reserve(line_height);
            self.y -= line_height;
            let y = self.y;
            self.place(Placed::Text {
                text: line,
                size,
                bold,
                x: MARGIN,
                y,
            });
        }
    }

    fn image(&mut self, png: &[u8], width_px: u32, height_px: u32) {
        let aspect = height_px as f64 / width_px as f64;
        let mut width = CONTENT_WIDTH;
        let mut height = width * aspect;
        let max_height = PAGE_HEIGHT - 2.0 * MARGIN;
        if height > max_height {
            height = max_height;
            width = height / aspect;
        }
        self.reserve(height);
        self.y -= height;
        let y = self.y;
        self.place(Placed::Image {
            png: png.to_vec(),
            x: MARGIN,
            y,
            dpi: width_px as f64 / (width / 25.4),
        });
    }
}

/// Position flowables on A4 pages.
pub fn layout(flowables: &[Flowable]) -> Vec<PageLayout> {
    let mut l = Layouter::new();
    for flowable in flowables {
        match flowable {
            Flowable::Title(text) => {
                l.text(text, TITLE_SIZE, true);
                l.y -= 4.0;
            }
            Flowable::Heading(text) => {
                l.y -= 3.0;
                l.text(text, HEADING_SIZE, true);
            }
            Flowable::Bold(text) => l.text(text, BODY_SIZE, true),
            Flowable::Paragraph(text) => l.text(text, BODY_SIZE, false),
            Flowable::Spacer(mm) => {
                l.y = (l.y - mm).max(MARGIN);
            }
            Flowable::PageBreak => {
                if !l.current_is_empty() {
                    l.new_page();
                }
            }
            Flowable::Image {
                png,
                width_px,
                height_px,
            } => l.image(png, *width_px, *height_px),
        }
    }
    l.pages
}

/// Greedy word wrap at `max_chars`; words longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split: String = word.chars().take(max_chars).collect();
            word = word.chars().skip(max_chars).collect();
            lines.push(split);
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Map text onto what the built-in Helvetica can show. Common typographic
/// characters get ASCII stand-ins; anything else outside Latin-1 is dropped.
fn latin1(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2022}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{20B9}' => out.push_str("INR "),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c if ('\u{A0}'..='\u{FF}').contains(&c) => out.push(c),
            _ => {}
        }
    }
    out
}

fn pdf_error(e: impl std::fmt::Debug) -> Error {
    Error::Render(format!("PDF: {e:?}"))
}

/// Lay out and draw `flowables` into a PDF document.
pub fn render(title: &str, flowables: &[Flowable]) -> Result<Vec<u8>> {
    let pages = layout(flowables);

    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;

    for (i, page) in pages.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (p, l) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            doc.get_page(p).get_layer(l)
        };

        for item in &page.items {
            match item {
                Placed::Text {
                    text,
                    size,
                    bold: is_bold,
                    x,
                    y,
                } => {
                    let font = if *is_bold { &bold } else { &regular };
                    layer.use_text(text.as_str(), *size, Mm(*x), Mm(*y), font);
                }
                Placed::Image { png, x, y, dpi } => {
                    let decoder = PngDecoder::new(Cursor::new(png.as_slice()))
                        .map_err(|e| Error::Render(format!("chart image: {e}")))?;
                    let image = Image::try_from(decoder)
                        .map_err(|e| Error::Render(format!("chart image: {e}")))?;
                    image.add_to_layer(
                        layer.clone(),
                        ImageTransform {
                            translate_x: Some(Mm(*x)),
                            translate_y: Some(Mm(*y)),
                            dpi: Some(*dpi),
                            ..Default::default()
                        },
                    );
                }
            }
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf).map_err(pdf_error)?;
    buf.into_inner().map_err(|e| Error::Render(format!("PDF: {e}")))
}

/// Render the full report document.
pub fn render_report(header: &ReportHeader<'_>, narrative: &str, images: &[ChartImage]) -> Result<Vec<u8>> {
    let title = format!("Client Analytics Report - {}", header.client_name);
    render(&title, &document_flowables(header, narrative, images))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::ChartSlot;
    use chrono::NaiveDate;
    use printpdf::image_crate::codecs::png::PngEncoder;
    use printpdf::image_crate::{ColorType, ImageEncoder};

    fn header() -> ReportHeader<'static> {
        ReportHeader {
            client_name: "Acme Corp",
            generated_at: NaiveDate::from_ymd_opt(2026, 10, 16)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            generated_by: "alice",
        }
    }

    fn tiny_png(width: u32, height: u32) -> Vec<u8> {
        let pixels = vec![200u8; (width * height * 3) as usize];
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(&pixels, width, height, ColorType::Rgb8)
            .unwrap();
        out
    }

    fn chart(slot: ChartSlot) -> ChartImage {
        ChartImage {
            slot,
            title: slot.title().to_string(),
            png: tiny_png(8, 5),
        }
    }

    #[test]
    fn test_narrative_line_classification() {
        let flowables = narrative_flowables(
            "## Client Overview\n\n**Client Name: Acme**\nIt has **50 seats**.\n* Electrical\n---\n",
        );
        let blocks: Vec<&Flowable> = flowables
            .iter()
            .filter(|f| !matches!(f, Flowable::Spacer(_)))
            .collect();
        assert_eq!(
            blocks,
            vec![
                &Flowable::Heading("Client Overview".into()),
                &Flowable::Bold("Client Name: Acme".into()),
                &Flowable::Paragraph("It has 50 seats.".into()),
                &Flowable::Paragraph("- Electrical".into()),
            ]
        );
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn test_latin1_substitutions() {
        assert_eq!(latin1("Price \u{2014} \u{20B9}500 caf\u{e9} \u{1F4CD}"), "Price - INR 500 caf\u{e9} ");
    }

    #[test]
    fn test_png_dimensions() {
        assert_eq!(png_dimensions(&tiny_png(8, 5)), Some((8, 5)));
        assert_eq!(png_dimensions(b"GIF89a not a png at all...."), None);
    }

    #[test]
    fn test_long_narrative_paginates() {
        let narrative = (0..200)
            .map(|i| format!("Paragraph {i} with some words in it."))
            .collect::<Vec<_>>()
            .join("\n");
        let pages = layout(&narrative_flowables(&narrative));
        assert!(pages.len() > 1);
        for page in &pages {
            for item in &page.items {
                if let Placed::Text { y, .. } = item {
                    assert!(*y >= MARGIN && *y <= PAGE_HEIGHT - MARGIN);
                }
            }
        }
    }

    #[test]
    fn test_each_chart_starts_a_page() {
        let flowables = document_flowables(
            &header(),
            "## Overview\nShort.",
            &[chart(ChartSlot::Fig3), chart(ChartSlot::Fig1)],
        );
        let pages = layout(&flowables);
        assert_eq!(pages.len(), 3);
        for page in &pages[1..] {
            let images = page
                .items
                .iter()
                .filter(|i| matches!(i, Placed::Image { .. }))
                .count();
            assert_eq!(images, 1);
        }
    }

    #[test]
    fn test_render_report_produces_pdf() {
        let bytes = render_report(&header(), "## Overview\n**Acme**\nAll good.", &[chart(ChartSlot::Fig1)]).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_without_charts() {
        let bytes = render_report(&header(), "Only text.", &[]).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_non_png_chart_is_skipped() {
        let bad = ChartImage {
            slot: ChartSlot::Fig2,
            title: "x".into(),
            png: b"not a png".to_vec(),
        };
        let flowables = document_flowables(&header(), "text", &[bad]);
        assert!(!flowables.iter().any(|f| matches!(f, Flowable::Image { .. } | Flowable::PageBreak)));
    }
}
