//! A4 PDF rendering of a [`ReportLayout`] with the built-in Helvetica fonts.
//!
//! Page order: cover, table of contents, introduction, one page (or more)
//! per chapter, then a "Sources" appendix listing the fetched articles.

use std::io::BufWriter;

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use crate::error::ReportError;
use crate::news::Article;

use super::layout::{Block, ReportLayout};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 25.0;
const TEXT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

/// Points to millimetres.
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

#[derive(Clone, Copy)]
enum Face {
    Regular,
    Bold,
    Oblique,
    BoldOblique,
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    oblique: IndirectFontRef,
    bold_oblique: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> Result<Self, ReportError> {
        let load = |font| {
            doc.add_builtin_font(font)
                .map_err(|e| ReportError::Render(format!("font: {e}")))
        };
        Ok(Self {
            regular: load(BuiltinFont::Helvetica)?,
            bold: load(BuiltinFont::HelveticaBold)?,
            oblique: load(BuiltinFont::HelveticaOblique)?,
            bold_oblique: load(BuiltinFont::HelveticaBoldOblique)?,
        })
    }

    fn get(&self, face: Face) -> &IndirectFontRef {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Oblique => &self.oblique,
            Face::BoldOblique => &self.bold_oblique,
        }
    }
}

/// Cursor over the document that starts new pages as text runs out.
struct PageWriter {
    doc: PdfDocumentReference,
    fonts: Fonts,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let fonts = Fonts::load(&doc)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            fonts,
            layer,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    fn line_height(size: f32) -> f32 {
        size * PT_TO_MM * 1.45
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.new_page();
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    /// Write wrapped text at `indent` mm from the left margin.
    fn text(&mut self, text: &str, size: f32, face: Face, indent: f32) {
        let max_chars = chars_per_line(size, TEXT_WIDTH - indent);
        for line in wrap_text(text, max_chars) {
            let height = Self::line_height(size);
            self.ensure_space(height);
            self.y -= height;
            self.layer.use_text(
                line,
                size,
                Mm(MARGIN + indent),
                Mm(self.y),
                self.fonts.get(face),
            );
        }
    }

    /// Write a single centred line.
    fn centered(&mut self, text: &str, size: f32, face: Face) {
        for line in wrap_text(text, chars_per_line(size, TEXT_WIDTH)) {
            let width = line.chars().count() as f32 * size * PT_TO_MM * AVG_GLYPH_WIDTH;
            let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
            let height = Self::line_height(size);
            self.ensure_space(height);
            self.y -= height;
            self.layer
                .use_text(line, size, Mm(x), Mm(self.y), self.fonts.get(face));
        }
    }

    fn finish(self) -> Result<(usize, Vec<u8>), ReportError> {
        let pages = self.pages;
        let mut bytes = Vec::new();
        self.doc
            .save(&mut BufWriter::new(&mut bytes))
            .map_err(|e| ReportError::Render(format!("Failed to save PDF: {e}")))?;
        Ok((pages, bytes))
    }
}

fn chars_per_line(size: f32, width_mm: f32) -> usize {
    ((width_mm / (size * PT_TO_MM * AVG_GLYPH_WIDTH)) as usize).max(10)
}

/// Greedy word wrap; words longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let word: String = word.into_iter().collect();
            let needed = current.chars().count() + word.chars().count() + usize::from(!current.is_empty());
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
    }
    lines
}

/// Rendered document bytes and page count.
#[derive(Debug)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// Render the full report. `generated_on` is printed on the cover.
pub fn render_report(
    layout: &ReportLayout,
    articles: &[Article],
    generated_on: &str,
) -> Result<RenderedPdf, ReportError> {
    let mut w = PageWriter::new(&layout.title)?;

    // Cover
    w.gap(70.0);
    w.centered(&layout.title, 28.0, Face::Bold);
    w.gap(90.0);
    w.centered(&format!("Generated on: {generated_on}"), 12.0, Face::Regular);

    // Table of contents
    w.new_page();
    w.text("Table of Contents", 20.0, Face::Bold, 0.0);
    w.gap(10.0);
    w.text("Introduction", 14.0, Face::Regular, 0.0);
    w.gap(4.0);
    for title in layout.chapter_titles() {
        w.text(title, 14.0, Face::Regular, 0.0);
        w.gap(2.0);
    }
    if !articles.is_empty() {
        w.gap(2.0);
        w.text("Sources", 14.0, Face::Regular, 0.0);
    }

    // Introduction
    w.new_page();
    w.text("Introduction", 18.0, Face::Bold, 0.0);
    w.gap(5.0);
    for line in &layout.introduction {
        w.text(line, 12.0, Face::Regular, 0.0);
        w.gap(2.0);
    }

    for chapter in &layout.chapters {
        w.new_page();
        w.text(&chapter.title, 20.0, Face::Bold, 0.0);
        w.gap(5.0);
        for block in &chapter.blocks {
            match block {
                Block::SubHeading(t) => {
                    w.gap(2.0);
                    w.text(t, 16.0, Face::Bold, 0.0);
                    w.gap(1.0);
                }
                Block::SubSubHeading(t) => {
                    w.gap(2.0);
                    w.text(t, 14.0, Face::BoldOblique, 0.0);
                    w.gap(2.0);
                }
                Block::Bullet(t) => {
                    w.text(&format!("- {t}"), 12.0, Face::Regular, 7.0);
                    w.gap(2.0);
                }
                Block::Source(t) => {
                    w.text(t, 10.0, Face::Oblique, 7.0);
                    w.gap(4.0);
                }
                Block::Paragraph(t) => {
                    w.text(t, 12.0, Face::Regular, 0.0);
                    w.gap(2.0);
                }
            }
        }
    }

    if !articles.is_empty() {
        w.new_page();
        w.text("Sources", 18.0, Face::Bold, 0.0);
        w.gap(5.0);
        for (i, article) in articles.iter().enumerate() {
            let heading = if article.source.is_empty() {
                format!("{}. {}", i + 1, article.title)
            } else {
                format!("{}. {} ({})", i + 1, article.title, article.source)
            };
            w.text(&heading, 12.0, Face::Bold, 0.0);
            if !article.url.is_empty() {
                w.text(&article.url, 10.0, Face::Oblique, 7.0);
            }
            w.gap(3.0);
        }
    }

    let (pages, bytes) = w.finish()?;
    Ok(RenderedPdf { bytes, pages })
}
