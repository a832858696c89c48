use chrono::Utc;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use std::io::BufWriter;
use thiserror::Error;

use crate::state::StateSnapshot;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const WRAP_AT: usize = 90;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to build PDF: {0}")]
    Pdf(String),
}

impl From<printpdf::Error> for ReportError {
    fn from(e: printpdf::Error) -> Self {
        ReportError::Pdf(e.to_string())
    }
}

/// Writes lines top to bottom, opening a new page when one fills up.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self { doc, layer, font, bold, y: PAGE_HEIGHT - MARGIN - 7.0, pages: 1 })
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.pages += 1;
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Page {}", self.pages));
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn heading(&mut self, text: &str, size: f32) {
        let height = size * 0.5;
        self.ensure_room(height + 4.0);
        self.y -= 4.0;
        self.layer.use_text(text, size, Mm(MARGIN), Mm(self.y), &self.bold);
        self.y -= height;
    }

    fn paragraph(&mut self, text: &str, size: f32) {
        for line in wrap(text, WRAP_AT) {
            self.ensure_room(size * 0.5);
            self.layer.use_text(line, size, Mm(MARGIN), Mm(self.y), &self.font);
            self.y -= size * 0.5;
        }
    }

    fn field(&mut self, label: &str, value: &str) {
        if !value.trim().is_empty() {
            self.paragraph(&format!("{label}: {}", value.trim()), 11.0);
        }
    }

    fn list(&mut self, title: &str, items: &[String]) {
        if items.is_empty() {
            return;
        }
        self.heading(title, 13.0);
        for item in items {
            self.paragraph(&format!("- {item}"), 11.0);
        }
    }

    fn finish(self) -> Result<Vec<u8>, ReportError> {
        let mut buf = Vec::new();
        self.doc.save(&mut BufWriter::new(&mut buf))?;
        Ok(buf)
    }
}

/// Greedy word wrap on character counts. Words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw_line in text.lines() {
        let mut line = String::new();
        for word in raw_line.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                lines.push(word.drain(..width).collect());
            }
            let word: String = word.into_iter().collect();
            let needed = line.chars().count() + usize::from(!line.is_empty()) + word.chars().count();
            if needed > width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

/// Text-only summary of the session's product and generated design.
pub fn design_report(snapshot: &StateSnapshot) -> Result<Vec<u8>, ReportError> {
    let form = &snapshot.form;
    let preview = &snapshot.preview;
    let name = match form.product_name.trim() {
        "" => "Untitled product",
        name => name,
    };

    let mut pdf = PageWriter::new(&format!("PromptAgro design: {name}"))?;
    pdf.heading("PromptAgro Design Report", 20.0);
    pdf.paragraph(&format!("Generated {}", Utc::now().format("%Y-%m-%d %H:%M UTC")), 9.0);

    pdf.heading("Product", 14.0);
    pdf.field("Name", name);
    pdf.field("Tagline", &form.tagline);
    pdf.field("Sales platform", form.sales_platform.as_str());
    pdf.field("Desired emotion", form.desired_emotion.as_str());
    let colors: Vec<&str> = form.preferred_colors.iter().map(String::as_str).collect();
    pdf.field("Preferred colors", &colors.join(", "));
    if !form.product_story.trim().is_empty() {
        pdf.heading("Story", 13.0);
        pdf.paragraph(form.product_story.trim(), 11.0);
    }

    pdf.heading("Design", 14.0);
    pdf.field("Design ID", preview.design_id.as_deref().unwrap_or("not generated"));
    if let Some(confidence) = preview.ai_confidence {
        pdf.field("AI confidence", &format!("{:.1}%", confidence * 100.0));
    }
    match preview.mockup_url.as_deref() {
        Some(url) if url.starts_with("data:") => pdf.field("Mockup", "embedded image (see preview)"),
        Some(url) => pdf.field("Mockup", url),
        None => {}
    }
    pdf.list("Concepts", &preview.concepts);
    pdf.list("Color palette", &preview.color_palette);
    pdf.list("Style suggestions", &preview.styles_suggestions);
    if let Some(advice) = &preview.professional_advice {
        pdf.heading("Professional advice", 13.0);
        pdf.paragraph(advice, 11.0);
    }

    pdf.finish()
}
