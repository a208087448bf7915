use std::io::{BufWriter, Cursor};

use printpdf::image_crate::codecs::jpeg::JpegDecoder;
use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, ImageXObject, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Px, Rect, Rgb,
};

use crate::error::QuoteError;
use crate::model::{LineItem, QuotationRecord};

// A4, millimetres, measured from the top-left like the layouts this follows.
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_L: f32 = 10.0;
const COL_WIDTHS: [f32; 4] = [100.0, 30.0, 30.0, 30.0];
const ROW_H: f32 = 10.0;
const CELL_PAD: f32 = 2.0;
const LOGO_X: f32 = 10.0;
const LOGO_TOP: f32 = 8.0;
const LOGO_W: f32 = 33.0;
const FOOTER_TOP: f32 = PAGE_H - 25.0;
const BODY_LIMIT: f32 = PAGE_H - 30.0;
const DESCRIPTION_LIMIT: usize = 50;

const BLACK: (u8, u8, u8) = (0, 0, 0);
const WHITE: (u8, u8, u8) = (255, 255, 255);

const PT_TO_MM: f32 = 0.352_778;

/// Renders the record into a finished PDF byte buffer. Header and footer are
/// repeated on every page; the body flows between them and breaks onto a new
/// page whenever the next row would reach the footer zone.
pub fn render_quotation(record: &QuotationRecord) -> Result<Vec<u8>, QuoteError> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Quotation {}", record.quote_number),
        Mm(PAGE_W),
        Mm(PAGE_H),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(render_err)?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(render_err)?;
    let logo = record
        .company_info
        .logo
        .as_deref()
        .and_then(|bytes| match decode_logo(bytes) {
            Ok(image) => Some(image),
            Err(err) => {
                log::warn!("logo not usable, rendering without it: {err}");
                None
            }
        });
    let layer = doc.get_page(page).get_layer(layer);

    let mut renderer = Renderer {
        record,
        doc,
        layer,
        font,
        font_bold,
        logo,
        y: 0.0,
        page_no: 1,
    };
    renderer.emit_page_frame();
    renderer.emit_body();
    renderer.finish()
}

struct Renderer<'a> {
    record: &'a QuotationRecord,
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    logo: Option<ImageXObject>,
    /// Cursor: top edge of the next row, in mm from the top of the page.
    y: f32,
    page_no: u32,
}

impl Renderer<'_> {
    /// Header and footer for the current page. Leaves the cursor at the first
    /// body line.
    fn emit_page_frame(&mut self) {
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
        self.layer.set_outline_thickness(0.5);
        self.set_fill(BLACK);

        let mut y = if let Some(logo) = &self.logo {
            self.place_logo(logo);
            25.0
        } else {
            8.0
        };

        let company = &self.record.company_info;
        self.draw_right(&company.name, 12.0, y + 4.5, true);
        y += 6.0;
        let block = format!(
            "{}\nTel: {}\nEmail: {}",
            company.address, company.phone, company.email
        );
        for line in block.lines() {
            self.draw_right(line, 10.0, y + 3.5, false);
            y += 5.0;
        }
        y += 20.0;
        self.draw_centered("QUOTATION", 15.0, y + 7.0, true);
        y += ROW_H;
        self.y = y;

        self.draw_centered(&company.footer_text, 8.0, FOOTER_TOP + 3.5, false);
        self.draw_centered(
            &format!("Page {}", self.page_no),
            8.0,
            FOOTER_TOP + 5.0 + 3.5,
            false,
        );
    }

    fn emit_body(&mut self) {
        let record = self.record;

        self.draw_text(
            &format!("Quote Number: {}", record.quote_number),
            12.0,
            MARGIN_L,
            self.y + 6.5,
            true,
        );
        self.y += ROW_H;
        self.draw_text(
            &format!("Date: {}", record.date),
            12.0,
            MARGIN_L,
            self.y + 6.5,
            true,
        );
        self.y += ROW_H;

        self.y += 5.0;
        self.ensure_room(ROW_H);
        self.draw_text("CLIENT INFORMATION", 12.0, MARGIN_L, self.y + 6.5, true);
        self.y += ROW_H;
        let client = &record.client_info;
        for (label, value) in [
            ("Name", &client.name),
            ("Phone", &client.phone),
            ("Email", &client.email),
            ("Address", &client.address),
        ] {
            if value.is_empty() {
                continue;
            }
            self.ensure_room(ROW_H);
            self.draw_text(
                &format!("{label}: {value}"),
                10.0,
                MARGIN_L,
                self.y + 6.5,
                false,
            );
            self.y += ROW_H;
        }

        self.y += ROW_H;
        self.emit_table_header();
        for item in &record.items {
            self.ensure_room(ROW_H);
            self.emit_item_row(item);
        }
        self.ensure_room(ROW_H);
        self.emit_total_row();
    }

    fn emit_table_header(&mut self) {
        self.ensure_room(ROW_H);
        let y = self.y;
        let theme = hex_to_rgb(&self.record.company_info.theme_color);

        self.set_fill(theme);
        let mut x = MARGIN_L;
        for width in COL_WIDTHS {
            self.cell_rect(x, y, width, PaintMode::FillStroke);
            x += width;
        }

        self.set_fill(WHITE);
        x = MARGIN_L;
        for (i, header) in ["Description", "Unit Cost", "Quantity", "Amount"]
            .iter()
            .enumerate()
        {
            let centered = x + (COL_WIDTHS[i] - text_width_mm(header, 10.0)) / 2.0;
            self.draw_text(header, 10.0, centered, y + 6.5, true);
            x += COL_WIDTHS[i];
        }
        self.set_fill(BLACK);
        self.y += ROW_H;
    }

    fn emit_item_row(&mut self, item: &LineItem) {
        let y = self.y;
        let description = truncate_description(&item.description);
        self.cell_rect(MARGIN_L, y, COL_WIDTHS[0], PaintMode::Stroke);
        self.draw_text(&description, 10.0, MARGIN_L + CELL_PAD, y + 6.5, false);

        let mut x = MARGIN_L + COL_WIDTHS[0];
        let numerics = [
            format_amount(item.unit_cost),
            format_amount(item.quantity),
            format_amount(item.amount),
        ];
        for (i, value) in numerics.iter().enumerate() {
            let width = COL_WIDTHS[i + 1];
            self.cell_rect(x, y, width, PaintMode::Stroke);
            let right = x + width - CELL_PAD - text_width_mm(value, 10.0);
            self.draw_text(value, 10.0, right, y + 6.5, false);
            x += width;
        }
        self.y += ROW_H;
    }

    /// Bold total row: one cell spanning the first three columns, then the
    /// amount cell.
    fn emit_total_row(&mut self) {
        let y = self.y;
        let label_w: f32 = COL_WIDTHS[0] + COL_WIDTHS[1] + COL_WIDTHS[2];
        self.cell_rect(MARGIN_L, y, label_w, PaintMode::Stroke);
        let label_x = MARGIN_L + label_w - CELL_PAD - text_width_mm("Total:", 12.0);
        self.draw_text("Total:", 12.0, label_x, y + 6.5, true);

        let x = MARGIN_L + label_w;
        self.cell_rect(x, y, COL_WIDTHS[3], PaintMode::Stroke);
        let total = format_amount(self.record.total);
        let total_x = x + COL_WIDTHS[3] - CELL_PAD - text_width_mm(&total, 12.0);
        self.draw_text(&total, 12.0, total_x, y + 6.5, true);
        self.y += ROW_H;
    }

    fn ensure_room(&mut self, needed: f32) {
        if self.y + needed > BODY_LIMIT {
            self.new_page();
        }
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.page_no += 1;
        self.emit_page_frame();
    }

    fn finish(self) -> Result<Vec<u8>, QuoteError> {
        let mut writer = BufWriter::new(Vec::new());
        self.doc.save(&mut writer).map_err(render_err)?;
        writer.into_inner().map_err(render_err)
    }

    fn place_logo(&self, logo: &ImageXObject) {
        let dpi = 300.0;
        let native_w = px_to_mm(logo.width, dpi);
        let native_h = px_to_mm(logo.height, dpi);
        if native_w <= 0.0 {
            return;
        }
        let scale = LOGO_W / native_w;
        let image = Image {
            image: logo.clone(),
        };
        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(LOGO_X)),
                translate_y: Some(Mm(PAGE_H - LOGO_TOP - native_h * scale)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
    }

    /// `baseline` is measured from the top edge of the page.
    fn draw_text(&self, text: &str, size: f32, x: f32, baseline: f32, bold: bool) {
        let font = if bold { &self.font_bold } else { &self.font };
        self.layer
            .use_text(text, size, Mm(x), Mm(PAGE_H - baseline), font);
    }

    fn draw_right(&self, text: &str, size: f32, baseline: f32, bold: bool) {
        let x = PAGE_W - MARGIN_L - text_width_mm(text, size);
        self.draw_text(text, size, x, baseline, bold);
    }

    fn draw_centered(&self, text: &str, size: f32, baseline: f32, bold: bool) {
        let x = (PAGE_W - text_width_mm(text, size)) / 2.0;
        self.draw_text(text, size, x, baseline, bold);
    }

    fn cell_rect(&self, x: f32, y_top: f32, width: f32, mode: PaintMode) {
        let rect = Rect::new(
            Mm(x),
            Mm(PAGE_H - y_top - ROW_H),
            Mm(x + width),
            Mm(PAGE_H - y_top),
        )
        .with_mode(mode);
        self.layer.add_rect(rect);
    }

    fn set_fill(&self, (r, g, b): (u8, u8, u8)) {
        self.layer.set_fill_color(Color::Rgb(Rgb::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            None,
        )));
    }
}

/// Decodes a hex color like `#4A90E2` into RGB channels. Anything that is not
/// exactly six hex digits after the leading hashes is rendered black.
pub fn hex_to_rgb(hex: &str) -> (u8, u8, u8) {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return (0, 0, 0);
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
    (channel(0), channel(2), channel(4))
}

/// Two decimal places with thousands separators: 1234567.5 -> "1,234,567.50".
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut reversed = String::new();
    for (i, ch) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 && ch.is_ascii_digit() {
            reversed.push(',');
        }
        reversed.push(ch);
    }
    let grouped: String = reversed.chars().rev().collect();
    format!("{grouped}.{dec_part}")
}

fn truncate_description(description: &str) -> String {
    description.chars().take(DESCRIPTION_LIMIT).collect()
}

fn decode_logo(bytes: &[u8]) -> Result<ImageXObject, QuoteError> {
    let cursor = Cursor::new(bytes);
    let image = if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Image::try_from(PngDecoder::new(cursor).map_err(render_err)?).map_err(render_err)?
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        Image::try_from(JpegDecoder::new(cursor).map_err(render_err)?).map_err(render_err)?
    } else {
        return Err(QuoteError::Render(
            "unsupported logo format (use PNG or JPEG)".to_string(),
        ));
    };
    Ok(image.image)
}

fn px_to_mm(px: Px, dpi: f32) -> f32 {
    px.0 as f32 / dpi * 25.4
}

/// Approximate Helvetica advance widths (1/1000 em), close enough for right
/// alignment and centering with the builtin fonts.
fn text_width_mm(text: &str, font_size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| match c {
            '.' | ',' | ':' | ';' | '\'' | '|' | '!' | 'i' | 'j' | 'l' | 'I' => 278,
            'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' | '/' | ' ' => 333,
            'm' | 'M' | 'W' | 'w' | '@' => 889,
            c if c.is_ascii_uppercase() => 667,
            _ => 556,
        })
        .sum();
    units as f32 / 1000.0 * font_size * PT_TO_MM
}

fn render_err(err: impl std::fmt::Display) -> QuoteError {
    QuoteError::Render(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClientInfo, CompanyInfo, LineItem};

    fn record(items: Vec<LineItem>) -> QuotationRecord {
        QuotationRecord {
            quote_number: "000001".to_string(),
            date: "01-06-2026".to_string(),
            client_info: ClientInfo {
                name: "Jane Doe".to_string(),
                ..ClientInfo::default()
            },
            total: items.iter().map(|i| i.amount).sum(),
            items,
            company_info: CompanyInfo {
                name: "Acme Ltd".to_string(),
                address: "1 Main Street\nSpringfield".to_string(),
                footer_text: "Thank you for your business!".to_string(),
                theme_color: "#4A90E2".to_string(),
                ..CompanyInfo::default()
            },
        }
    }

    #[test]
    fn hex_to_rgb_decodes_channel_pairs() {
        assert_eq!(hex_to_rgb("#4A90E2"), (74, 144, 226));
        assert_eq!(hex_to_rgb("4A90E2"), (74, 144, 226));
        assert_eq!(hex_to_rgb("##4A90E2"), (74, 144, 226));
        assert_eq!(hex_to_rgb("#ffffff"), (255, 255, 255));
    }

    #[test]
    fn hex_to_rgb_falls_back_to_black() {
        assert_eq!(hex_to_rgb("notacolor"), (0, 0, 0));
        assert_eq!(hex_to_rgb("#FFF"), (0, 0, 0));
        assert_eq!(hex_to_rgb("#4A90E21"), (0, 0, 0));
        assert_eq!(hex_to_rgb(""), (0, 0, 0));
        assert_eq!(hex_to_rgb("#4A90EZ"), (0, 0, 0));
    }

    #[test]
    fn format_amount_groups_thousands() {
        assert_eq!(format_amount(200.0), "200.00");
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.999), "1,000.00");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
    }

    #[test]
    fn description_is_cut_at_fifty_characters() {
        let long = "x".repeat(80);
        assert_eq!(truncate_description(&long).chars().count(), 50);
        assert_eq!(truncate_description("short"), "short");
    }

    #[test]
    fn renders_a_pdf_document() {
        let bytes = render_quotation(&record(vec![
            LineItem::new("Consulting", 100.0, 2.0),
            LineItem::new("Hosting", 9.99, 3.0),
        ]))
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 1_000);
    }

    #[test]
    fn long_ledgers_overflow_onto_extra_pages() {
        let one_page = render_quotation(&record(vec![LineItem::new("a", 1.0, 1.0)])).unwrap();
        let items = (0..60)
            .map(|i| LineItem::new(format!("Line item {i}"), 10.0, 1.0))
            .collect();
        let many_pages = render_quotation(&record(items)).unwrap();
        assert!(many_pages.len() > one_page.len());
    }

    #[test]
    fn garbage_logo_bytes_are_rejected() {
        assert!(decode_logo(b"definitely not an image").is_err());
        assert!(decode_logo(&[0x89, b'P', b'N', b'G', 1, 2, 3]).is_err());
    }

    #[test]
    fn unusable_logo_does_not_break_rendering() {
        let mut r = record(vec![LineItem::new("Consulting", 100.0, 2.0)]);
        r.company_info.logo = Some(vec![1, 2, 3, 4]);
        let bytes = render_quotation(&r).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
