use crate::canvas::{Command, Document, Page};
use crate::error::LabelError;
use crate::metrics::{PageMetrics, SheetMetrics};
use crate::types::{Color, Pt, Size};
use fixed::types::I32F32;
use std::collections::BTreeMap;
use std::io::{self, Write};

const PDF_CATALOG_ID: usize = 1;
const PDF_PAGES_ID: usize = 2;
const PDF_RESOURCES_ID: usize = 3;
const DEFAULT_FONT: &str = "Helvetica";

// Turns a finished command document into output bytes. Implementations must not
// return partial output: either the whole document is encoded or an error comes back.
pub trait DocumentWriter {
    fn write(&self, document: &Document) -> Result<Vec<u8>, LabelError>;
}

// PDF 1.7 backend using the base-14 Type1 fonts with WinAnsi encoding.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    title: Option<String>,
}

impl PdfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn write_with_metrics(
        &self,
        document: &Document,
        metrics: Option<&mut SheetMetrics>,
    ) -> Result<Vec<u8>, LabelError> {
        let mut bytes = Vec::new();
        write_document(document, self.title.as_deref(), metrics, &mut bytes)
            .map_err(|err| LabelError::Backend(err.to_string()))?;
        Ok(bytes)
    }
}

impl DocumentWriter for PdfWriter {
    fn write(&self, document: &Document) -> Result<Vec<u8>, LabelError> {
        self.write_with_metrics(document, None)
    }
}

pub fn document_to_pdf(document: &Document) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    write_document(document, None, None, &mut bytes)?;
    Ok(bytes)
}

fn write_document<W: Write>(
    document: &Document,
    title: Option<&str>,
    mut metrics: Option<&mut SheetMetrics>,
    writer: &mut W,
) -> io::Result<usize> {
    let mut pdf_stream = PdfStreamWriter::new(writer, document.page_size)?;
    for page in &document.pages {
        pdf_stream.add_page(page)?;
    }
    let total_bytes = pdf_stream.finish(title)?;

    if let Some(metrics) = metrics.as_deref_mut() {
        metrics.total_bytes = total_bytes;
        for (page_index, content_bytes) in pdf_stream.page_content_bytes.iter().enumerate() {
            if metrics.pages.len() <= page_index {
                metrics
                    .pages
                    .resize_with(page_index + 1, PageMetrics::default);
            }
            let entry = &mut metrics.pages[page_index];
            if entry.page_number == 0 {
                entry.page_number = page_index + 1;
            }
            entry.content_bytes = *content_bytes;
        }
    }
    Ok(total_bytes)
}

#[derive(Debug, Clone)]
struct FontResource {
    resource: String,
    object_id: usize,
}

// Objects are written as soon as they are known; fonts, the shared resource
// dictionary and the page tree are written in `finish` once every page is in.
struct PdfStreamWriter<'a, W: Write> {
    writer: &'a mut W,
    offset: usize,
    offsets: Vec<usize>,
    next_id: usize,
    page_size: Size,
    fonts: BTreeMap<String, FontResource>,
    page_ids: Vec<usize>,
    page_content_bytes: Vec<usize>,
}

impl<'a, W: Write> PdfStreamWriter<'a, W> {
    fn new(writer: &'a mut W, page_size: Size) -> io::Result<Self> {
        let mut offset = 0usize;
        write_bytes(writer, b"%PDF-1.7\n", &mut offset)?;
        write_bytes(writer, b"%\xE2\xE3\xCF\xD3\n", &mut offset)?;
        Ok(Self {
            writer,
            offset,
            offsets: vec![0; PDF_RESOURCES_ID + 1],
            next_id: PDF_RESOURCES_ID + 1,
            page_size,
            fonts: BTreeMap::new(),
            page_ids: Vec::new(),
            page_content_bytes: Vec::new(),
        })
    }

    fn alloc_ids(&mut self, count: usize) -> usize {
        let start = self.next_id;
        self.next_id += count;
        self.offsets.resize(self.next_id, 0);
        start
    }

    fn font_resource(&mut self, name: &str) -> String {
        let base = pdf_font_name(name);
        if let Some(font) = self.fonts.get(&base) {
            return font.resource.clone();
        }
        let resource = format!("F{}", self.fonts.len() + 1);
        let object_id = self.alloc_ids(1);
        self.fonts.insert(
            base,
            FontResource {
                resource: resource.clone(),
                object_id,
            },
        );
        resource
    }

    fn write_object(&mut self, obj_id: usize, body: &str) -> io::Result<()> {
        write_pdf_object(
            self.writer,
            &mut self.offset,
            &mut self.offsets,
            obj_id,
            body,
        )
    }

    fn add_page(&mut self, page: &Page) -> io::Result<()> {
        let start = self.alloc_ids(2);
        let content_id = start;
        let page_id = start + 1;

        let content_stream = self.render_page(page);
        self.page_content_bytes.push(content_stream.len());
        self.write_object(content_id, &stream_object(&content_stream))?;

        let page_obj = format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} 0 R /Contents {} 0 R >>",
            PDF_PAGES_ID,
            fmt_pt(self.page_size.width),
            fmt_pt(self.page_size.height),
            PDF_RESOURCES_ID,
            content_id,
        );
        self.write_object(page_id, &page_obj)?;
        self.page_ids.push(page_id);
        Ok(())
    }

    fn render_page(&mut self, page: &Page) -> String {
        let page_height = self.page_size.height;
        let mut out = String::new();
        let mut current_font_size = Pt::from_i32(12);
        let mut current_font_name = DEFAULT_FONT.to_string();
        // Text state is not part of the PDF graphics state, so mirror q/Q by hand.
        let mut font_stack: Vec<(String, Pt)> = Vec::new();

        for cmd in &page.commands {
            match cmd {
                Command::SaveState => {
                    font_stack.push((current_font_name.clone(), current_font_size));
                    out.push_str("q\n");
                }
                Command::RestoreState => {
                    if let Some((name, size)) = font_stack.pop() {
                        current_font_name = name;
                        current_font_size = size;
                    }
                    out.push_str("Q\n");
                }
                Command::Meta { .. } => {}
                Command::SetFillColor(color) => out.push_str(&color_to_pdf_fill(*color)),
                Command::SetStrokeColor(color) => out.push_str(&color_to_pdf_stroke(*color)),
                Command::SetLineWidth(width) => {
                    out.push_str(&format!("{} w\n", fmt_pt(*width)));
                }
                Command::SetFontName(name) => {
                    current_font_name = name.clone();
                }
                Command::SetFontSize(size) => {
                    current_font_size = *size;
                }
                Command::MoveTo { x, y } => {
                    out.push_str(&format!("{} {} m\n", fmt_pt(*x), fmt_pt(page_height - *y)));
                }
                Command::LineTo { x, y } => {
                    out.push_str(&format!("{} {} l\n", fmt_pt(*x), fmt_pt(page_height - *y)));
                }
                Command::Stroke => out.push_str("S\n"),
                Command::DrawString { x, y, text } => {
                    let resource = self.font_resource(&current_font_name);
                    let encoded = encode_winansi_pdf_string(text);
                    out.push_str("BT\n");
                    out.push_str(&format!("/{} {} Tf\n", resource, fmt_pt(current_font_size)));
                    out.push_str(&format!(
                        "{} {} Td\n",
                        fmt_pt(*x),
                        fmt_pt(page_height - *y - current_font_size)
                    ));
                    out.push_str(&format!("({}) Tj\n", encoded));
                    out.push_str("ET\n");
                }
                Command::StrokeRect {
                    x,
                    y,
                    width,
                    height,
                } => {
                    out.push_str(&format!(
                        "{} {} {} {} re\nS\n",
                        fmt_pt(*x),
                        fmt_pt(page_height - *y - *height),
                        fmt_pt(*width),
                        fmt_pt(*height)
                    ));
                }
            }
        }
        out
    }

    fn finish(&mut self, title: Option<&str>) -> io::Result<usize> {
        let fonts = std::mem::take(&mut self.fonts);
        let mut font_entries = Vec::new();
        for (base, font) in &fonts {
            self.write_object(font.object_id, &font_object(base))?;
            font_entries.push((font.resource.clone(), font.object_id));
        }
        self.write_object(
            PDF_RESOURCES_ID,
            &format!("<< /Font {} >>", font_resources(&font_entries)),
        )?;

        let kids = self
            .page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        let pages_obj = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            self.page_ids.len()
        );
        self.write_object(PDF_PAGES_ID, &pages_obj)?;
        self.write_object(
            PDF_CATALOG_ID,
            &format!("<< /Type /Catalog /Pages {} 0 R >>", PDF_PAGES_ID),
        )?;

        let info_id = self.alloc_ids(1);
        self.write_object(info_id, &info_object(title))?;

        let xref_start = self.offset;
        let mut xref = format!("xref\n0 {}\n", self.offsets.len());
        xref.push_str("0000000000 65535 f \n");
        for offset in self.offsets.iter().skip(1) {
            xref.push_str(&format!("{:010} 00000 n \n", offset));
        }
        write_str(self.writer, &xref, &mut self.offset)?;
        let trailer = format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF",
            self.offsets.len(),
            PDF_CATALOG_ID,
            info_id,
            xref_start
        );
        write_str(self.writer, &trailer, &mut self.offset)?;
        self.writer.flush()?;
        Ok(self.offset)
    }
}

fn is_base14_font(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "courier"
            | "courier-bold"
            | "courier-oblique"
            | "courier-boldoblique"
            | "helvetica"
            | "helvetica-bold"
            | "helvetica-oblique"
            | "helvetica-boldoblique"
            | "times-roman"
            | "times-bold"
            | "times-italic"
            | "times-bolditalic"
            | "symbol"
            | "zapfdingbats"
    )
}

// Only base-14 faces are available without embedding; anything else renders as Helvetica.
fn pdf_font_name(name: &str) -> String {
    let sanitized = sanitize_font_name(name);
    if is_base14_font(&sanitized) {
        sanitized
    } else {
        DEFAULT_FONT.to_string()
    }
}

fn sanitize_font_name(name: &str) -> String {
    let mut out = String::new();
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            out.push(ch);
        } else if ch == ' ' {
            out.push('-');
        }
    }
    out
}

fn font_object(name: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        name
    )
}

fn font_resources(fonts: &[(String, usize)]) -> String {
    let mut entries = Vec::new();
    for (resource, font_id) in fonts {
        entries.push(format!("/{} {} 0 R", resource, font_id));
    }
    format!("<< {} >>", entries.join(" "))
}

fn stream_object(content: &str) -> String {
    format!(
        "<< /Length {} >>\nstream\n{}\nendstream",
        content.len(),
        content
    )
}

fn info_object(title: Option<&str>) -> String {
    let mut entries = vec!["/Producer (labelmerge)".to_string()];
    if let Some(title) = title {
        entries.push(format!("/Title ({})", escape_pdf_string(title)));
    }
    format!("<< {} >>", entries.join(" "))
}

fn write_pdf_object<W: Write>(
    writer: &mut W,
    offset: &mut usize,
    offsets: &mut [usize],
    obj_id: usize,
    body: &str,
) -> io::Result<()> {
    if let Some(slot) = offsets.get_mut(obj_id) {
        *slot = *offset;
    }
    write_str(writer, &format!("{} 0 obj\n", obj_id), offset)?;
    write_bytes(writer, body.as_bytes(), offset)?;
    write_bytes(writer, b"\nendobj\n", offset)?;
    Ok(())
}

fn write_bytes<W: Write>(writer: &mut W, data: &[u8], offset: &mut usize) -> io::Result<()> {
    writer.write_all(data)?;
    *offset += data.len();
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, data: &str, offset: &mut usize) -> io::Result<()> {
    write_bytes(writer, data.as_bytes(), offset)
}

fn escape_pdf_string(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

// Encodes text for a WinAnsi string literal. Characters outside cp1252 become `?`;
// bytes outside printable ASCII are written as octal escapes.
fn encode_winansi_pdf_string(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        let byte = match ch {
            '\u{0000}'..='\u{007F}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => b'?',
        };

        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b if !(0x20..0x7f).contains(&b) => out.push_str(&format!("\\{:03o}", b)),
            b => out.push(b as char),
        }
    }
    out
}

fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = I32F32::from_num(value);
    let scaled = (fixed * I32F32::from_num(1000)).round();
    let milli: i64 = scaled.to_num();
    format_milli(milli)
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        s
    }
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn color_to_pdf_fill(color: Color) -> String {
    format!("{} {} {} rg\n", fmt(color.r), fmt(color.g), fmt(color.b))
}

fn color_to_pdf_stroke(color: Color) -> String {
    format!("{} {} {} RG\n", fmt(color.r), fmt(color.g), fmt(color.b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::types::{LineSegment, Rect};
    use lopdf::Document as LoDocument;

    fn sample_document(pages: usize) -> Document {
        let mut canvas = Canvas::new(Size::letter());
        for index in 0..pages {
            canvas.set_font_name("Helvetica-Bold");
            canvas.set_font_size(Pt::from_i32(10));
            canvas.draw_string(Pt::from_i32(72), Pt::from_i32(72), format!("Page {}", index + 1));
            canvas.stroke_rect(Rect::new(
                Pt::from_i32(10),
                Pt::from_i32(10),
                Pt::from_i32(100),
                Pt::from_i32(50),
            ));
            canvas.show_page();
        }
        canvas.finish()
    }

    fn render_single(page: &Page) -> String {
        let mut sink = Vec::new();
        let mut writer = PdfStreamWriter::new(&mut sink, Size::letter()).expect("header");
        writer.render_page(page)
    }

    #[test]
    fn number_formatting_trims_trailing_zeros() {
        assert_eq!(format_milli(0), "0");
        assert_eq!(format_milli(12_500), "12.5");
        assert_eq!(format_milli(-250), "-0.25");
        assert_eq!(format_milli(7_000), "7");
        assert_eq!(fmt(0.4), "0.4");
        assert_eq!(fmt(f32::NAN), "0");
    }

    #[test]
    fn text_baseline_is_flipped_into_pdf_space() {
        let mut canvas = Canvas::new(Size::letter());
        canvas.set_font_size(Pt::from_i32(10));
        canvas.draw_string(Pt::from_i32(72), Pt::from_i32(100), "Hi");
        let doc = canvas.finish();
        let content = render_single(&doc.pages[0]);
        // 792 - 100 - 10
        assert!(content.contains("/F1 10 Tf\n72 682 Td\n(Hi) Tj\n"), "{content}");
    }

    #[test]
    fn lines_and_rects_are_flipped() {
        let mut canvas = Canvas::new(Size::letter());
        canvas.draw_line(LineSegment::new(
            Pt::from_i32(1),
            Pt::from_i32(2),
            Pt::from_i32(3),
            Pt::from_i32(4),
        ));
        canvas.stroke_rect(Rect::new(
            Pt::from_i32(10),
            Pt::from_i32(20),
            Pt::from_i32(30),
            Pt::from_i32(40),
        ));
        let doc = canvas.finish();
        let content = render_single(&doc.pages[0]);
        assert!(content.contains("1 790 m\n3 788 l\nS\n"), "{content}");
        assert!(content.contains("10 732 30 40 re\nS\n"), "{content}");
    }

    #[test]
    fn strings_are_escaped_and_winansi_encoded() {
        assert_eq!(encode_winansi_pdf_string("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(encode_winansi_pdf_string("caf\u{00e9}"), "caf\\351");
        assert_eq!(encode_winansi_pdf_string("\u{2014}"), "\\227");
        assert_eq!(encode_winansi_pdf_string("\u{4e2d}"), "?");
    }

    #[test]
    fn non_base14_fonts_fall_back_to_helvetica() {
        assert_eq!(pdf_font_name("Times-Bold"), "Times-Bold");
        assert_eq!(pdf_font_name("Comic Sans"), "Helvetica");
        assert_eq!(
            font_object("Courier"),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Courier /Encoding /WinAnsiEncoding >>"
        );
    }

    #[test]
    fn output_parses_with_one_pdf_page_per_document_page() {
        let bytes = document_to_pdf(&sample_document(3)).expect("pdf");
        assert!(bytes.starts_with(b"%PDF-1.7"));
        let parsed = LoDocument::load_mem(&bytes).expect("lopdf parse");
        assert_eq!(parsed.get_pages().len(), 3);
    }

    #[test]
    fn writer_records_metrics_and_title() {
        let writer = PdfWriter::new().with_title("Labels (test)");
        let mut metrics = SheetMetrics::default();
        let bytes = writer
            .write_with_metrics(&sample_document(2), Some(&mut metrics))
            .expect("pdf");
        assert_eq!(metrics.total_bytes, bytes.len());
        assert_eq!(metrics.pages.len(), 2);
        assert_eq!(metrics.pages[1].page_number, 2);
        assert!(metrics.pages[0].content_bytes > 0);
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Title (Labels \\(test\\))"));
        assert!(text.contains("/BaseFont /Helvetica-Bold"));
    }

    #[test]
    fn document_writer_trait_object_works() {
        let writer: Box<dyn DocumentWriter> = Box::new(PdfWriter::new());
        let bytes = writer.write(&sample_document(1)).expect("pdf");
        assert!(bytes.ends_with(b"%%EOF"));
    }
}
