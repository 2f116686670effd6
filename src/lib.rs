mod canvas;
mod dataset;
mod debug;
mod delimited;
mod error;
mod font;
mod grid;
mod header;
mod markup;
mod metrics;
mod paper;
mod pdf;
mod pdfinspect;
mod template;
mod types;
mod wrap;

pub use canvas::{Canvas, Command, Document, Page};
pub use dataset::{Dataset, Record, parse_dataset};
use debug::DebugLogger;
pub use delimited::{
    Delimiter, ParsedRows, detect_delimiter, parse_rows, split_lines, tokenize_line,
};
pub use error::LabelError;
pub use font::{Base14Metrics, FontFamily, TextMeasure};
pub use grid::{
    CUT_MARK_LENGTH, CUT_MARK_OFFSET, GridPosition, LabelPlacement, cut_marks, grid_position,
    label_origin, page_count, paginate,
};
pub use header::{
    classify_header_row, is_known_header, normalize_header, synthetic_headers, unique_headers,
};
pub use markup::{StyledRun, plain_text, segment};
pub use metrics::{PageMetrics, SheetMetrics};
pub use paper::{
    LengthUnit, PaperFormat, builtin_formats, find_format, load_formats_json, parse_formats_json,
};
pub use pdf::{DocumentWriter, PdfWriter, document_to_pdf};
pub use pdfinspect::{
    PdfInspectError, PdfInspectErrorCode, PdfInspectReport, inspect_pdf_bytes, inspect_pdf_path,
    require_page_count,
};
pub use template::{Substitution, placeholders, substitute, substitute_counted};
pub use types::{Color, LineSegment, Pt, Rect, Size};
pub use wrap::{
    Fragment, HorizontalAlign, PlacedFragment, PlacedLine, TextBlock, VerticalAlign, WrappedLine,
    layout_block, layout_text, line_height, wrap_runs,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;

// Meta key carried before every label's drawing commands; the value is
// `record,row,column`.
pub const META_LABEL_KEY: &str = "label";

type SharedMeasure = Arc<dyn TextMeasure + Send + Sync>;

// Each call to `generate` is a fresh pass over the dataset.
pub struct LabelSheet {
    paper_format: Option<PaperFormat>,
    template: String,
    font_size: Pt,
    font_family: FontFamily,
    horizontal_align: HorizontalAlign,
    vertical_align: VerticalAlign,
    padding: Pt,
    draw_borders: bool,
    border_width: Pt,
    cut_marks: bool,
    skip_labels: usize,
    measure: SharedMeasure,
    debug: Option<Arc<DebugLogger>>,
}

pub struct LabelSheetBuilder {
    paper_format: Option<PaperFormat>,
    template: String,
    font_size: Pt,
    font_family: FontFamily,
    horizontal_align: HorizontalAlign,
    vertical_align: VerticalAlign,
    padding: Pt,
    draw_borders: bool,
    border_width: Pt,
    cut_marks: bool,
    skip_labels: usize,
    measure: Option<SharedMeasure>,
    debug_path: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct LayoutCounters {
    labels: usize,
    lines: usize,
    wrapped_lines: usize,
    unresolved_placeholders: usize,
}

impl LabelSheet {
    pub fn builder() -> LabelSheetBuilder {
        LabelSheetBuilder::new()
    }

    pub fn paper_format(&self) -> Option<&PaperFormat> {
        self.paper_format.as_ref()
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn font_size(&self) -> Pt {
        self.font_size
    }

    pub fn merged_texts(&self, dataset: &Dataset) -> Vec<String> {
        dataset
            .rows()
            .iter()
            .map(|record| substitute(&self.template, record))
            .collect()
    }

    pub fn layout(&self, dataset: &Dataset) -> Result<Document, LabelError> {
        let document = self.build_document(dataset, None)?;
        self.emit_debug_summary("layout");
        Ok(document)
    }

    pub fn layout_with_metrics(
        &self,
        dataset: &Dataset,
    ) -> Result<(Document, SheetMetrics), LabelError> {
        let mut metrics = SheetMetrics::default();
        let document = self.build_document(dataset, Some(&mut metrics))?;
        self.emit_debug_summary("layout");
        Ok((document, metrics))
    }

    // Lays out the dataset and hands the finished document to `writer`. Nothing is
    // returned unless the writer produced the whole output.
    pub fn generate(
        &self,
        dataset: &Dataset,
        writer: &dyn DocumentWriter,
    ) -> Result<Vec<u8>, LabelError> {
        let document = self.build_document(dataset, None)?;
        let result = writer.write(&document);
        self.emit_debug_summary("generate");
        result
    }

    pub fn render_pdf(&self, dataset: &Dataset) -> Result<Vec<u8>, LabelError> {
        self.generate(dataset, &PdfWriter::new())
    }

    pub fn render_pdf_with_metrics(
        &self,
        dataset: &Dataset,
    ) -> Result<(Vec<u8>, SheetMetrics), LabelError> {
        let mut metrics = SheetMetrics::default();
        let document = self.build_document(dataset, Some(&mut metrics))?;
        let bytes = PdfWriter::new().write_with_metrics(&document, Some(&mut metrics));
        self.emit_debug_summary("render_pdf");
        Ok((bytes?, metrics))
    }

    // Renders to memory first and only then writes `path`, so a failed render leaves
    // no file behind.
    pub fn render_pdf_to_file(
        &self,
        dataset: &Dataset,
        path: impl AsRef<Path>,
    ) -> Result<usize, LabelError> {
        let bytes = self.render_pdf(dataset)?;
        std::fs::write(path, &bytes)?;
        Ok(bytes.len())
    }

    fn validate(&self, dataset: &Dataset) -> Result<&PaperFormat, LabelError> {
        let format = self
            .paper_format
            .as_ref()
            .ok_or(LabelError::MissingPaperFormat)?;
        if dataset.is_empty() {
            return Err(LabelError::EmptyDataset);
        }
        if self.skip_labels >= format.labels_per_page() {
            return Err(LabelError::InvalidConfiguration(format!(
                "skip_labels={} must be smaller than the {} labels on a '{}' sheet",
                self.skip_labels,
                format.labels_per_page(),
                format.id
            )));
        }
        Ok(format)
    }

    fn build_document(
        &self,
        dataset: &Dataset,
        mut metrics: Option<&mut SheetMetrics>,
    ) -> Result<Document, LabelError> {
        let format = self.validate(dataset)?;
        let t_layout = std::time::Instant::now();
        self.log_dataset(dataset);

        let placements = paginate(dataset.len(), self.skip_labels, format);
        let total_pages = page_count(dataset.len() + self.skip_labels, format);
        let mut placements = placements.into_iter().peekable();
        let mut canvas = Canvas::new(format.page_size());
        let mut counters = LayoutCounters::default();

        for page_index in 0..total_pages {
            let t_page = std::time::Instant::now();
            let mut labels_on_page = 0usize;
            while let Some(placement) = placements.next_if(|p| p.page_index == page_index) {
                let record = &dataset.rows()[placement.record_index];
                let drawn =
                    self.draw_label(&mut canvas, &placement, record, format, &mut counters);
                if let Err(err) = drawn {
                    if let Some(logger) = self.debug.as_deref() {
                        logger.log_label_failed(placement.record_index, &err.to_string());
                        logger.flush();
                    }
                    return Err(err);
                }
                labels_on_page += 1;
            }
            if self.cut_marks {
                draw_cut_marks(&mut canvas, format);
            }
            let command_count = canvas.current_command_count();
            canvas.show_page();

            if let Some(metrics) = metrics.as_deref_mut() {
                metrics.pages.push(PageMetrics {
                    page_number: page_index + 1,
                    labels: labels_on_page,
                    command_count,
                    content_bytes: 0,
                    render_ms: t_page.elapsed().as_secs_f64() * 1000.0,
                });
            }
            if let Some(logger) = self.debug.as_deref() {
                logger.log_page_done(page_index, labels_on_page, command_count);
            }
        }

        if let Some(metrics) = metrics.as_deref_mut() {
            metrics.labels = counters.labels;
            metrics.lines = counters.lines;
            metrics.unresolved_placeholders = counters.unresolved_placeholders;
            metrics.total_render_ms = t_layout.elapsed().as_secs_f64() * 1000.0;
        }
        if let Some(logger) = self.debug.as_deref() {
            logger.increment("labels", counters.labels as u64);
            logger.increment("lines", counters.lines as u64);
            logger.increment("wrapped_lines", counters.wrapped_lines as u64);
            logger.increment(
                "unresolved_placeholders",
                counters.unresolved_placeholders as u64,
            );
        }

        Ok(canvas.finish())
    }

    fn draw_label(
        &self,
        canvas: &mut Canvas,
        placement: &LabelPlacement,
        record: &Record,
        format: &PaperFormat,
        counters: &mut LayoutCounters,
    ) -> Result<(), LabelError> {
        canvas.meta(
            META_LABEL_KEY,
            format!(
                "{},{},{}",
                placement.record_index, placement.row, placement.column
            ),
        );
        let rect = placement.rect(format);
        if self.draw_borders {
            canvas.set_stroke_color(Color::BLACK);
            canvas.set_line_width(self.border_width);
            canvas.stroke_rect(rect);
        }

        let merged = substitute_counted(&self.template, record);
        let runs = segment(&merged.text);
        let bounds = rect.inset(self.padding);
        let lines = wrap_runs(&runs, bounds.width, self.font_size, self.measure.as_ref())?;
        let block = layout_block(
            &lines,
            bounds,
            self.font_size,
            self.horizontal_align,
            self.vertical_align,
        );

        canvas.set_fill_color(Color::BLACK);
        canvas.set_font_size(self.font_size);
        for line in &block.lines {
            for placed in &line.fragments {
                let fragment = &placed.fragment;
                if fragment.text.trim().is_empty() {
                    continue;
                }
                canvas.set_font_name(self.font_family.face_name(fragment.bold, fragment.italic));
                canvas.draw_string(placed.x, placed.y, fragment.text.clone());
            }
        }
        if !block.underlines.is_empty() {
            canvas.set_stroke_color(Color::BLACK);
            canvas.set_line_width(underline_width(self.font_size));
            for segment in &block.underlines {
                canvas.draw_line(*segment);
            }
        }

        let forced_lines = if runs.is_empty() {
            0
        } else {
            runs.iter().filter(|run| run.is_line_break).count() + 1
        };
        counters.labels += 1;
        counters.lines += lines.len();
        counters.wrapped_lines += lines.len().saturating_sub(forced_lines);
        counters.unresolved_placeholders += merged.unresolved;

        if let Some(logger) = self.debug.as_deref() {
            logger.log_label_placed(
                placement.record_index,
                placement.page_index,
                placement.row,
                placement.column,
                lines.len(),
            );
        }
        Ok(())
    }

    fn log_dataset(&self, dataset: &Dataset) {
        if let Some(logger) = self.debug.as_deref() {
            logger.log_dataset_parsed(
                dataset.headers(),
                dataset.len(),
                dataset.has_headers(),
                dataset.delimiter().name(),
            );
        }
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
    }
}

fn underline_width(font_size: Pt) -> Pt {
    font_size.mul_ratio(1, 20).max(Pt::from_f32(0.5))
}

fn draw_cut_marks(canvas: &mut Canvas, format: &PaperFormat) {
    let marks = cut_marks(format);
    if marks.is_empty() {
        return;
    }
    canvas.save_state();
    canvas.set_stroke_color(Color::CUT_MARK_GRAY);
    canvas.set_line_width(Pt::from_f32(0.5));
    for mark in marks {
        canvas.draw_line(mark);
    }
    canvas.restore_state();
}

impl LabelSheetBuilder {
    pub fn new() -> Self {
        Self {
            paper_format: None,
            template: String::new(),
            font_size: Pt::from_i32(10),
            font_family: FontFamily::Helvetica,
            horizontal_align: HorizontalAlign::Left,
            vertical_align: VerticalAlign::Top,
            padding: Pt::from_i32(4),
            draw_borders: false,
            border_width: Pt::from_f32(0.5),
            cut_marks: false,
            skip_labels: 0,
            measure: None,
            debug_path: None,
        }
    }

    pub fn paper_format(mut self, format: PaperFormat) -> Self {
        self.paper_format = Some(format);
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn font_size(mut self, size: Pt) -> Self {
        self.font_size = size;
        self
    }

    pub fn font_family(mut self, family: FontFamily) -> Self {
        self.font_family = family;
        self
    }

    pub fn horizontal_align(mut self, align: HorizontalAlign) -> Self {
        self.horizontal_align = align;
        self
    }

    pub fn vertical_align(mut self, align: VerticalAlign) -> Self {
        self.vertical_align = align;
        self
    }

    // Inset of the text box inside every label.
    pub fn padding(mut self, padding: Pt) -> Self {
        self.padding = padding;
        self
    }

    pub fn draw_borders(mut self, enabled: bool) -> Self {
        self.draw_borders = enabled;
        self
    }

    pub fn border_width(mut self, width: Pt) -> Self {
        self.border_width = width;
        self
    }

    pub fn cut_marks(mut self, enabled: bool) -> Self {
        self.cut_marks = enabled;
        self
    }

    // Leaves the first `count` positions of the first sheet empty.
    pub fn skip_labels(mut self, count: usize) -> Self {
        self.skip_labels = count;
        self
    }

    // Replaces the base-14 metrics of the chosen family with a custom measurer.
    pub fn measure<M>(mut self, measure: M) -> Self
    where
        M: TextMeasure + Send + Sync + 'static,
    {
        self.measure = Some(Arc::new(measure));
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<LabelSheet, LabelError> {
        if self.font_size <= Pt::ZERO {
            return Err(LabelError::InvalidConfiguration(
                "font_size must be > 0".to_string(),
            ));
        }
        if self.padding < Pt::ZERO {
            return Err(LabelError::InvalidConfiguration(
                "padding must be >= 0".to_string(),
            ));
        }
        if self.border_width < Pt::ZERO {
            return Err(LabelError::InvalidConfiguration(
                "border_width must be >= 0".to_string(),
            ));
        }
        if let Some(format) = self.paper_format.as_ref() {
            format.validate()?;
        }
        let measure: SharedMeasure = match self.measure {
            Some(measure) => measure,
            None => Arc::new(Base14Metrics::new(self.font_family)),
        };
        let debug = if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };
        Ok(LabelSheet {
            paper_format: self.paper_format,
            template: self.template,
            font_size: self.font_size,
            font_family: self.font_family,
            horizontal_align: self.horizontal_align,
            vertical_align: self.vertical_align,
            padding: self.padding,
            draw_borders: self.draw_borders,
            border_width: self.border_width,
            cut_marks: self.cut_marks,
            skip_labels: self.skip_labels,
            measure,
            debug,
        })
    }
}

impl Default for LabelSheetBuilder {
    fn default() -> Self {
        Self::new()
    }
}
