use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use labelmerge::{
    FontFamily, HorizontalAlign, LabelError, LabelSheetBuilder, PaperFormat, PdfWriter, Pt,
    VerticalAlign, builtin_formats, find_format, inspect_pdf_path, load_formats_json,
    parse_dataset, require_page_count,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "labelmerge",
    version,
    about = "Merge delimited records into printable label sheets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Lay out every record of INPUT and write a PDF")]
    Render(RenderArgs),
    #[command(about = "List the available paper formats")]
    Formats(FormatsArgs),
    #[command(about = "Report page count and version of a PDF")]
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
struct RenderArgs {
    #[arg(help = "Comma- or tab-separated input file")]
    input: PathBuf,

    #[arg(long, conflicts_with = "template_file", required_unless_present = "template_file")]
    template: Option<String>,

    #[arg(long)]
    template_file: Option<PathBuf>,

    #[arg(long, help = "Paper format id, e.g. avery-5160")]
    format: String,

    #[arg(long)]
    formats_file: Option<PathBuf>,

    #[arg(long, default_value_t = 10.0)]
    font_size: f32,

    #[arg(long, value_enum, default_value_t = FamilyArg::Helvetica)]
    font_family: FamilyArg,

    #[arg(long, value_enum, default_value_t = AlignArg::Left)]
    align: AlignArg,

    #[arg(long, value_enum, default_value_t = VAlignArg::Top)]
    valign: VAlignArg,

    #[arg(long, default_value_t = 4.0)]
    padding: f32,

    #[arg(long, default_value_t = false)]
    border: bool,

    #[arg(long, default_value_t = false)]
    cut_marks: bool,

    #[arg(
        long,
        default_value_t = 0,
        help = "Positions to leave empty at the start of the first sheet"
    )]
    skip: usize,

    #[arg(long)]
    title: Option<String>,

    #[arg(short, long, default_value = "labels.pdf")]
    output: PathBuf,

    #[arg(long)]
    debug_log: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct FormatsArgs {
    #[arg(long)]
    formats_file: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct InspectArgs {
    pdf: PathBuf,

    #[arg(long, help = "Fail unless the file has exactly this many pages")]
    expect_pages: Option<usize>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum FamilyArg {
    Helvetica,
    Times,
    Courier,
}

impl From<FamilyArg> for FontFamily {
    fn from(value: FamilyArg) -> Self {
        match value {
            FamilyArg::Helvetica => FontFamily::Helvetica,
            FamilyArg::Times => FontFamily::Times,
            FamilyArg::Courier => FontFamily::Courier,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum AlignArg {
    Left,
    Center,
    Right,
}

impl From<AlignArg> for HorizontalAlign {
    fn from(value: AlignArg) -> Self {
        match value {
            AlignArg::Left => HorizontalAlign::Left,
            AlignArg::Center => HorizontalAlign::Center,
            AlignArg::Right => HorizontalAlign::Right,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum VAlignArg {
    Top,
    Middle,
    Bottom,
}

impl From<VAlignArg> for VerticalAlign {
    fn from(value: VAlignArg) -> Self {
        match value {
            VAlignArg::Top => VerticalAlign::Top,
            VAlignArg::Middle => VerticalAlign::Middle,
            VAlignArg::Bottom => VerticalAlign::Bottom,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FormatSummary<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
    columns: usize,
    rows: usize,
    labels_per_page: usize,
    label_width_pt: f32,
    label_height_pt: f32,
}

impl<'a> From<&'a PaperFormat> for FormatSummary<'a> {
    fn from(format: &'a PaperFormat) -> Self {
        Self {
            id: &format.id,
            name: &format.name,
            description: &format.description,
            columns: format.columns,
            rows: format.rows,
            labels_per_page: format.labels_per_page(),
            label_width_pt: format.label_width.to_f32(),
            label_height_pt: format.label_height.to_f32(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Render(args) => render(args),
        Commands::Formats(args) => formats(args),
        Commands::Inspect(args) => inspect(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("labelmerge: {err}");
            ExitCode::FAILURE
        }
    }
}

// Entries from `--formats-file` come first so they shadow built-ins with the same id.
fn catalog(formats_file: Option<&Path>) -> Result<Vec<PaperFormat>, LabelError> {
    let mut formats = match formats_file {
        Some(path) => load_formats_json(path)?,
        None => Vec::new(),
    };
    formats.extend(builtin_formats());
    Ok(formats)
}

fn render(args: RenderArgs) -> Result<(), LabelError> {
    let formats = catalog(args.formats_file.as_deref())?;
    let format = find_format(&formats, &args.format).cloned().ok_or_else(|| {
        LabelError::InvalidConfiguration(format!("unknown paper format '{}'", args.format))
    })?;
    let template = match (&args.template, &args.template_file) {
        (Some(template), _) => template.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => {
            return Err(LabelError::InvalidConfiguration(
                "either --template or --template-file is required".to_string(),
            ));
        }
    };
    let input = std::fs::read_to_string(&args.input)?;
    let dataset = parse_dataset(&input);

    let mut builder = LabelSheetBuilder::new()
        .paper_format(format)
        .template(template)
        .font_size(Pt::from_f32(args.font_size))
        .font_family(args.font_family.into())
        .horizontal_align(args.align.into())
        .vertical_align(args.valign.into())
        .padding(Pt::from_f32(args.padding))
        .draw_borders(args.border)
        .cut_marks(args.cut_marks)
        .skip_labels(args.skip);
    if let Some(path) = args.debug_log {
        builder = builder.debug_log(path);
    }
    let sheet = builder.build()?;

    let (document, mut metrics) = sheet.layout_with_metrics(&dataset)?;
    let writer = match args.title {
        Some(title) => PdfWriter::new().with_title(title),
        None => PdfWriter::new(),
    };
    let bytes = writer.write_with_metrics(&document, Some(&mut metrics))?;
    std::fs::write(&args.output, &bytes)?;

    println!(
        "wrote {} labels on {} pages ({} bytes) to {}",
        metrics.labels,
        metrics.page_count(),
        bytes.len(),
        args.output.display()
    );
    if metrics.unresolved_placeholders > 0 {
        eprintln!(
            "warning: {} placeholders did not match a column",
            metrics.unresolved_placeholders
        );
    }
    Ok(())
}

fn formats(args: FormatsArgs) -> Result<(), LabelError> {
    let formats = catalog(args.formats_file.as_deref())?;
    if args.json {
        let summaries: Vec<FormatSummary<'_>> = formats.iter().map(FormatSummary::from).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    for format in &formats {
        println!(
            "{:<12} {:>2} x {:<2} {}",
            format.id, format.columns, format.rows, format.description
        );
    }
    Ok(())
}

fn inspect(args: InspectArgs) -> Result<(), LabelError> {
    let report =
        inspect_pdf_path(&args.pdf).map_err(|err| LabelError::Backend(err.to_string()))?;
    if let Some(expected) = args.expect_pages {
        require_page_count(&report, expected)
            .map_err(|err| LabelError::Backend(err.to_string()))?;
    }
    println!(
        "{}: PDF {} with {} pages ({} bytes)",
        args.pdf.display(),
        report.pdf_version,
        report.page_count,
        report.file_size_bytes
    );
    Ok(())
}
