// inspection-report: Generate road inspection reports with fillable fields

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use inspection_report::images::ImageLibrary;
use inspection_report::request::{format_date_display, parse_date};
use inspection_report::{
    compose, save_pdf, Orientation, PageFormat, ReportData, ReportError, ReportKind, ReportResult,
    ReportSpec, ReportTemplate,
};

// ============================================================================
// Data Structures
// ============================================================================

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Generate daily, weekly and monthly road inspection reports")]
struct Args {
    /// Report kind
    #[arg(short, long, value_enum)]
    kind: ReportKind,

    /// Report data (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// First day of the period (YYYY-MM-DD)
    #[arg(short, long)]
    start: String,

    /// Last day of the period (YYYY-MM-DD, defaults to the start date)
    #[arg(short, long)]
    end: Option<String>,

    /// Paper size
    #[arg(short, long, value_enum, default_value = "a3")]
    format: PageFormat,

    /// Landscape pages
    #[arg(long)]
    landscape: bool,

    /// Logo image (file path or URL) for the letterhead, overrides the input
    #[arg(long)]
    logo: Option<String>,

    /// Report template (JSON) replacing the built-in one
    #[arg(long)]
    template: Option<PathBuf>,

    /// Output filename (defaults to laporan-{kind}-{start}[-{end}].pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    init_logging();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("inspection_report=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> ReportResult<()> {
    let args = Args::parse();

    // Parse period
    let start = parse_date(&args.start)?;
    let end = args.end.as_deref().map(parse_date).transpose()?;
    let orientation = if args.landscape {
        Orientation::Landscape
    } else {
        Orientation::Portrait
    };
    let spec = ReportSpec::new(args.kind, start, end, args.format, orientation)?;

    let template = load_template(args.kind, args.template.as_deref())?;

    // Load report data; relative image paths follow the input file
    let mut data = load_data(&args.input)?;
    if let Some(logo) = &args.logo {
        data.logo = Some(cli_source(logo)?);
    }
    let base_dir = args
        .input
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let sources = data.image_sources();
    let images = ImageLibrary::load_all(sources.iter().map(String::as_str), &base_dir)?;
    info!(images = images.len(), "images loaded");

    // Determine output filename
    let output_file = args.output.unwrap_or_else(|| default_output(&spec));

    // Generate PDF
    let document = compose(&spec, &template, &data, &images)?;
    save_pdf(&document, &images, &output_file)?;

    println!("✓ Generated: {}", output_file.display());
    println!("  Report: {}", spec.kind);
    println!(
        "  Period: {} s/d {}",
        format_date_display(&spec.start_date),
        format_date_display(&spec.end_date)
    );
    println!("  Pages: {}", document.page_count());
    println!("  Fields: {}", document.fields().len());
    if let Some(id) = &document.report_id {
        println!("  Report ID: {}", id);
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn load_template(kind: ReportKind, path: Option<&Path>) -> ReportResult<ReportTemplate> {
    match path {
        Some(p) => {
            let content = std::fs::read_to_string(p)
                .map_err(|e| ReportError::TemplateError(format!("{}: {}", p.display(), e)))?;
            let template = ReportTemplate::from_json(&content)?;
            if template.kind != kind {
                warn!(requested = %kind, template = %template.kind, "template kind differs from --kind");
            }
            Ok(template)
        }
        None => Ok(ReportTemplate::for_kind(kind)),
    }
}

fn load_data(path: &Path) -> ReportResult<ReportData> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ReportError::InputError(format!("{}: {}", path.display(), e)))?;
    ReportData::from_json(&content)
}

/// A logo given on the command line is relative to the working directory,
/// not to the input file.
fn cli_source(source: &str) -> ReportResult<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return Ok(source.to_string());
    }
    let path = Path::new(source);
    if path.is_absolute() {
        return Ok(source.to_string());
    }
    Ok(std::env::current_dir()?.join(path).display().to_string())
}

fn default_output(spec: &ReportSpec) -> PathBuf {
    let start = spec.start_date.format("%Y-%m-%d");
    let name = if spec.end_date == spec.start_date {
        format!("laporan-{}-{}.pdf", spec.kind, start)
    } else {
        format!("laporan-{}-{}-{}.pdf", spec.kind, start, spec.end_date.format("%Y-%m-%d"))
    };
    PathBuf::from(name)
}
