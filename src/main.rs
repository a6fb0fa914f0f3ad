// attendance-confirm: Composite absence confirmation forms into a PDF

use clap::Parser;
use std::path::{Path, PathBuf};

use attendance_confirm::export::{assemble, export_filename, save_previews};
use attendance_confirm::form::FormSubmission;
use attendance_confirm::render::FilingDate;
use attendance_confirm::resolution::{Resize, SizeWatcher, MAX_CONTAINER_WIDTH};
use attendance_confirm::surface::FontSet;
use attendance_confirm::{
    AppError, AttendanceRecord, Compositor, ImageLoader, RecordStore, CONFIRMATION,
};

// ============================================================================
// Data Structures
// ============================================================================

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Generate absence confirmation PDFs from form data")]
struct Args {
    /// Record JSON file (a raw form submission when --form is given)
    #[arg(short, long)]
    input: PathBuf,

    /// Treat the input as the raw form submission instead of a transformed record
    #[arg(long)]
    form: bool,

    /// Directory holding the template and check mark images
    #[arg(short, long, default_value = "assets")]
    assets: PathBuf,

    /// TrueType/OpenType font used for field text
    #[arg(long)]
    font: Option<PathBuf>,

    /// Bold face for the filing date stamp (defaults to --font)
    #[arg(long)]
    bold_font: Option<PathBuf>,

    /// Displayed page width in pixels
    #[arg(short, long, default_value = "800", value_parser = clap::value_parser!(u32).range(1..=MAX_CONTAINER_WIDTH as i64))]
    width: u32,

    /// Backing buffer multiple over the displayed width
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u32).range(1..=8))]
    supersample: u32,

    /// Output filename (defaults to {date}_출결확인서_{name}[{class}].pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write each composed page as PNG into this directory
    #[arg(long)]
    preview_dir: Option<PathBuf>,

    /// Fail instead of saving when a page could not be composed
    #[arg(long)]
    strict: bool,
}

/// Render configuration assembled from the arguments
struct RenderConfig {
    assets: PathBuf,
    fonts: Option<FontSet>,
    width: u32,
    supersample: u32,
    preview_dir: Option<PathBuf>,
    strict: bool,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let args = Args::parse();

    // Form step hands its record over through the shared holder
    let store = RecordStore::new();
    store.replace(load_record(&args.input, args.form)?);

    let config = RenderConfig {
        assets: args.assets,
        fonts: load_fonts(args.font.as_deref(), args.bold_font.as_deref())?,
        width: args.width,
        supersample: args.supersample,
        preview_dir: args.preview_dir,
        strict: args.strict,
    };

    let record = store.get();
    let compositor = Compositor::new(&CONFIRMATION, ImageLoader::new(&config.assets))
        .with_fonts(config.fonts)
        .with_supersample(config.supersample);

    let mut watcher = SizeWatcher::new();
    let Resize::Redraw(size) = watcher.observe(config.width) else {
        return Err(AppError::ContractViolation("page width must be positive".to_string()));
    };
    let composition = compositor
        .compose_at(record.clone(), size, FilingDate::today())
        .await;

    for warning in &composition.warnings {
        eprintln!("Warning: {}", warning);
    }

    if let Some(dir) = &config.preview_dir {
        for path in save_previews(&composition.pages, dir)? {
            println!("  Preview: {}", path.display());
        }
    }

    let pdf = assemble(&composition.pages, CONFIRMATION.title)?;
    if pdf.is_partial() {
        eprintln!(
            "Warning: only {} of {} pages could be composed",
            pdf.produced_pages(),
            pdf.expected_pages()
        );
    }
    let pdf = if config.strict { pdf.require_complete()? } else { pdf };
    let produced = pdf.produced_pages();

    let output_file = args
        .output
        .unwrap_or_else(|| PathBuf::from(export_filename(&record, CONFIRMATION.file_label)));
    pdf.save(&output_file)?;

    println!("✓ Generated: {}", output_file.display());
    println!("  Name: {}", record.name);
    println!("  Pages: {} of {}", produced, composition.expected_pages());

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn load_record(path: &Path, raw_form: bool) -> Result<AttendanceRecord, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::RecordError(format!("{}: {}", path.display(), e)))?;
    if raw_form {
        FormSubmission::from_json(&content)?.into_record()
    } else {
        AttendanceRecord::from_json(&content)
    }
}

fn load_fonts(regular: Option<&Path>, bold: Option<&Path>) -> Result<Option<FontSet>, AppError> {
    match regular {
        Some(path) => FontSet::load(path, bold).map(Some),
        None => {
            log::warn!("no --font given, field text will not be drawn");
            Ok(None)
        }
    }
}
