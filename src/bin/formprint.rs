//! formprint CLI
//!
//! Loads a template library from JSON, runs the document pipeline on one
//! or more scanned images, and prints one JSON record per image.
//!
//! # Usage
//!
//! ```bash
//! formprint scan1.png scan2.png --templates templates.json --pretty
//! formprint scan.png --templates templates.json --config pipeline.json
//! formprint scan.png --templates templates.json --calling-app-id retail-pos
//! ```

use clap::Parser;
use formprint::core::config::PipelineConfig;
use formprint::domain::template::Template;
use formprint::pipeline::DocumentPipeline;
use formprint::utils::{init_tracing, load_image};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "formprint")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Match scanned documents against vendor templates and extract fields")]
struct Cli {
    /// Image files to process
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// JSON file holding the template library
    #[arg(long)]
    templates: Option<PathBuf>,

    /// JSON pipeline configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target resolution in DPI, used when no configuration file is given
    #[arg(long, default_value_t = 300)]
    target_dpi: u32,

    /// Restrict matching to templates registered for this application
    #[arg(long)]
    calling_app_id: Option<String>,

    /// Pretty-print the output records
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "formprint failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => PipelineConfig::with_target_dpi(cli.target_dpi),
    };
    let templates: Vec<Template> = match &cli.templates {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };
    info!(templates = templates.len(), "building pipeline");

    let pipeline = DocumentPipeline::builder(config)
        .with_templates(templates)
        .build()?;

    for path in &cli.images {
        info!(path = %path.display(), "processing");
        let image = load_image(path)?;
        let record = pipeline.process(&image, cli.calling_app_id.as_deref())?;
        let json = if cli.pretty {
            serde_json::to_string_pretty(&record)?
        } else {
            serde_json::to_string(&record)?
        };
        println!("{json}");
    }
    Ok(())
}
