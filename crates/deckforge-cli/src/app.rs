//! CLI application logic.
//!
//! Thin wrapper over the engine: load the JSON inputs, run the pipeline,
//! write the buffer, print the metrics.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use deckforge_engine::{generate, EngineOptions};
use deckforge_model::{Config, Scope};
use deckforge_pptx::Assets;
use deckforge_template::TemplateContract;

/// Output format for the metrics report
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum MetricsFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for tooling
    Json,
}

#[derive(Parser)]
#[command(name = "deckforge")]
#[command(author, version, about = "Template-faithful market research decks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a presentation from a synthesis and country analysis
    Generate {
        /// Synthesis JSON (project metadata and Stage-3 enrichment)
        #[arg(short, long)]
        synthesis: PathBuf,

        /// Country analysis JSON (the five section payloads plus country)
        #[arg(short, long)]
        country_analysis: PathBuf,

        /// Scope JSON (industry, client, template selections)
        #[arg(long)]
        scope: Option<PathBuf>,

        /// Output .pptx path
        #[arg(short, long, default_value = "output.pptx")]
        output: PathBuf,

        /// Reference template .pptx for the clone overlay
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Template contract file, JSON or TOML (defaults to the compiled-in
        /// contract)
        #[arg(long)]
        patterns: Option<PathBuf>,

        /// Directory with brand assets (cover-bg.png, logo-*.png, ...)
        #[arg(long)]
        assets: Option<PathBuf>,

        /// Metrics report format
        #[arg(long, value_enum, default_value = "text")]
        metrics: MetricsFormat,
    },

    /// Print the compiled-in template contract as JSON
    Contract,
}

/// CLI entry point
pub fn run_cli() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            synthesis,
            country_analysis,
            scope,
            output,
            template,
            patterns,
            assets,
            metrics,
        } => cmd_generate(
            synthesis,
            country_analysis,
            scope,
            output,
            template,
            patterns,
            assets,
            metrics,
        ),
        Commands::Contract => {
            let contract = TemplateContract::default();
            println!("{}", serde_json::to_string_pretty(&contract)?);
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_generate(
    synthesis_path: PathBuf,
    analysis_path: PathBuf,
    scope_path: Option<PathBuf>,
    output: PathBuf,
    template_path: Option<PathBuf>,
    patterns_path: Option<PathBuf>,
    assets_dir: Option<PathBuf>,
    metrics_format: MetricsFormat,
) -> Result<()> {
    let synthesis: serde_json::Value = read_json(&synthesis_path)?;
    let country_analysis: serde_json::Value = read_json(&analysis_path)?;

    let scope: Scope = match scope_path {
        Some(path) => read_json(&path)?,
        None => Scope::default(),
    };

    let contract = match patterns_path {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading contract {}", path.display()))?;
            let is_toml = path.extension().is_some_and(|e| e == "toml");
            if is_toml {
                TemplateContract::from_toml(&text)
                    .with_context(|| format!("parsing contract {}", path.display()))?
            } else {
                TemplateContract::from_json(&text)
                    .with_context(|| format!("parsing contract {}", path.display()))?
            }
        }
        None => TemplateContract::default(),
    };

    let assets = match assets_dir {
        Some(dir) => Assets::load(&dir)
            .with_context(|| format!("loading assets from {}", dir.display()))?,
        None => Assets::empty(),
    };

    let reference_template = match template_path {
        Some(path) => Some(
            fs::read(&path).with_context(|| format!("reading template {}", path.display()))?,
        ),
        None => None,
    };

    let config = Config::from_env();
    let options = EngineOptions {
        contract,
        assets,
        reference_template,
    };

    let deck = generate(&synthesis, &country_analysis, &scope, &config, &options)
        .context("generation failed")?;

    fs::write(&output, &deck.bytes)
        .with_context(|| format!("writing {}", output.display()))?;

    match metrics_format {
        MetricsFormat::Json => println!("{}", serde_json::to_string_pretty(&deck.metrics)?),
        MetricsFormat::Text => print_metrics_text(&deck.metrics, &output),
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn print_metrics_text(metrics: &deckforge_model::PptMetrics, output: &PathBuf) {
    println!("Wrote {}", output.display());
    println!(
        "  strict mode:        {}",
        if metrics.strict_geometry_mode { "on" } else { "off" }
    );
    println!("  template coverage:  {:.0}%", metrics.template_coverage_pct);
    println!(
        "  geometry:           aligned={} max delta={} EMU",
        metrics.geometry_aligned, metrics.geometry_max_delta_emu
    );
    println!(
        "  recoveries:         {} flex, {} fallback, {} render failure(s)",
        metrics.table_recoveries.len(),
        metrics.table_fallbacks.len(),
        metrics.slide_render_failures.len()
    );
    println!(
        "  formatting:         {} critical, {} warning",
        metrics.formatting_critical_count, metrics.formatting_warning_count
    );
    if !metrics.formatting_issue_codes.is_empty() {
        println!("  issue codes:        {}", metrics.formatting_issue_codes.join(", "));
    }
    if !metrics.template_usage.is_empty() {
        let usage: Vec<String> = metrics
            .template_usage
            .iter()
            .map(|(pattern, count)| format!("{pattern}x{count}"))
            .collect();
        println!("  template usage:     {}", usage.join(", "));
    }
}
