use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libhieroglyph_core::{Config, DirAssets, GlyphFile, GlyphModel, Materializer, ValidationReport};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod repl;

#[derive(Parser)]
#[command(name = "hieroglyph")]
#[command(about = "Compose hieroglyphs from their graphemes")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides the configuration file)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Asset bundle to materialize (overrides the configuration file)
    #[arg(short, long, global = true)]
    assets: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy the asset bundle into the data directory
    Init,
    /// Check the dictionary against the grapheme store
    Validate {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the character spelled by the given graphemes
    Resolve {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Print the graphemes that may follow the given selection
    Candidates { ids: Vec<String> },
    /// Interactive composition loop (default)
    Compose,
}

#[derive(Serialize)]
struct ValidateOutput<'a> {
    entries: usize,
    stats: libhieroglyph_core::LoadStats,
    glyphs: &'a [GlyphFile],
    report: &'a ValidationReport,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => Config::load_toml(path)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.data_dir {
        cfg.data_dir = dir.clone();
    }
    if let Some(dir) = &cli.assets {
        cfg.asset_dir = Some(dir.clone());
    }
    Ok(cfg)
}

fn handle_init(cfg: &Config) -> Result<()> {
    let assets = cfg
        .asset_dir
        .as_ref()
        .context("no asset bundle configured (use --assets)")?;
    let report = Materializer::new(&cfg.data_dir).materialize(&DirAssets::new(assets));
    println!(
        "copied {} files, skipped {}, created {} directories",
        report.files_copied, report.files_skipped, report.dirs_created
    );
    for (asset, error) in &report.failures {
        println!("  failed: {}: {}", asset, error);
    }
    Ok(())
}

fn handle_validate(cfg: &Config, json: bool) -> Result<()> {
    let model = GlyphModel::open(cfg);
    let glyphs = model.glyphs.inventory();
    let report = model.dictionary.validate(&model.glyphs);

    if json {
        let output = ValidateOutput {
            entries: model.dictionary.len(),
            stats: model.dictionary.stats(),
            glyphs: &glyphs,
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let stats = model.dictionary.stats();
    println!(
        "dictionary: {} entries ({} lines, {} skipped, {} replaced)",
        model.dictionary.len(),
        stats.lines,
        stats.skipped,
        stats.replaced
    );
    let empty = glyphs.iter().filter(|g| !g.is_usable()).count();
    println!("graphemes:  {} files ({} empty)", glyphs.len(), empty);
    for group in &report.ambiguous {
        println!("ambiguous:  {} (resolves to {})", group.join(", "), group[0]);
    }
    for cp in &report.invalid_codepoints {
        println!("invalid codepoint: {}", cp);
    }
    if !report.missing_glyphs.is_empty() {
        println!("missing images: {}", report.missing_glyphs.join(" "));
    }
    if report.is_clean() {
        println!("ok");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let cfg = load_config(&cli)?;

    match cli.command.unwrap_or(Commands::Compose) {
        Commands::Init => handle_init(&cfg)?,
        Commands::Validate { json } => handle_validate(&cfg, json)?,
        Commands::Resolve { ids } => {
            let model = GlyphModel::open(&cfg);
            match model.dictionary.resolve(&ids) {
                Some(text) => println!("{}", text),
                None => println!("not found"),
            }
        }
        Commands::Candidates { ids } => {
            let model = GlyphModel::open(&cfg);
            let next = model.dictionary.next_candidates(&ids, &model.glyphs);
            println!("{}", next.join(" "));
        }
        Commands::Compose => {
            let model = GlyphModel::open(&cfg);
            let mut session = model.session();
            println!("Tap graphemes by id; '-N' removes the Nth, '=' confirms, '!' clears, 'q' quits.");
            let stdin = io::stdin();
            let committed = repl::run(&mut session, stdin.lock(), io::stdout().lock())?;
            model.release_images();
            if !committed.is_empty() {
                println!("{}", committed);
            }
        }
    }
    Ok(())
}
