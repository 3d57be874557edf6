use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use brandbook_contracts::events::EventWriter;
use brandbook_contracts::guideline::VisualGuideRules;
use brandbook_contracts::render::render_markdown;
use brandbook_contracts::store::GuidelineStore;
use brandbook_contracts::synth::synthesize_prompts;
use brandbook_engine::{analyze, AnalyzeOptions, HttpImageFetcher, OpenAiVisionModel};
use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(name = "brandbook-rs", version, about = "Brand visual guideline synthesis CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze brand images into a guideline document and prompts.
    Analyze(AnalyzeArgs),
    /// Re-render a stored guideline for another locale.
    Render(RenderArgs),
    /// Print the image-generation prompt pair for a stored guideline.
    Prompt(PromptArgs),
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    /// Image URL; repeat for every brand image.
    #[arg(long = "image", required = true)]
    images: Vec<String>,
    #[arg(long, default_value = "en-US")]
    locale: String,
    /// Optional brand context passed to the model verbatim.
    #[arg(long)]
    context: Option<String>,
    #[arg(long)]
    out: PathBuf,
    /// Session identifier; a fresh UUID when omitted.
    #[arg(long)]
    session: Option<String>,
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct RenderArgs {
    /// Stored guideline document (or bare rules JSON).
    #[arg(long)]
    rules: PathBuf,
    #[arg(long, default_value = "en-US")]
    locale: String,
    /// Write the markdown here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct PromptArgs {
    #[arg(long)]
    rules: PathBuf,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("brandbook-rs error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Render(args) => run_render(args),
        Command::Prompt(args) => run_prompt(args),
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<i32> {
    let session_id = args
        .session
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let events = EventWriter::new(&events_path, &session_id);

    let model = OpenAiVisionModel::from_env()?;
    let fetcher = HttpImageFetcher::new();
    let outcome = analyze(
        &model,
        &fetcher,
        &args.images,
        &args.locale,
        args.context.as_deref(),
        &AnalyzeOptions::default(),
        Some(&events),
    )
    .with_context(|| format!("analysis failed for session {session_id}"))?;

    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed creating {}", args.out.display()))?;
    let document_path = args.out.join("guideline.md");
    fs::write(&document_path, &outcome.document)
        .with_context(|| format!("failed writing {}", document_path.display()))?;
    let prompts_path = args.out.join("prompts.json");
    fs::write(
        &prompts_path,
        serde_json::to_string_pretty(&outcome.prompts)?,
    )
    .with_context(|| format!("failed writing {}", prompts_path.display()))?;

    let store = GuidelineStore::new(&args.out);
    let stored_path = store.upsert(&session_id, &outcome.rules, outcome.source_image_count)?;

    println!("session: {session_id}");
    println!("document: {}", document_path.display());
    println!("prompts: {}", prompts_path.display());
    println!("stored: {}", stored_path.display());
    println!("attempts: {}", outcome.attempts);
    Ok(0)
}

fn run_render(args: RenderArgs) -> Result<i32> {
    let rules = load_rules(&args.rules)?;
    let document = render_markdown(&rules, &args.locale);
    match args.out {
        Some(path) => {
            fs::write(&path, document)
                .with_context(|| format!("failed writing {}", path.display()))?;
            println!("document: {}", path.display());
        }
        None => print!("{document}"),
    }
    Ok(0)
}

fn run_prompt(args: PromptArgs) -> Result<i32> {
    let rules = load_rules(&args.rules)?;
    let prompts = synthesize_prompts(&rules);
    println!("{}", serde_json::to_string_pretty(&prompts)?);
    Ok(0)
}

/// Accepts either a full stored document (with `rules_json`) or bare rules.
fn load_rules(path: &Path) -> Result<VisualGuideRules> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let rules_value = value.get("rules_json").cloned().unwrap_or(value);
    serde_json::from_value(rules_value)
        .with_context(|| format!("{} does not contain a guideline", path.display()))
}
