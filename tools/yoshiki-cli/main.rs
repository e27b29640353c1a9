use clap::Parser;
use serde_json::{Value as JsonValue, json};
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use yoshiki::prelude::*;

/// Computes and resolves a form definition against an entity document
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the form definition JSON file
    definition_path: String,
    /// Path to the entity JSON file
    entity_path: String,

    /// Report the computed fields affected by a change at this path (repeatable)
    #[arg(short, long = "changed", value_name = "PATH")]
    changed: Vec<String>,

    /// Scroll state of a virtualized repeater, as `id=offset:size` (repeatable)
    #[arg(long = "viewport", value_name = "ID=OFFSET:SIZE")]
    viewports: Vec<String>,

    /// Pretty-print the JSON report
    #[arg(short, long)]
    pretty: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let total_start = Instant::now();

    let definition = FormDefinition::from_file(&cli.definition_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to load definition '{}': {}",
            cli.definition_path, e
        ))
    });
    let entity_json = fs::read_to_string(&cli.entity_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read entity file '{}': {}",
            cli.entity_path, e
        ))
    });
    let entity: JsonValue = serde_json::from_str(&entity_json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse entity JSON: {}", e)));

    let options = cli
        .viewports
        .iter()
        .fold(ResolveOptions::new(), |options, raw| {
            let (id, viewport) = parse_viewport(raw).unwrap_or_else(|| {
                exit_with_error(&format!(
                    "Invalid viewport '{}', expected ID=OFFSET:SIZE",
                    raw
                ))
            });
            options.with_viewport(id, viewport)
        });

    let engine = FormEngine::new(definition);
    let computed = engine.compute_all(&entity);
    let resolution = engine.resolve_with(&entity, &computed, &options, Arc::new(NoopSink));

    let affected: serde_json::Map<String, JsonValue> = cli
        .changed
        .iter()
        .map(|path| (path.clone(), json!(engine.affected_by(path))))
        .collect();

    info!(
        computed = computed.len(),
        failures = computed.failures().count(),
        diagnostics = resolution.diagnostics.len(),
        elapsed = ?total_start.elapsed(),
        "Form resolved"
    );

    let report = json!({
        "form": engine.identity(),
        "loadDiagnostics": engine.load_diagnostics(),
        "computed": computed,
        "affected": affected,
        "resolution": resolution,
    });
    let output = if cli.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize report: {}", e)));
    println!("{}", output);
}

/// `skills=120:400` -> ("skills", Viewport { 120, 400 })
fn parse_viewport(raw: &str) -> Option<(&str, Viewport)> {
    let (id, rest) = raw.split_once('=')?;
    let (offset, size) = rest.split_once(':')?;
    Some((
        id,
        Viewport::new(offset.trim().parse().ok()?, size.trim().parse().ok()?),
    ))
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
