//! msgscenario CLI - check harness configs, resolve step text, compare documents
//!
//! Offline helpers for writing scenarios: nothing here talks to a broker.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process;

use msgscenario::{compare, CompareMode, HarnessConfig, ScenarioContext, VariableResolver};

#[derive(Parser)]
#[command(name = "msgscenario")]
#[command(version, about = "Message scenario engine for behavior-driven broker tests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a harness configuration file
    Validate {
        /// Path to the harness YAML
        #[arg(short, long, default_value = "config/harness.yaml")]
        config: PathBuf,
    },

    /// Resolve [key] references in text against a scenario context
    Resolve {
        /// Harness YAML whose context seeds the scenario
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Extra context values (key=value, repeatable)
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Text to resolve
        text: String,
    },

    /// Compare two JSON documents and list every difference
    Compare {
        /// Expected document (JSON file)
        expected: PathBuf,

        /// Actual document (JSON file)
        actual: PathBuf,

        /// strict, lenient, non-extensible or strict-order
        #[arg(short, long, default_value = "lenient")]
        mode: CompareMode,
    },
}

fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { config } => validate_config(config),
        Commands::Resolve { config, set, text } => resolve_text(config, set, text),
        Commands::Compare { expected, actual, mode } => compare_documents(expected, actual, mode),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn validate_config(config: PathBuf) -> Result<(), String> {
    println!("Validating {}...", config.display());

    let harness = HarnessConfig::load_from_file(&config).map_err(|e| e.to_string())?;

    println!("  {} resources", harness.resources.len());
    for (event, destination) in &harness.destinations {
        println!(
            "  {} -> {} on {} ({})",
            event, destination.destination, destination.resource, destination.message_type
        );
    }
    println!(
        "  polling: {} attempts, {}ms {:?}",
        harness.polling.attempts, harness.polling.interval_ms, harness.polling.strategy
    );
    println!("Configuration is valid");

    Ok(())
}

fn resolve_text(config: Option<PathBuf>, set: Vec<String>, text: String) -> Result<(), String> {
    let mut ctx = match config {
        Some(path) => {
            let harness = HarnessConfig::load_from_file(&path).map_err(|e| e.to_string())?;
            ScenarioContext::new(harness.context).with_sensitive_markers(harness.sensitive_markers)
        }
        None => ScenarioContext::empty(),
    };

    for pair in &set {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", pair))?;
        ctx.set(key.trim(), value);
    }

    let resolution = VariableResolver::default().resolve(&ctx, &text);
    for diagnostic in &resolution.diagnostics {
        eprintln!("warning: {}", diagnostic);
    }
    println!("{}", resolution.value);

    Ok(())
}

fn read_json(path: &PathBuf) -> Result<serde_json::Value, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&contents).map_err(|e| format!("{} is not valid JSON: {}", path.display(), e))
}

fn compare_documents(expected: PathBuf, actual: PathBuf, mode: CompareMode) -> Result<(), String> {
    let expected = read_json(&expected)?;
    let actual = read_json(&actual)?;

    match compare(&expected, &actual, mode) {
        Ok(()) => {
            println!("Documents match ({:?})", mode);
            Ok(())
        }
        Err(found) => Err(format!("{} difference(s):\n{}", found.len(), found)),
    }
}
