//! Resource identification CLI
//!
//! Command-line tool for identifying statement batches against a store and
//! merging them into it.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::json;

use resource_identify::{
    load_statements, to_json_string, IdentificationMode, IdentifierConfig, IdentifyError,
    MemoryStore, MergeOptions, ResourceIdentifier, ResourceMerger,
};

#[derive(Parser)]
#[command(name = "resource-identify")]
#[command(about = "Identify and merge resources against an existing triple store")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report which incoming resources match stored ones
    Identify(IdentifyArgs),
    /// Merge incoming statements into the store
    Merge(MergeArgs),
}

#[derive(Args)]
struct IdentificationArgs {
    /// Path or URL of the statements already stored
    #[arg(long)]
    store: String,

    /// JSON identifier configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Identification mode
    #[arg(long, value_name = "new|all|none")]
    mode: Option<IdentificationMode>,

    /// Minimum number of matching properties
    #[arg(long)]
    min_score: Option<f32>,

    /// Predicate never used for identification (repeatable)
    #[arg(long = "non-identifying", value_name = "URI")]
    non_identifying: Vec<String>,
}

impl IdentificationArgs {
    /// Config file values, overridden by command line flags
    fn to_config(&self) -> Result<IdentifierConfig, IdentifyError> {
        let mut config = match &self.config {
            Some(path) => IdentifierConfig::from_file(path)?,
            None => IdentifierConfig::default(),
        };
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(min_score) = self.min_score {
            config.min_score = min_score;
        }
        for predicate in &self.non_identifying {
            config.policy.non_identifying.insert(predicate.clone());
        }
        Ok(config)
    }
}

#[derive(Args)]
struct IdentifyArgs {
    /// Path or URL of the incoming statements
    input: String,

    #[command(flatten)]
    identification: IdentificationArgs,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct MergeArgs {
    /// Path or URL of the incoming statements
    input: String,

    #[command(flatten)]
    identification: IdentificationArgs,

    /// Prefix for uris minted for new blank resources
    #[arg(long)]
    uri_prefix: Option<String>,

    /// Don't add nao:created to new resources
    #[arg(long)]
    no_stamp_created: bool,

    /// Only print the statements the merge adds
    #[arg(long)]
    statements_only: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_store(source: &str) -> Result<MemoryStore, IdentifyError> {
    let store = MemoryStore::from_statements(load_statements(source)?);
    log::info!("Loaded {} stored statement(s) from {}", store.len(), source);
    Ok(store)
}

/// Write output to file or stdout
fn write_output(content: &str, output: Option<&PathBuf>) -> Result<(), IdentifyError> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!("Wrote output to {}", path.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

fn run_identify(args: IdentifyArgs) -> Result<(), IdentifyError> {
    let config = args.identification.to_config()?;
    let store = load_store(&args.identification.store)?;
    let incoming = load_statements(&args.input)?;

    let mut identifier = ResourceIdentifier::new(&store, config);
    identifier.add_statements(&incoming);
    identifier.identify_all()?;

    let mappings: BTreeMap<&String, &String> = identifier.mappings().iter().collect();
    let mut unidentified: Vec<&String> = identifier.unidentified().iter().collect();
    unidentified.sort();

    eprintln!(
        "Identified {} resource(s), {} unidentified",
        mappings.len(),
        unidentified.len()
    );

    let doc = json!({
        "mappings": mappings,
        "unidentified": unidentified,
    });
    let output = if args.pretty {
        serde_json::to_string_pretty(&doc)?
    } else {
        serde_json::to_string(&doc)?
    };
    write_output(&output, args.output.as_ref())
}

fn run_merge(args: MergeArgs) -> Result<(), IdentifyError> {
    let config = args.identification.to_config()?;
    let mut store = load_store(&args.identification.store)?;
    let incoming = load_statements(&args.input)?;

    let mut options = MergeOptions::default();
    if let Some(prefix) = args.uri_prefix {
        options.uri_prefix = prefix;
    }
    options.stamp_created = !args.no_stamp_created;

    let result = ResourceMerger::new(&store, config, options).merge(&incoming)?;

    eprintln!(
        "Merged {} resource(s): {} identified, {} created, {} statement(s) added ({} skipped)",
        result.stats.resources,
        result.stats.identified,
        result.stats.created,
        result.stats.statements_added,
        result.stats.statements_skipped
    );

    let output = if args.statements_only {
        to_json_string(&result.statements, args.pretty)?
    } else {
        store.insert_all(result.statements);
        to_json_string(&store.statements(), args.pretty)?
    };
    write_output(&output, args.output.as_ref())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Identify(args) => run_identify(args),
        Commands::Merge(args) => run_merge(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
