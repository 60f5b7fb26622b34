//! Registry Dump CLI
//!
//! Runs the schema pipeline offline over a captured registry dump (a JSON
//! map of type path to raw descriptor) and prints normalized schemas,
//! synthesized defaults, search results, or detected reference cycles.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use remote_inspector::descriptor::RawTypeDescriptor;
use remote_inspector::schema::RegistrySnapshot;
use remote_inspector::value::generate_default;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "inspector-dump")]
#[command(about = "Inspect a captured type-registry dump offline")]
struct Cli {
    /// Path to the registry dump file (JSON: typePath -> descriptor)
    #[arg(short, long)]
    dump: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the normalized, dereferenced schema of one type
    Show {
        /// Fully-qualified type path
        type_path: String,
    },

    /// Print the synthesized default value for one type
    Defaults {
        /// Fully-qualified type path
        type_path: String,
    },

    /// Fuzzy-search registered types
    Search {
        query: String,
        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// List reference cycles detected during dereferencing
    Cycles,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(&cli.dump)?;
    let raw: HashMap<String, RawTypeDescriptor> = serde_json::from_str(&content)?;
    let snapshot = RegistrySnapshot::build(&raw);

    match cli.command {
        Commands::Show { type_path } => {
            let Some(schema) = snapshot.get(&type_path) else {
                eprintln!("❌ {} is not in the dump ({} types)", type_path, snapshot.len());
                std::process::exit(1);
            };
            println!("{}", serde_json::to_string_pretty(schema.as_ref())?);
            Ok(())
        }

        Commands::Defaults { type_path } => {
            let Some(schema) = snapshot.get(&type_path) else {
                eprintln!("❌ {} is not in the dump", type_path);
                std::process::exit(1);
            };
            println!("{}", serde_json::to_string_pretty(&generate_default(&schema))?);
            Ok(())
        }

        Commands::Search { query, limit } => {
            let results = snapshot.search(&query, limit);
            if results.is_empty() {
                println!("No matches for '{}'", query);
            }
            for result in results {
                println!("{:>5}  {}  ({})", result.score, result.short_path, result.type_path);
            }
            Ok(())
        }

        Commands::Cycles => {
            if snapshot.cyclic_groups.is_empty() {
                println!("✅ No reference cycles ({} types)", snapshot.len());
            } else {
                println!("❌ {} cyclic group(s):", snapshot.cyclic_groups.len());
                for group in &snapshot.cyclic_groups {
                    println!("  └─ {}", group.join(" ↔ "));
                }
            }
            Ok(())
        }
    }
}
