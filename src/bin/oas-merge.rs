//! oas-merge CLI
//!
//! Command-line interface for flattening multi-file API descriptions.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use oas_merge::{discover, load_document, merge, MergeConfig};

#[derive(Parser)]
#[command(name = "oas-merge")]
#[command(about = "Flatten a multi-file API description into one document")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every reference and include directive and print the
    /// flattened document
    Merge {
        /// Root document (YAML or JSON)
        spec: PathBuf,

        /// Settings file with class rules and reference policy
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: Format,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List every shared component the document graph would produce,
    /// with its final name
    Components {
        /// Root document (YAML or JSON)
        spec: PathBuf,

        /// Settings file with class rules and reference policy
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Merge {
            spec,
            config,
            output,
            format,
            pretty,
        } => run_merge(&spec, config.as_deref(), output, format, pretty),

        Commands::Components { spec, config, json } => {
            run_components(&spec, config.as_deref(), json)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&std::path::Path>) -> Result<MergeConfig, u8> {
    match path {
        Some(path) => MergeConfig::load(path).map_err(|e| {
            eprintln!("Error loading config: {}", e);
            e.exit_code() as u8
        }),
        None => Ok(MergeConfig::default()),
    }
}

fn run_merge(
    spec: &std::path::Path,
    config: Option<&std::path::Path>,
    output: Option<PathBuf>,
    format: Format,
    pretty: bool,
) -> Result<(), u8> {
    let config = load_config(config)?;

    let root = load_document(spec).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let merged = merge(&root, spec, &config).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let rendered = match format {
        Format::Json if pretty => serde_json::to_string_pretty(&merged).map_err(|e| e.to_string()),
        Format::Json => serde_json::to_string(&merged).map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::to_string(&merged).map_err(|e| e.to_string()),
    }
    .map_err(|message| {
        eprintln!("Error serializing output: {}", message);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", rendered.trim_end());
        }
    }

    Ok(())
}

fn run_components(
    spec: &std::path::Path,
    config: Option<&std::path::Path>,
    json: bool,
) -> Result<(), u8> {
    let config = load_config(config)?;

    let root = load_document(spec).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let components = discover(&root, spec, &config).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&components).unwrap());
    } else if components.is_empty() {
        println!("No shared components.");
    } else {
        for component in &components {
            println!(
                "{}/{}  <-  {}",
                component.class, component.name, component.target
            );
        }
    }

    Ok(())
}
