//! values-extract command-line tool
//!
//! Factors sibling `values.yaml` files into a shared parent document and
//! per-directory remainders.
//!
//! ## Configuration
//!
//! Options are layered, later sources winning:
//! - defaults
//! - `--config <FILE>`: YAML or JSON document with `ExtractOptions` fields
//! - `VALUES_EXTRACT_INCLUDE_EQUAL_LISTS`: `true`/`false`
//! - `--exclude-equal-lists`
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (default: values_extract=info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: pretty)
//!
//! ## Usage
//!
//! ```bash
//! values-extract extract apps/a/values.yaml apps/b/values.yaml
//! values-extract recursive deploy/ --json
//! values-extract merge base.yaml overlay.yaml
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use values_extract::{
    extract_common_n_yaml, merge_all, Codec, ExtractOptions, FilesError, OsFilesystem,
    TreeValue, ValuesFiles, YamlCodec,
};

#[derive(Debug, Parser)]
#[command(name = "values-extract", version, about = "Factor common values out of sibling values.yaml files")]
struct Cli {
    /// Options file (YAML or JSON).
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Leave sequences that are equal everywhere in each remainder.
    #[arg(long, global = true)]
    exclude_equal_lists: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract the common values of two sibling files into their parent.
    Extract {
        /// First values.yaml.
        a: PathBuf,
        /// Second values.yaml.
        b: PathBuf,
    },
    /// Extract the common values of N sibling files into their parent.
    ExtractN {
        /// Sibling values.yaml files.
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,
    },
    /// Propagate common values bottom-up through a directory tree.
    Recursive {
        /// Root of the tree.
        root: PathBuf,
        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Merge documents left to right and print the result.
    Merge {
        /// Documents, later ones overriding earlier ones.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the common values of documents without writing anything.
    Common {
        /// Documents to compare.
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,
    },
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "values_extract=info".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
    }
}

fn load_options(cli: &Cli) -> Result<ExtractOptions, Box<dyn std::error::Error>> {
    let mut options = match &cli.config {
        Some(path) => {
            let bytes = std::fs::read(path)
                .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
            ExtractOptions::from_config(&bytes)
                .map_err(|e| format!("invalid config {}: {e}", path.display()))?
        }
        None => ExtractOptions::default(),
    };
    options = options.with_env_overrides();
    if cli.exclude_equal_lists {
        options = options.with_include_equal_lists_in_common(false);
    }
    Ok(options)
}

fn read_document(path: &Path) -> Result<TreeValue, Box<dyn std::error::Error>> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    Ok(YamlCodec
        .parse(&bytes)
        .map_err(|e| format!("failed to parse {}: {e}", path.display()))?)
}

fn report_written(result: Result<PathBuf, FilesError>) -> Result<(), Box<dyn std::error::Error>> {
    match result {
        Ok(path) => {
            println!("{}", path.display());
            Ok(())
        }
        Err(e) if e.is_no_common() => {
            info!("No common values found, files left unchanged");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let options = load_options(&cli)?;
    info!(
        include_equal_lists_in_common = options.include_equal_lists_in_common,
        "Loaded options"
    );
    let files = ValuesFiles::new(OsFilesystem::new()).with_options(options);

    match cli.command {
        Command::Extract { a, b } => report_written(files.extract_common(a, b)),
        Command::ExtractN { paths } => report_written(files.extract_common_n(paths.as_slice())),
        Command::Recursive { root, json } => {
            let report = files.extract_common_recursive_report(root)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for path in &report.created {
                    println!("{}", path.display());
                }
            }
            Ok(())
        }
        Command::Merge { files: paths } => {
            let layers = paths
                .iter()
                .map(|p| read_document(p))
                .collect::<Result<Vec<_>, _>>()?;
            let merged = merge_all(&layers);
            print!("{}", String::from_utf8(YamlCodec.serialize(&merged)?)?);
            Ok(())
        }
        Command::Common { files: paths } => {
            let docs = paths
                .iter()
                .map(std::fs::read)
                .collect::<Result<Vec<_>, _>>()?;
            let out = extract_common_n_yaml(docs.as_slice(), &options)?;
            print!("{}", String::from_utf8(out.common)?);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extract_n_needs_two_paths() {
        assert!(Cli::try_parse_from(["values-extract", "extract-n", "a/values.yaml"]).is_err());
        let cli = Cli::try_parse_from([
            "values-extract",
            "extract-n",
            "a/values.yaml",
            "b/values.yaml",
            "--exclude-equal-lists",
        ])
        .unwrap();
        assert!(cli.exclude_equal_lists);
        assert!(matches!(cli.command, Command::ExtractN { ref paths } if paths.len() == 2));
    }
}
