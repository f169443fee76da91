//! jsondocs CLI
//!
//! Command-line interface for loading JSON documents and resolving their
//! references.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jsondocs::{is_url, AutoLoader, DocsError, DocsOptions, JsonDocs};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "jsondocs")]
#[command(about = "Load JSON documents and resolve their JSON References")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a document with every reference resolved
    Resolve {
        /// Document source: file path or URL (http:// or https://)
        source: String,

        /// Print only the value at this fragment (JSON Pointer or id)
        #[arg(long, short)]
        pointer: Option<String>,

        /// Reject non-root ids that are not simple names
        #[arg(long)]
        strict_ids: bool,

        /// Refuse to fetch referenced documents over HTTP
        #[arg(long)]
        no_remote: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List every document loaded for a source, with its ids
    Inspect {
        /// Document source: file path or URL (http:// or https://)
        source: String,

        /// Reject non-root ids that are not simple names
        #[arg(long)]
        strict_ids: bool,

        /// Refuse to fetch referenced documents over HTTP
        #[arg(long)]
        no_remote: bool,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve {
            source,
            pointer,
            strict_ids,
            no_remote,
            output,
            pretty,
        } => run_resolve(ResolveArgs {
            source,
            pointer,
            strict_ids,
            no_remote,
            output,
            pretty,
        }),

        Commands::Inspect {
            source,
            strict_ids,
            no_remote,
            json,
        } => run_inspect(&source, strict_ids, no_remote, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Turn a path or URL argument into an absolute URI.
fn source_uri(source: &str) -> Result<Url, u8> {
    if is_url(source) || source.starts_with("file:") {
        return Url::parse(source).map_err(|e| {
            eprintln!("Error: invalid URI '{}': {}", source, e);
            2u8
        });
    }

    let path = Path::new(source);
    let absolute = path.canonicalize().map_err(|_| {
        eprintln!("Error: file not found: {}", path.display());
        3u8
    })?;
    Url::from_file_path(&absolute).map_err(|()| {
        eprintln!("Error: cannot turn {} into a URI", absolute.display());
        2u8
    })
}

fn open_docs(strict_ids: bool, no_remote: bool) -> Result<JsonDocs, u8> {
    let options = DocsOptions::new().strict_ids(strict_ids);
    let loader = if no_remote {
        AutoLoader::local()
    } else {
        remote_loader()?
    };
    Ok(JsonDocs::with_options(loader, options))
}

#[cfg(feature = "remote")]
fn remote_loader() -> Result<AutoLoader, u8> {
    AutoLoader::remote().map_err(|e| report(&e))
}

#[cfg(not(feature = "remote"))]
fn remote_loader() -> Result<AutoLoader, u8> {
    Ok(AutoLoader::local())
}

fn report(e: &DocsError) -> u8 {
    eprintln!("Error: {}", e);
    e.exit_code() as u8
}

struct ResolveArgs {
    source: String,
    pointer: Option<String>,
    strict_ids: bool,
    no_remote: bool,
    output: Option<PathBuf>,
    pretty: bool,
}

fn run_resolve(args: ResolveArgs) -> Result<(), u8> {
    let ResolveArgs {
        source,
        pointer,
        strict_ids,
        no_remote,
        output,
        pretty,
    } = args;

    let uri = source_uri(&source)?;
    let mut docs = open_docs(strict_ids, no_remote)?;
    let root = docs.load_uri(uri.as_str()).map_err(|e| report(&e))?;

    let target = match pointer {
        Some(fragment) => {
            let mut target = uri.clone();
            target.set_fragment(Some(fragment.trim_start_matches('#')));
            docs.pointer(target.as_str(), false)
                .map_err(|e| report(&e))?
        }
        None => root,
    };

    let value = docs.to_value(target).map_err(|e| report(&e))?;

    let json_output = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct DocumentSummary {
    uri: String,
    ids: Vec<String>,
    source_bytes: usize,
}

fn run_inspect(source: &str, strict_ids: bool, no_remote: bool, json: bool) -> Result<(), u8> {
    let uri = source_uri(source)?;
    let mut docs = open_docs(strict_ids, no_remote)?;
    docs.load_uri(uri.as_str()).map_err(|e| report(&e))?;

    let summaries: Vec<DocumentSummary> = docs
        .iter()
        .map(|(uri, doc)| {
            let mut ids: Vec<String> = doc.identities().keys().cloned().collect();
            ids.sort();
            DocumentSummary {
                uri: uri.to_string(),
                ids,
                source_bytes: doc.source().len(),
            }
        })
        .collect();

    if json {
        let output = serde_json::to_string_pretty(&summaries).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", output);
    } else {
        println!("{} document(s) loaded", summaries.len());
        for summary in &summaries {
            println!("  {}", summary.uri);
            if !summary.ids.is_empty() {
                println!("    ids: {}", summary.ids.join(", "));
            }
        }
    }

    Ok(())
}
