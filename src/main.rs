//! tocmap: locate every section of a table of contents in extracted text.
#![allow(clippy::multiple_crate_versions)]

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tocmap::report::{JsonLines, LogReporter, Reporter};
use tocmap::{config, input, DocumentInput, DocumentResult, Pipeline};

#[derive(Parser)]
#[allow(clippy::struct_excessive_bools)]
#[command(name = "tocmap")]
#[command(about = "Resolve a table of contents against extracted document text", long_about = None)]
struct Args {
    /// Node index files (*.nodes.json, *.toc.md) or directories to scan
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,

    /// Raw text to resolve against instead of each index's sibling file
    #[arg(long, value_name = "FILE")]
    text: Option<PathBuf>,

    /// Fuzzy acceptance threshold
    #[arg(long, value_name = "RATIO")]
    threshold: Option<f64>,

    /// Matching tiers to use, in order
    #[arg(long, value_delimiter = ',', value_name = "TIER")]
    tiers: Vec<String>,

    /// Include each segment's text in the output
    #[arg(long)]
    with_text: bool,

    /// Stream pipeline events to stderr as JSON lines
    #[arg(long)]
    events: bool,

    /// Configuration file to use instead of tocmap.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log each resolved boundary
    #[arg(long, short = 'v', conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(long, short = 'q')]
    quiet: bool,
}

#[derive(Serialize)]
struct SegmentText<'a> {
    node_id: tocmap::NodeId,
    text: &'a str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Output<'a> {
    Resolved {
        index: &'a Path,
        text: &'a Path,
        #[serde(flatten)]
        result: &'a DocumentResult,
        #[serde(skip_serializing_if = "Option::is_none")]
        texts: Option<Vec<SegmentText<'a>>>,
    },
    Failed {
        index: &'a Path,
        error: String,
    },
}

fn init_logging(args: &Args) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else if args.quiet {
        builder.filter_level(log::LevelFilter::Error);
    }
    builder.init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let mut cfg = match &args.config {
        Some(path) => config::Config::load_from(path),
        None => config::Config::load(),
    };

    // Override config with command line args
    if let Some(threshold) = args.threshold {
        cfg.fuzzy_threshold = threshold;
    }
    if !args.tiers.is_empty() {
        cfg.tiers.clone_from(&args.tiers);
    }

    let settings = cfg.settings().context("invalid configuration")?;
    let indexes =
        input::find_indexes(args.paths.clone()).context("failed to collect node indexes")?;
    if indexes.is_empty() {
        bail!("no node indexes found");
    }
    if args.text.is_some() && indexes.len() > 1 {
        bail!("--text can only be used with a single node index");
    }
    let pairs = input::pair_documents(indexes, args.text.as_deref(), &cfg.text_extensions)?;

    let reporter: Arc<dyn Reporter> = if args.events {
        Arc::new(JsonLines::new(io::stderr()))
    } else {
        Arc::new(LogReporter)
    };
    let pipeline = Pipeline::new(settings).with_reporter(reporter);

    let mut documents: Vec<DocumentInput> = Vec::with_capacity(pairs.len());
    for pair in &pairs {
        let document = input::read_document(pair)
            .with_context(|| format!("failed to read {}", pair.index.display()))?;
        documents.push(document);
    }
    let results = pipeline.run_batch(&documents);

    let outputs: Vec<Output> = pairs
        .iter()
        .zip(&results)
        .zip(&documents)
        .map(|((pair, result), document)| match result {
            Ok(result) => Output::Resolved {
                index: &pair.index,
                text: &pair.text,
                result,
                texts: args.with_text.then(|| {
                    result
                        .segments
                        .iter()
                        .map(|segment| SegmentText {
                            node_id: segment.node_id,
                            text: segment.text(&document.raw_text),
                        })
                        .collect()
                }),
            },
            Err(err) => {
                log::error!("{}: {err}", pair.index.display());
                Output::Failed {
                    index: &pair.index,
                    error: err.to_string(),
                }
            }
        })
        .collect();

    let json = serde_json::to_string_pretty(&outputs)?;
    println!("{json}");
    Ok(())
}
