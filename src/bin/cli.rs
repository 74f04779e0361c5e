//! Component I: the CLI entry point.
//!
//! Parses the flags spec.md §6 names (root taxon id, upward/downward
//! pass selection) plus the ambient flags this corpus's tools carry
//! around every core (config file, backend connection, page size,
//! verbosity, dry-run), resolves them against an optional TOML config
//! file via [`taxafill::config`], builds an [`taxafill::backend::HttpBackendAdapter`],
//! and runs the requested passes.

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use taxafill::backend::{BackendAdapter, DryRunBackendAdapter, HttpBackendAdapter};
use taxafill::config::{self, CliOverrides, FileConfig, PassSelection};
use taxafill::model::AttributeTypeTable;
use taxafill::FillError;

/// Bidirectional tree-traversal engine that fills in derived taxonomic
/// attribute summaries.
#[derive(Parser, Debug)]
#[command(name = "taxafill", author, version, about, long_about = None)]
struct Args {
    /// Taxon id to root the run at.
    root: Option<String>,

    /// Run only the upward (tips-to-root) pass.
    #[arg(long)]
    ancestors: bool,

    /// Run only the downward (root-to-tips) pass.
    #[arg(long)]
    descendants: bool,

    /// Run both passes (the default when neither flag above is given).
    #[arg(long)]
    both: bool,

    /// Path to a JSON file holding the prebuilt attribute type table
    /// (spec.md §1: schema/type templates are out of scope here; this
    /// core only ever consumes an already-built table).
    #[arg(long, value_name = "PATH")]
    type_table: PathBuf,

    /// Path to an optional TOML config file layered beneath these flags.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Document store host, e.g. `http://localhost:9200`. Repeatable;
    /// only the first is currently used (spec.md §9 future work).
    #[arg(long = "es-host", env = "TAXAFILL_ES_HOSTS", value_name = "URL")]
    es_hosts: Vec<String>,

    /// Document store index name.
    #[arg(long, env = "TAXAFILL_INDEX", value_name = "NAME")]
    index: Option<String>,

    /// Page size hint for streaming backend queries.
    #[arg(long, value_name = "N")]
    page_size: Option<usize>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,

    /// Run the selected passes and log planned updates without
    /// submitting them.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    taxafill::logging::init(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("taxafill: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), FillError> {
    let config_path = args.config.clone().or_else(|| {
        let default = config::default_config_path()?;
        default.is_file().then_some(default)
    });
    let file = config_path.as_deref().map(FileConfig::load).transpose()?;

    let passes = if args.both {
        PassSelection::both()
    } else {
        PassSelection {
            upward: args.ancestors,
            downward: args.descendants,
        }
    };

    let run_config = config::resolve(
        file,
        CliOverrides {
            root: args.root,
            passes,
            page_size: args.page_size,
            es_hosts: args.es_hosts,
            index: args.index,
            dry_run: args.dry_run,
        },
    )?;

    let table_json = std::fs::read_to_string(&args.type_table).map_err(|err| FillError::Config {
        detail: format!(
            "failed to read attribute type table {}: {err}",
            args.type_table.display()
        ),
    })?;
    let table = AttributeTypeTable::from_json_str(&table_json).map_err(|err| FillError::Config {
        detail: format!("failed to parse attribute type table: {err}"),
    })?;

    let http_adapter = HttpBackendAdapter::new(run_config.backend.http_backend_config());

    let spinner = run_spinner(&run_config.root);
    let report = if run_config.dry_run {
        let adapter = DryRunBackendAdapter::new(http_adapter);
        taxafill::run(&adapter as &dyn BackendAdapter, &table, &run_config).await?
    } else {
        taxafill::run(&http_adapter as &dyn BackendAdapter, &table, &run_config).await?
    };
    spinner.finish_and_clear();

    println!("{} {report}", style("done:").bold().green());
    Ok(())
}

fn run_spinner(root: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("filling attributes under {root}"));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}
