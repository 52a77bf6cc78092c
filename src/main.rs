use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fhir::Bundle;
use hip_core::{ConfigOrganizationResolver, OrgConfig, PrescriptionGenerator, load_drug_orders};

#[derive(Parser)]
#[command(name = "hip")]
#[command(about = "HIP prescription document generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a prescription document from an EMR export
    Generate {
        /// EMR export (JSON with `encounter` and `drugOrders`)
        export: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Check that a document bundle's references resolve
    Check {
        /// Bundle JSON file
        bundle: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

/// Entry point for the `hip` command line tool.
///
/// # Environment Variables
/// - `HIP_FACILITY_ID`, `HIP_FACILITY_NAME`, `HIP_FACILITY_SYSTEM`: facility identity
/// - `HIP_BASE_URL`: base URL for bundle and composition identifiers (required by `generate`)
/// - `HIP_CARE_CONTEXT_TYPE`: `visit` (default) or `program`
/// - `RUST_LOG`: log filter (default: `hip=info`)
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("hip=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            export,
            format,
            output,
        } => {
            let config = OrgConfig::from_lookup(|key| std::env::var(key).ok())?;
            generate(&export, format, output.as_deref(), config)
        }
        Commands::Check { bundle } => check(&bundle),
    }
}

fn generate(
    export: &Path,
    format: Format,
    output: Option<&Path>,
    config: OrgConfig,
) -> anyhow::Result<()> {
    let drug_orders = load_drug_orders(export)
        .with_context(|| format!("loading EMR export {}", export.display()))?;

    let organization = ConfigOrganizationResolver::new(config);
    let prescription = PrescriptionGenerator::new().generate(&drug_orders, &organization)?;

    tracing::info!(
        care_context = %prescription.care_context.care_context_reference,
        name = %prescription.care_context.care_context_name,
        "care context resolved"
    );

    let rendered = match format {
        Format::Json => prescription.bundle.to_json_pretty()?,
        Format::Yaml => prescription.bundle.to_yaml()?,
    };

    match output {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "prescription written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn check(path: &Path) -> anyhow::Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let bundle = Bundle::parse_json(&text)?;

    if bundle.composition().is_none() {
        bail!("first entry of {} is not a Composition", path.display());
    }

    let unresolved = bundle.unresolved_references();
    if unresolved.is_empty() {
        let name = bundle
            .identifier
            .value
            .as_deref()
            .unwrap_or_else(|| path.to_str().unwrap_or("bundle"));
        println!(
            "{name}: {} entries, all references resolve",
            bundle.entries().len()
        );
        return Ok(());
    }

    for u in &unresolved {
        let json = serde_json::to_string(&u.reference)?;
        println!("entry[{}]: unresolved {json}", u.entry_index);
    }
    bail!("{} unresolved reference(s)", unresolved.len())
}
