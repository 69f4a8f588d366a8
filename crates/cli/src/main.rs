use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};

use hotelpress::modules::publishing::document::{build_document, compose_title, ArticleInput};
use hotelpress::modules::publishing::lookup::parse_search_response;
use hotelpress::modules::publishing::models::TemplateVersion;
use hotelpress_kernel::Settings;

#[derive(Parser)]
#[clap(author, version, about = "Operator tools for hotelpress", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the layered configuration and report missing publishing settings.
    CheckConfig,
    /// Render an article offline from a saved affiliate search response.
    Preview {
        /// JSON file holding an affiliate search response.
        #[clap(long, value_parser)]
        hotel: PathBuf,
        #[clap(long)]
        keyword: String,
        /// short, long or random (aliases v1, v2, 1, 2 accepted).
        #[clap(long, default_value = "long")]
        version: String,
        /// Seed for title and template choice.
        #[clap(long)]
        seed: Option<u64>,
        /// Affiliate link; defaults to the record's landing URL.
        #[clap(long)]
        link: Option<String>,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    // stdout carries command output only.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init()
        .ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::CheckConfig => check_config(),
        Commands::Preview {
            hotel,
            keyword,
            version,
            seed,
            link,
        } => {
            preview(&hotel, &keyword, &version, seed, link)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn check_config() -> anyhow::Result<ExitCode> {
    let settings = Settings::load().context("failed to load hotelpress settings")?;
    tracing::debug!(env = ?settings.environment, "settings loaded");

    let missing = settings.missing_publishing_settings();
    if missing.is_empty() {
        println!("configuration complete ({:?})", settings.environment);
        return Ok(ExitCode::SUCCESS);
    }

    println!("missing required settings:");
    for name in &missing {
        println!("  {name}");
    }
    Ok(ExitCode::FAILURE)
}

fn preview(
    path: &Path,
    keyword: &str,
    version: &str,
    seed: Option<u64>,
    link: Option<String>,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let response: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let hotel = parse_search_response(&response)
        .with_context(|| format!("{} holds no usable hotel", path.display()))?;

    let version = TemplateVersion::parse(version)
        .ok_or_else(|| anyhow!("unknown template version '{version}'"))?;
    let affiliate_link = link
        .or_else(|| hotel.landing_url.clone())
        .ok_or_else(|| anyhow!("record has no landing URL; pass --link"))?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let layout = version.resolve(&mut rng);
    let title = compose_title(keyword, &hotel, &mut rng);
    let document = build_document(
        &ArticleInput {
            keyword,
            hotel: &hotel,
            affiliate_link: &affiliate_link,
        },
        layout,
    );

    tracing::info!(?layout, hotel = %hotel.name, "article rendered");
    println!("{title}");
    println!();
    println!("{document}");
    Ok(())
}
