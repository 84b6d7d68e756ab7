#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for listing active building permits.
//!
//! Builds the SoQL filter for a dataset's status exclusions and a
//! bounding box, runs the count-then-fetch query, and prints the permits
//! as a table followed by the total match count.
//!
//! The Socrata app token is read from `APP_TOKEN`. Without it requests
//! are unauthenticated and rate limited.

mod table;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use permit_map_cli_utils::{MultiProgress, init_logger, phase_spinner};
use permit_map_permit_models::{BoundingBox, GeoCoordinate, StatusExclusionSet};
use permit_map_socrata::registry::{self, DEFAULT_DATASET_ID, DatasetDefinition};
use permit_map_socrata::{ClientConfig, OpenDataClient, SocrataError};

#[derive(Parser)]
#[command(
    name = "permit_map",
    about = "List active building permits inside a bounding box"
)]
struct Cli {
    /// Dataset identifier (see `--datasets`)
    #[arg(long, default_value = DEFAULT_DATASET_ID)]
    dataset: String,
    /// Maximum number of permits to fetch (defaults to the dataset's page size)
    #[arg(long)]
    limit: Option<u64>,
    /// Northwest corner latitude
    #[arg(long, allow_negative_numbers = true)]
    nw_lat: Option<f64>,
    /// Northwest corner longitude
    #[arg(long, allow_negative_numbers = true)]
    nw_lon: Option<f64>,
    /// Southeast corner latitude
    #[arg(long, allow_negative_numbers = true)]
    se_lat: Option<f64>,
    /// Southeast corner longitude
    #[arg(long, allow_negative_numbers = true)]
    se_lon: Option<f64>,
    /// Comma-separated statuses to exclude (overrides the dataset's list)
    #[arg(long, value_delimiter = ',')]
    exclude: Option<Vec<String>>,
    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,
    /// Socrata application token
    #[arg(long, env = "APP_TOKEN", hide_env_values = true)]
    app_token: Option<String>,
    /// List configured datasets and exit
    #[arg(long)]
    datasets: bool,
    /// Print the SoQL filter and exit without querying
    #[arg(long)]
    filter_only: bool,
}

impl Cli {
    /// Region from the four corner flags, or `None` when none are given.
    fn bbox(&self) -> Result<Option<BoundingBox>, SocrataError> {
        match (self.nw_lat, self.nw_lon, self.se_lat, self.se_lon) {
            (Some(nw_lat), Some(nw_lon), Some(se_lat), Some(se_lon)) => Ok(Some(BoundingBox::new(
                GeoCoordinate::new(nw_lat, nw_lon),
                GeoCoordinate::new(se_lat, se_lon),
            ))),
            (None, None, None, None) => Ok(None),
            _ => Err(SocrataError::configuration(
                "--nw-lat, --nw-lon, --se-lat and --se-lon must be given together",
            )),
        }
    }

    fn exclusions(&self) -> Result<Option<StatusExclusionSet>, SocrataError> {
        self.exclude
            .as_ref()
            .map(|labels| {
                let labels = labels
                    .iter()
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty())
                    .map(String::from);
                StatusExclusionSet::new(labels).map_err(SocrataError::from)
            })
            .transpose()
    }
}

fn print_datasets() {
    let datasets = registry::all_datasets();
    println!("{:<28} NAME", "ID");
    println!("{}", "-".repeat(60));
    for dataset in &datasets {
        println!("{:<28} {}", dataset.id, dataset.name);
    }
}

async fn run(cli: Cli, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let dataset: DatasetDefinition = registry::find_dataset(&cli.dataset).ok_or_else(|| {
        format!(
            "Unknown dataset '{}'. Use --datasets to list them.",
            cli.dataset
        )
    })?;

    let exclusions = cli.exclusions()?.unwrap_or_else(|| dataset.exclusions.clone());
    let bbox = cli.bbox()?.unwrap_or(dataset.bbox);
    let filter = dataset.filter(&exclusions, &bbox);

    if cli.filter_only {
        println!("{filter}");
        return Ok(());
    }

    let limit = cli.limit.unwrap_or(dataset.limit);
    log::info!("Querying {} (limit {limit})", dataset.name);
    log::debug!("Filter: {filter}");

    let config = ClientConfig::new(dataset.endpoint.clone())
        .with_app_token(cli.app_token.clone())
        .with_timeout(Duration::from_secs(cli.timeout_secs));
    let client = OpenDataClient::new(config)?;

    let spinner = phase_spinner(multi, &format!("Querying {}", dataset.name));
    let result = client.fetch_permits(&filter, limit).await;
    spinner.finish_and_clear();

    let result = result?;
    table::print(&result);

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let multi = init_logger();
    let cli = Cli::parse();

    if cli.datasets {
        print_datasets();
        return ExitCode::SUCCESS;
    }

    exit_code(run(cli, &multi).await)
}

/// Logs a failed run once and maps it to a non-zero exit status.
fn exit_code(result: Result<(), Box<dyn std::error::Error>>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
