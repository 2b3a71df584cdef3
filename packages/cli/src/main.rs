#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the route equity toolchain.
//!
//! Every command works on one region (see `route_equity regions`) whose
//! data files are resolved against `--data-dir`. Reports are printed as
//! text, or as JSON with `--json`.
//!
//! Uses `indicatif-log-bridge` (via [`route_equity_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and bootstrap progress bars never fight for the terminal.

mod region;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use route_equity_attribution::hmi::HmiOptions;
use route_equity_attribution::report::route_set_report;
use route_equity_bootstrap::random::SeededRandom;
use route_equity_bootstrap::{BootstrapOptions, DEFAULT_ALPHA, DEFAULT_ITERATIONS};
use route_equity_cli_utils::{files_progress, iterations_progress, progress_bars_enabled};
use route_equity_geography::grid::GridIndex;
use route_equity_route_models::RouteSet;
use route_equity_routes::changed::count_changed_routes;
use route_equity_routes::load::{RouteColumns, read_route_set};
use route_equity_routes::overlap::distance_overlap;
use route_equity_significance::EngineStage;
use route_equity_significance::engine::{EngineOptions, SegmentDifferenceEngine};
use route_equity_significance::geojson_io::{read_geojson, write_geojson};
use route_equity_significance::traffic::{TrafficHmi, segment_traffic_report};
use serde::Serialize;

use crate::region::{RegionConfig, all_regions, find_region, load_region_data, load_tracts};

#[derive(Parser)]
#[command(name = "route_equity", about = "Route equity analysis toolchain")]
struct Cli {
    /// Region identifier (e.g., "sf", "nyc")
    #[arg(long, global = true, default_value = "sf")]
    region: String,
    /// Region definition TOML to use instead of a built-in region
    #[arg(long, global = true)]
    region_file: Option<PathBuf>,
    /// Directory the region's data paths are relative to
    #[arg(long, global = true, default_value = ".")]
    data_dir: PathBuf,
    /// Number of bootstrap iterations
    #[arg(long, global = true, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,
    /// Significance level; 0.01 gives a 99% interval
    #[arg(long, global = true, default_value_t = DEFAULT_ALPHA)]
    alpha: f64,
    /// Seed for bootstrap resampling. A random seed is chosen and logged
    /// when omitted.
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Worker threads for bootstrap iterations (defaults to one per core)
    #[arg(long, global = true)]
    threads: Option<usize>,
    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in regions
    Regions,
    /// Derive the grid cell to tract table from the tract boundaries
    BuildGrid {
        /// Where to write the `x,y,ctidx` CSV
        #[arg(long)]
        output: PathBuf,
    },
    /// Tract entropy and weighted HMI of one or more route sets
    Hmi {
        /// Routing CSVs, one per algorithm
        #[arg(required = true)]
        routes: Vec<PathBuf>,
        /// Baseline routing CSV. Only routes whose travel time differs
        /// from it are attributed.
        #[arg(long)]
        baseline: Option<PathBuf>,
        /// Attribute every route even when a baseline is given
        #[arg(long)]
        all_routes: bool,
    },
    /// Find segments whose usage differs significantly between two route sets
    Segments {
        /// First routing CSV (positive differences mean more use here)
        a: PathBuf,
        /// Second routing CSV
        b: PathBuf,
        /// Where to write the segment `GeoJSON`
        #[arg(long)]
        output: PathBuf,
        /// Keep routes whose travel times are identical in both sets
        #[arg(long)]
        all_routes: bool,
        /// Only write significant segments
        #[arg(long)]
        significant_only: bool,
    },
    /// Weighted HMI of the tracts gaining or losing traffic
    SegmentHmi {
        /// Segment `GeoJSON` written by `segments`
        segments: PathBuf,
    },
    /// Mean proportion of distance shared by the same route across sets
    Overlap {
        /// Two or more routing CSVs
        #[arg(required = true, num_args = 2..)]
        routes: Vec<PathBuf>,
    },
    /// Count routes whose travel time changed relative to a baseline
    ChangedRoutes {
        baseline: PathBuf,
        comparison: PathBuf,
    },
}

#[allow(clippy::too_many_lines)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = route_equity_cli_utils::init_logger();
    let cli = Cli::parse();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    let bootstrap = BootstrapOptions {
        iterations: cli.iterations,
        alpha: cli.alpha,
    };
    bootstrap.validate()?;
    let bars = !cli.json && progress_bars_enabled();

    match &cli.command {
        Commands::Regions => {
            let regions = all_regions()?;
            if cli.json {
                print_json(&regions)?;
            } else {
                println!("{:<8} NAME", "ID");
                println!("{}", "-".repeat(40));
                for region in &regions {
                    println!("{:<8} {}", region.id, region.name);
                }
            }
        }
        Commands::BuildGrid { output } => {
            let region = resolve_region(&cli)?;
            let tracts = load_tracts(&region, &cli.data_dir)?;
            let grid = GridIndex::build(&tracts);
            grid.write_csv(File::create(output)?)?;
            log::info!("Wrote {} grid cells to {}", grid.len(), output.display());
        }
        Commands::Hmi {
            routes,
            baseline,
            all_routes,
        } => {
            let region = resolve_region(&cli)?;
            let data = load_region_data(&region, &cli.data_dir)?;
            let baseline = match baseline {
                Some(path) if !all_routes => Some(load_routes(path)?),
                _ => None,
            };
            let random = seeded_random(cli.seed);

            let files = files_progress(&multi, bars, "Route sets", routes.len() as u64);
            let mut reports = Vec::with_capacity(routes.len());
            for path in routes {
                let set = load_routes(path)?;
                files.set_message(format!("Route sets ({})", set.label));
                let progress = iterations_progress(
                    &multi,
                    bars,
                    &format!("{} HMI", set.label),
                    bootstrap.iterations,
                );
                let report = route_set_report(
                    &set,
                    baseline.as_ref(),
                    &data.grid,
                    &data.income,
                    HmiOptions::Bootstrap {
                        options: bootstrap,
                        random: &random,
                        progress: progress.as_ref(),
                    },
                )?;

                if !cli.json {
                    println!(
                        "{}: {} routes processed, {} skipped",
                        report.label, report.routes_processed, report.routes_skipped
                    );
                    println!("\tCensus tract entropy: {:.4}", report.entropy);
                    println!(
                        "\tWeighted census tract mean HMI: {:.3} [{}-{}]",
                        report.hmi.mean,
                        format_bound(report.hmi.lower_bound),
                        format_bound(report.hmi.upper_bound)
                    );
                }
                reports.push(report);
                files.inc(1);
            }
            files.finish(format!("{} route sets", reports.len()));
            if cli.json {
                print_json(&reports)?;
            }
        }
        Commands::Segments {
            a,
            b,
            output,
            all_routes,
            significant_only,
        } => {
            log::info!("{}: {} and {}", EngineStage::Loading, a.display(), b.display());
            let set_a = load_routes(a)?;
            let set_b = load_routes(b)?;
            let random = seeded_random(cli.seed);
            let progress =
                iterations_progress(&multi, bars, "Segment bootstrap", bootstrap.iterations);

            let engine = SegmentDifferenceEngine::new(
                EngineOptions {
                    bootstrap,
                    only_different: !all_routes,
                },
                &random,
                progress.as_ref(),
            );
            let report = engine.run(&set_a, &set_b)?;
            write_geojson(
                BufWriter::new(File::create(output)?),
                &report.segments,
                *significant_only,
            )?;

            let summary = report.summary();
            if cli.json {
                print_json(&summary)?;
            } else {
                println!(
                    "{} vs {}: {} routes compared ({} unchanged dropped)",
                    summary.label_a,
                    summary.label_b,
                    summary.pairing.retained,
                    summary.pairing.unchanged
                );
                println!(
                    "\t{} of {} segments significant: {} more in {}, {} more in {}",
                    summary.significant,
                    summary.segments,
                    summary.more_in_a,
                    summary.label_a,
                    summary.more_in_b,
                    summary.label_b
                );
            }
        }
        Commands::SegmentHmi { segments } => {
            let region = resolve_region(&cli)?;
            let data = load_region_data(&region, &cli.data_dir)?;
            let segments = read_geojson(&fs::read_to_string(segments)?)?;
            let report = segment_traffic_report(&segments, &data.grid, &data.income);

            if cli.json {
                print_json(&report)?;
            } else {
                println!(
                    "{} significant segments processed, {} skipped",
                    report.segments_processed, report.segments_skipped
                );
                println!("\tMore traffic: {}", format_traffic(report.more_traffic.as_ref()));
                println!("\tLess traffic: {}", format_traffic(report.less_traffic.as_ref()));
            }
        }
        Commands::Overlap { routes } => {
            let sets = routes
                .iter()
                .map(|path| load_routes(path))
                .collect::<Result<Vec<_>, _>>()?;
            let summary = distance_overlap(&sets.iter().collect::<Vec<_>>())?;

            if cli.json {
                print_json(&summary)?;
            } else {
                println!(
                    "{} shared routes ({} with no length): mean overlap {:.3}",
                    summary.shared_routes, summary.zero_length_routes, summary.mean_overlap
                );
            }
        }
        Commands::ChangedRoutes {
            baseline,
            comparison,
        } => {
            let baseline = load_routes(baseline)?;
            let comparison = load_routes(comparison)?;
            let summary = count_changed_routes(&baseline, &comparison);

            if cli.json {
                print_json(&summary)?;
            } else {
                println!(
                    "{}: {} of {} valid routes changed from {} ({} without a valid baseline)",
                    comparison.label,
                    summary.changed,
                    summary.comparison_valid,
                    baseline.label,
                    summary.comparison_skipped
                );
            }
        }
    }

    Ok(())
}

fn resolve_region(cli: &Cli) -> Result<RegionConfig, region::RegionError> {
    let region = match &cli.region_file {
        Some(path) => RegionConfig::from_file(path)?,
        None => find_region(&cli.region)?,
    };
    log::info!("Region: {} ({})", region.name, region.id);
    Ok(region)
}

fn seeded_random(seed: Option<u64>) -> SeededRandom {
    let random = seed.map_or_else(SeededRandom::from_entropy, SeededRandom::new);
    log::info!("Bootstrap seed: {}", random.seed());
    random
}

/// Loads a routing CSV labeled by its file stem.
fn load_routes(path: &Path) -> Result<RouteSet, Box<dyn std::error::Error>> {
    let label = path.file_stem().map_or_else(
        || path.display().to_string(),
        |stem| stem.to_string_lossy().into_owned(),
    );
    let (set, report) = read_route_set(File::open(path)?, &label, &RouteColumns::default())?;
    log::info!(
        "{label}: {} of {} rows loaded, {} failed, {} replaced",
        report.loaded,
        report.rows,
        report.failed,
        report.replaced
    );
    Ok(set)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_bound(bound: Option<f64>) -> String {
    bound.map_or_else(|| "-".to_string(), |b| format!("{b:.3}"))
}

fn format_traffic(side: Option<&TrafficHmi>) -> String {
    side.map_or_else(
        || "no segments".to_string(),
        |side| {
            format!(
                "HMI {:.3} [{:.3}-{:.3}] over {} segments",
                side.hmi, side.lower, side.upper, side.segments
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "route_equity",
            "segments",
            "fast.csv",
            "safe.csv",
            "--output",
            "out.geojson",
            "--iterations",
            "50",
            "--seed",
            "7",
            "--significant-only",
        ])
        .unwrap();

        assert_eq!(cli.iterations, 50);
        assert_eq!(cli.seed, Some(7));
        assert!((cli.alpha - 0.01).abs() < f64::EPSILON);
        assert!(matches!(
            cli.command,
            Commands::Segments {
                significant_only: true,
                all_routes: false,
                ..
            }
        ));
    }

    #[test]
    fn overlap_needs_two_files() {
        assert!(Cli::try_parse_from(["route_equity", "overlap", "a.csv"]).is_err());
        assert!(Cli::try_parse_from(["route_equity", "overlap", "a.csv", "b.csv"]).is_ok());
    }

    #[test]
    fn formats_missing_bounds_and_sides() {
        assert_eq!(format_bound(None), "-");
        assert_eq!(format_bound(Some(12.345_6)), "12.346");
        assert_eq!(format_traffic(None), "no segments");
    }
}
