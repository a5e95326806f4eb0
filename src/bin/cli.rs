//! searoute CLI - Debug tool for route extraction, learning and planning
//!
//! Usage:
//!   searoute-cli extract --positions <file> --ports <file> [--vessels <file>] [--out <file>]
//!   searoute-cli train --routes <file>
//!   searoute-cli predict --routes <file> --ports <file> --origin <port> --destination <port>
//!   searoute-cli route --routes <file> --ports <file> --origin <port> --destination <port>
//!   searoute-cli stats --routes <file> --ports <file>
//!
//! All inputs are JSON arrays of the library's serde types. Ports may be
//! named by id or UN/LOCODE.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use searoute::{
    DistanceTrainer, EngineConfig, InMemoryPortDirectory, InMemoryPositionFeed, InMemoryRouteLog,
    Result, RouteLogReader, RouteQuery, RoutingEngine, SeaRouteError, VesselType, VoyageRequest,
    extract_routes,
};

#[derive(Parser)]
#[command(name = "searoute-cli")]
#[command(about = "Debug tool for maritime route learning", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration (JSON); defaults apply to anything omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract port-to-port routes from AIS positions
    Extract {
        /// JSON array of position samples
        #[arg(long)]
        positions: PathBuf,

        /// JSON array of ports
        #[arg(long)]
        ports: PathBuf,

        /// JSON array of voyage requests; defaults to every vessel in the feed
        #[arg(long)]
        vessels: Option<PathBuf>,

        /// Vessel type used when no voyage requests are given
        #[arg(long, default_value = "GENERAL_CARGO")]
        vessel_type: String,

        /// Where to write the extracted routes
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Train the regression distance model
    Train {
        /// JSON array of extracted routes
        #[arg(long)]
        routes: PathBuf,
    },

    /// Predict the sailed distance between two ports
    Predict {
        #[arg(long)]
        routes: PathBuf,
        #[arg(long)]
        ports: PathBuf,
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,
        #[arg(long)]
        vessel_type: Option<String>,
    },

    /// Plan a multi-leg route through observed legs
    Route {
        #[arg(long)]
        routes: PathBuf,
        #[arg(long)]
        ports: PathBuf,
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,
        #[arg(long)]
        vessel_type: Option<String>,
    },

    /// Show graph statistics and hubs
    Stats {
        #[arg(long)]
        routes: PathBuf,
        #[arg(long)]
        ports: PathBuf,

        /// Number of hubs to list
        #[arg(long, default_value = "10")]
        hubs: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("[ERR] {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Extract {
            positions,
            ports,
            vessels,
            vessel_type,
            out,
        } => run_extract(
            &config,
            &positions,
            &ports,
            vessels.as_deref(),
            &vessel_type,
            out.as_deref(),
        ),
        Commands::Train { routes } => run_train(&config, &routes),
        Commands::Predict {
            routes,
            ports,
            origin,
            destination,
            vessel_type,
        } => run_predict(
            config,
            &routes,
            &ports,
            &origin,
            &destination,
            vessel_type.as_deref(),
        ),
        Commands::Route {
            routes,
            ports,
            origin,
            destination,
            vessel_type,
        } => run_route(
            config,
            &routes,
            &ports,
            &origin,
            &destination,
            vessel_type.as_deref(),
        ),
        Commands::Stats {
            routes,
            ports,
            hubs,
        } => run_stats(config, &routes, &ports, hubs),
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}

fn banner(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
}

fn parse_vessel_type(raw: Option<&str>) -> Result<Option<VesselType>> {
    raw.map(VesselType::parse).transpose()
}

fn load_engine(config: EngineConfig, routes: &Path, ports: &Path) -> Result<RoutingEngine> {
    let ports = InMemoryPortDirectory::from_json_str(&fs::read_to_string(ports)?)?;
    let log = InMemoryRouteLog::from_json_str(&fs::read_to_string(routes)?)?;
    println!("Loaded {} ports and {} routes", ports.len(), log.len());

    let engine = RoutingEngine::new(Arc::new(ports), Arc::new(log), config);
    engine.rebuild(now())?;
    Ok(engine)
}

/// Run batch extraction
fn run_extract(
    config: &EngineConfig,
    positions: &Path,
    ports: &Path,
    vessels: Option<&Path>,
    vessel_type: &str,
    out: Option<&Path>,
) -> Result<()> {
    banner("ROUTE EXTRACTION");

    let feed = InMemoryPositionFeed::from_json_str(&fs::read_to_string(positions)?)?;
    let ports = InMemoryPortDirectory::from_json_str(&fs::read_to_string(ports)?)?;

    let requests: Vec<VoyageRequest> = match vessels {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => {
            let vessel_type = VesselType::parse(vessel_type)?;
            feed.vessel_ids()
                .into_iter()
                .filter_map(|id| {
                    feed.time_range(id).map(|w| {
                        VoyageRequest::new(id, vessel_type.clone(), w.start, w.end)
                    })
                })
                .collect()
        }
    };
    println!("  {} vessels, {} ports", requests.len(), ports.len());

    let log = InMemoryRouteLog::new();
    let report = extract_routes(
        &requests,
        &feed,
        &ports,
        &log,
        &config.segment,
        &config.extraction,
        now(),
    );

    println!("\n  Positions:           {}", report.segmentation.input_samples);
    println!("  Outliers removed:    {}", report.segmentation.outliers_removed);
    println!("  Segments:            {}", report.segments);
    println!("  Routes extracted:    {}", report.routes_extracted);
    println!("  Low quality skipped: {}", report.low_quality_skipped);
    for (reason, count) in &report.rejections {
        println!("  Rejected ({}): {}", reason, count);
    }
    for failure in &report.failures {
        println!(
            "  [FAIL] {}: {} ({} routes appended)",
            failure.vessel_id, failure.error, failure.routes_appended
        );
    }

    let json = log.to_json_string()?;
    match out {
        Some(path) => {
            fs::write(path, json)?;
            println!("\nWrote {} routes to {}", log.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Train and print the regression model
fn run_train(config: &EngineConfig, routes: &Path) -> Result<()> {
    banner("DISTANCE MODEL TRAINING");

    let log = InMemoryRouteLog::from_json_str(&fs::read_to_string(routes)?)?;
    let routes = log.routes(&RouteQuery::all())?;
    let model = DistanceTrainer::new(config.trainer.clone()).train(&routes, now())?;

    println!(
        "\n  actual = {:.3} + {:.4} * great_circle",
        model.intercept, model.slope
    );
    println!("  Training routes: {}", model.training_routes);
    println!(
        "  MAE {:.2} nm, max AE {:.2} nm, R² {:.4}",
        model.diagnostics.mean_absolute_error,
        model.diagnostics.max_absolute_error,
        model.diagnostics.r_squared
    );
    println!("\n  Vessel type factors:");
    for (vt, f) in &model.vessel_type_factors {
        println!("    {:<16} {:.3}", vt, f);
    }
    println!("  Route type factors:");
    for (rt, f) in &model.route_type_factors {
        println!("    {:<16} {:.3}", rt, f);
    }
    println!(
        "  High latitude {:.3}, coastal {:.3}, chokepoint {:.3}",
        model.high_latitude_factor, model.coastal_factor, model.chokepoint_factor
    );

    println!("\n{}", serde_json::to_string_pretty(&model)?);
    Ok(())
}

/// Predict a port-to-port distance
fn run_predict(
    config: EngineConfig,
    routes: &Path,
    ports: &Path,
    origin: &str,
    destination: &str,
    vessel_type: Option<&str>,
) -> Result<()> {
    banner("DISTANCE PREDICTION");

    let vessel_type = parse_vessel_type(vessel_type)?;
    let engine = load_engine(config, routes, ports)?;
    let prediction = engine.predict_distance(origin, destination, vessel_type.as_ref())?;

    println!(
        "\n  {} -> {}: {:.1} nm (great circle {:.1} nm, factor {:.3})",
        origin, destination, prediction.predicted_nm, prediction.great_circle_nm, prediction.factor
    );
    println!(
        "  Source: {}, confidence {:.2}, {} observations",
        prediction.source.as_str(),
        prediction.confidence,
        prediction.observations
    );

    match engine.retrain(now()) {
        Ok(_) => {
            if let Some(nm) =
                engine.predict_distance_model(origin, destination, vessel_type.as_ref())?
            {
                println!("  Regression model: {:.1} nm", nm);
            }
        }
        Err(e) if e.is_recoverable() => println!("  Regression model unavailable: {}", e),
        Err(e) => return Err(e),
    }
    Ok(())
}

/// Plan a route
fn run_route(
    config: EngineConfig,
    routes: &Path,
    ports: &Path,
    origin: &str,
    destination: &str,
    vessel_type: Option<&str>,
) -> Result<()> {
    banner("ROUTE PLANNING");

    let vessel_type = parse_vessel_type(vessel_type)?;
    let engine = load_engine(config, routes, ports)?;

    match engine.find_route(origin, destination, vessel_type.as_ref()) {
        Ok(plan) => {
            println!("\n  {}", plan.waypoints.join(" -> "));
            for leg in &plan.legs {
                println!(
                    "    {} -> {}: {:.1} nm, factor {:.3}, confidence {:.2}, {} obs",
                    leg.from_name,
                    leg.to_name,
                    leg.edge.mean_actual_nm,
                    leg.edge.mean_distance_factor,
                    leg.edge.confidence,
                    leg.edge.observations
                );
            }
            println!(
                "  Total {:.1} nm (great circle {:.1} nm), factor {:.3}, confidence {:.2}, cost {:.1}",
                plan.total_distance_nm,
                plan.total_great_circle_nm,
                plan.average_distance_factor,
                plan.average_confidence,
                plan.total_cost
            );
            Ok(())
        }
        Err(e @ SeaRouteError::NoPathFound { .. }) => {
            println!("\n  {}", e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Print graph statistics
fn run_stats(config: EngineConfig, routes: &Path, ports: &Path, hubs: usize) -> Result<()> {
    banner("GRAPH STATISTICS");

    let engine = load_engine(config, routes, ports)?;
    let stats = engine.graph_stats();

    println!("\n  Nodes:                {}", stats.node_count);
    println!("  Edges:                {}", stats.edge_count);
    println!(
        "  Edges per node:       {:.2} (min {}, max {})",
        stats.avg_edges_per_node, stats.min_edges_per_node, stats.max_edges_per_node
    );
    println!("  Coverage:             {:.1}%", stats.coverage * 100.0);
    println!("  Avg edge confidence:  {:.3}", stats.avg_edge_confidence);
    println!("  High confidence:      {}", stats.high_confidence_edges);

    println!("\n  Top hubs:");
    for (rank, hub) in engine.find_hubs(hubs).iter().enumerate() {
        println!(
            "    {:>2}. {} ({}) - {} legs",
            rank + 1,
            hub.name,
            hub.unlocode,
            hub.out_degree
        );
    }
    Ok(())
}
