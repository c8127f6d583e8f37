use clap::Parser;
use eyre::Result;
use mission_lib::{
    init_tracing_with_default, Pose, SequencerConfig, WaypointList, DEFAULT_LOG_FILTER,
};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "mission_check")]
#[command(about = "Validate sequencer configuration and waypoint files")]
struct Cli {
    /// Sequencer configuration file (defaults are checked when omitted)
    #[arg(short, long)]
    config: Option<String>,

    /// Waypoint files to check; the files listed in the configuration are used when none are given
    waypoints: Vec<String>,

    /// Starting pose `x,y,z,yaw` relative waypoints are resolved against
    #[arg(short, long, value_parser = parse_pose, allow_hyphen_values = true)]
    start: Option<Pose>,

    /// Treat waypoints as absolute regardless of the configuration
    #[arg(long)]
    absolute: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing_with_default(if cli.verbose {
        "debug"
    } else {
        DEFAULT_LOG_FILTER
    });

    let config = check_config(cli.config.as_deref())?;

    let files = if cli.waypoints.is_empty() {
        config.waypoint_files.clone()
    } else {
        cli.waypoints.clone()
    };
    if files.is_empty() {
        println!("No waypoint files to check");
        return Ok(());
    }

    let relative = config.relative_waypoints && !cli.absolute;
    let start = cli.start.unwrap_or_else(Pose::origin);
    info!(
        "Resolving {} waypoints against ({:.2}, {:.2}, {:.2}), yaw {:.2}",
        if relative { "relative" } else { "absolute" },
        start.position[0],
        start.position[1],
        start.position[2],
        start.yaw
    );

    let mut failures = 0;
    for path in &files {
        if let Err(e) = check_waypoint_file(path, &start, relative) {
            println!("✗ {}: {}", path, e);
            failures += 1;
        }
    }

    if failures > 0 {
        return Err(eyre::eyre!(
            "{} of {} waypoint file(s) failed validation",
            failures,
            files.len()
        ));
    }

    println!("\nAll mission files passed!");
    Ok(())
}

fn check_config(path: Option<&str>) -> Result<SequencerConfig> {
    let config = match path {
        Some(path) => {
            println!("Checking configuration file: {}", path);
            SequencerConfig::load_from_file(path)?
        }
        None => {
            println!("No configuration file given, checking defaults");
            SequencerConfig::default()
        }
    };

    match config.validate() {
        Ok(()) => println!("✓ Configuration validation passed"),
        Err(e) => {
            println!("✗ Configuration validation failed: {}", e);
            return Err(e);
        }
    }

    println!(
        "  Thresholds: {:.2} m / {:.3} rad",
        config.position_threshold, config.yaw_threshold
    );
    println!(
        "  Timeouts: arm {:.1} s, disarm {:.1} s, mode {:.1} s, land {:.1} s",
        config.arm_timeout_s, config.disarm_timeout_s, config.mode_timeout_s, config.land_timeout_s
    );
    println!(
        "  Auto land: {}, relative waypoints: {}",
        config.auto_land, config.relative_waypoints
    );
    Ok(config)
}

/// Load and validate one waypoint file, returning the resolved target poses
fn check_waypoint_file(path: &str, start: &Pose, relative: bool) -> Result<Vec<Pose>> {
    debug!("Loading {}", path);
    let list = WaypointList::load_from_file(path)?;
    println!("✓ {}: {} waypoint(s)", path, list.len());
    if list.is_empty() {
        println!("  (empty list: START_MISSION completes immediately)");
    }

    let mut total_hold = 0.0;
    let mut targets = Vec::with_capacity(list.len());
    for (i, waypoint) in list.waypoints.iter().enumerate() {
        let target = waypoint.target(start, relative);
        println!(
            "  {:>3}: ({:>7.2}, {:>7.2}, {:>7.2}) yaw {:>6.2}  hold {:.1} s",
            i + 1,
            target.position[0],
            target.position[1],
            target.position[2],
            target.yaw,
            waypoint.holdtime
        );
        total_hold += waypoint.holdtime;
        targets.push(target);
    }

    let path_length: f64 = std::iter::once(*start)
        .chain(targets.iter().copied())
        .collect::<Vec<_>>()
        .windows(2)
        .map(|pair| pair[0].distance_to(&pair[1]))
        .sum();
    println!(
        "  Path length {:.1} m, total hold {:.1} s",
        path_length, total_hold
    );

    Ok(targets)
}

fn parse_pose(raw: &str) -> Result<Pose, String> {
    let values = raw
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in '{}': {}", raw, e))?;

    match values.as_slice() {
        [x, y, z, yaw] => Ok(Pose::new(*x, *y, *z, *yaw)),
        [x, y, z] => Ok(Pose::new(*x, *y, *z, 0.0)),
        _ => Err(format!("expected x,y,z[,yaw], got '{}'", raw)),
    }
}
