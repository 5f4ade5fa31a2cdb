use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dungeon::{locate, util::parse_map, GridMap, Pattern, Planner, Point, Route, Settings};

#[derive(Parser, Debug)]
#[command(name = "dungeon-route", version, about = "Plan routes through a dungeon map")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cheapest route from a start tile to the boss
    Route(RouteArgs),
    /// Most valuable treasure run from a start tile
    Treasure(RouteArgs),
    /// Find where a map sketch lies on the map
    Locate {
        #[arg(long, value_name = "FILE")]
        map: PathBuf,
        #[arg(long, value_name = "FILE")]
        pattern: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RouteArgs {
    /// Text map, one row per line
    #[arg(long, value_name = "FILE")]
    map: PathBuf,

    /// Start tile as column,row
    #[arg(long, value_name = "COL,ROW", value_parser = parse_start)]
    start: Point,

    /// JSON settings, missing values fall back to the defaults
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Maximum steps between two stops
    #[arg(long, value_name = "N")]
    max_steps: Option<u32>,

    /// Let fountains connect to the boss directly
    #[arg(long)]
    allow_fountains_at_boss: bool,

    /// Let bonfires serve as stops on a treasure run
    #[arg(long)]
    allow_bonfire_stops: bool,

    /// Print the route as JSON
    #[arg(long)]
    json: bool,
}

fn parse_start(value: &str) -> Result<Point, String> {
    let (col, row) = value
        .split_once(',')
        .ok_or_else(|| format!("expected COL,ROW, got {:?}", value))?;
    let col = col.trim().parse().map_err(|e| format!("column: {}", e))?;
    let row = row.trim().parse().map_err(|e| format!("row: {}", e))?;
    Ok(Point { row, col })
}

fn load_map(path: &Path) -> anyhow::Result<GridMap> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("could not read map {}", path.display()))?;
    let map = parse_map(&text).with_context(|| format!("invalid map {}", path.display()))?;
    Ok(map)
}

fn load_planner(args: &RouteArgs) -> anyhow::Result<Planner> {
    let map = load_map(&args.map)?;

    let mut settings = match &args.settings {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("could not read settings {}", path.display()))?;
            Settings::from_json(&json)
                .with_context(|| format!("invalid settings {}", path.display()))?
        }
        None => Settings::default(),
    };

    if let Some(max_steps) = args.max_steps {
        settings.max_steps = max_steps;
    }
    if args.allow_fountains_at_boss {
        settings.boss.only_through_bonfires = false;
    }
    if args.allow_bonfire_stops {
        settings.treasure.fountains_only = false;
    }

    Ok(Planner::new(map, settings))
}

fn print_route(route: &Route, label: &str, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(route)?);
        return Ok(());
    }

    println!("{}: {}", label, route.total);
    let stops: Vec<String> = route.stops.iter().map(Point::to_string).collect();
    println!("stops: {}", stops.join(" -> "));
    let path: Vec<String> = route.path.iter().map(Point::to_string).collect();
    println!("path ({} tiles): {}", route.path.len(), path.join(" "));
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Route(args) => {
            let mut planner = load_planner(&args)?;
            let route = planner.shortest_route(args.start)?;
            print_route(&route, "cost", args.json)?;
        }
        Command::Treasure(args) => {
            let mut planner = load_planner(&args)?;
            let route = planner.treasure_route(args.start)?;
            print_route(&route, "value", args.json)?;
        }
        Command::Locate { map, pattern } => {
            let grid = load_map(&map)?;
            let text = fs::read_to_string(&pattern)
                .with_context(|| format!("could not read pattern {}", pattern.display()))?;
            let pattern = Pattern::parse(&text)?;

            for offset in locate(&grid, &pattern)? {
                println!("{}", offset);
            }
        }
    }

    Ok(())
}
