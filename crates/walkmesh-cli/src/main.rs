//! CLI utility for inspecting walkmeshes and finding paths across areas

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glam::{Vec2, Vec3};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use pathfinding::{PathConfig, PathQuery, DEFAULT_MAX_ITERATIONS};
use walkmesh::{
    read_bwm, read_text, write_bwm, AreaBuilder, AreaConfig, DirectoryLoader, Placement,
    RoomMesh, Rotation, WalkabilityTable, Walkmesh, WalkmeshFormat,
};

/// A CLI utility for walkmesh inspection, conversion and pathfinding
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Increase log verbosity (-v debug, -vv trace)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the contents of one walkmesh file
    Info {
        /// Walkmesh file, text or binary
        file: PathBuf,

        #[clap(flatten)]
        table: TableArgs,
    },

    /// Convert a text walkmesh to the binary room format
    Convert {
        /// Input text walkmesh
        input: PathBuf,

        /// Output binary walkmesh
        output: PathBuf,

        #[clap(flatten)]
        table: TableArgs,
    },

    /// Load an area and find a path across it
    FindPath {
        /// Directory holding the room files
        #[clap(long, value_parser)]
        dir: PathBuf,

        /// Rooms as `name`, `name@x,y,z` or `name@x,y,z,degrees`; tiles as
        /// `name@column,row` or `name@column,row,degrees`
        #[clap(long, required = true, num_args = 1..)]
        rooms: Vec<String>,

        /// Format of the room files
        #[clap(long, value_enum, default_value = "binary")]
        format: FormatArg,

        /// Tile edge length for tile mosaics
        #[clap(long, default_value = "10.0")]
        tile_size: f32,

        /// Start position (x,y)
        #[clap(long, value_parser = parse_point)]
        start: Vec2,

        /// End position (x,y)
        #[clap(long, value_parser = parse_point)]
        end: Vec2,

        /// Agent width
        #[clap(long, default_value = "0.0")]
        width: f32,

        /// Only correct for the agent width this far from the start
        #[clap(long)]
        stop_length: Option<f32>,

        /// Maximum number of faces expanded by the search
        #[clap(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
        max_iterations: usize,

        #[clap(flatten)]
        table: TableArgs,

        /// Save the assembled walkmesh as JSON
        #[clap(long, value_parser)]
        export: Option<PathBuf>,

        /// Output path file
        #[clap(long, value_parser)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct TableArgs {
    /// Built-in walkability table
    #[clap(long, value_enum, default_value = "kotor")]
    game: GameArg,

    /// Walkability table as a JSON array of booleans, overrides --game
    #[clap(long, value_parser)]
    walkability: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GameArg {
    Kotor,
    Nwn,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Text,
    Binary,
    Tiles,
}

impl From<FormatArg> for WalkmeshFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Text => WalkmeshFormat::Text,
            FormatArg::Binary => WalkmeshFormat::Binary,
            FormatArg::Tiles => WalkmeshFormat::Tiles,
        }
    }
}

/// Parse a comma-separated 2D point
fn parse_point(s: &str) -> Result<Vec2, String> {
    let parts = parse_floats(s)?;

    if parts.len() != 2 {
        return Err(format!("Point must have 2 components, got {}", parts.len()));
    }

    Ok(Vec2::new(parts[0], parts[1]))
}

fn parse_floats(s: &str) -> Result<Vec<f32>, String> {
    s.split(',')
        .map(|part| part.trim().parse::<f32>().map_err(|e| e.to_string()))
        .collect()
}

/// A room or tile named on the command line
#[derive(Debug, PartialEq)]
struct RoomArg {
    name: String,
    coords: Vec<f32>,
}

fn parse_room(s: &str) -> Result<RoomArg> {
    let (name, coords) = match s.split_once('@') {
        Some((name, coords)) => (
            name,
            parse_floats(coords).map_err(|e| anyhow!("Invalid coordinates in {s}: {e}"))?,
        ),
        None => (s, Vec::new()),
    };
    if name.is_empty() {
        bail!("Room without a name: {s}");
    }
    Ok(RoomArg {
        name: name.to_string(),
        coords,
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match args.command {
        Commands::Info { file, table } => info(&file, &load_table(&table)?),
        Commands::Convert {
            input,
            output,
            table,
        } => convert(&input, &output, &load_table(&table)?),
        Commands::FindPath {
            dir,
            rooms,
            format,
            tile_size,
            start,
            end,
            width,
            stop_length,
            max_iterations,
            table,
            export,
            output,
        } => {
            let config = AreaConfig {
                tile_size,
                ..AreaConfig::for_format(format.into())
            };
            let walkmesh = load_area(&dir, &rooms, config, load_table(&table)?)?;

            if let Some(export) = export {
                walkmesh
                    .save_to_json(&export)
                    .with_context(|| format!("Failed to export walkmesh to {}", export.display()))?;
                println!("Saved walkmesh to {}", export.display());
            }

            let config = PathConfig {
                max_iterations,
                stop_length,
                agent_width: width,
            };
            find_path(&walkmesh, config, start, end, output.as_deref())
        }
    }
}

fn load_table(args: &TableArgs) -> Result<WalkabilityTable> {
    match &args.walkability {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let table: WalkabilityTable = serde_json::from_str(&json)
                .with_context(|| format!("Invalid walkability table in {}", path.display()))?;
            if table.is_empty() {
                bail!("Walkability table in {} is empty", path.display());
            }
            Ok(table)
        }
        None => Ok(match args.game {
            GameArg::Kotor => WalkabilityTable::kotor(),
            GameArg::Nwn => WalkabilityTable::nwn(),
        }),
    }
}

/// Reads one walkmesh file, picking the format from its first bytes
fn read_room(path: &Path, table: &WalkabilityTable) -> Result<RoomMesh> {
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path.display().to_string();

    let room = if data.starts_with(b"BWM ") {
        read_bwm(&name, &data, table)
    } else {
        read_text(&name, &data)
    };
    room.map_err(|e| anyhow!("Failed to parse {}: {}", name, e))
}

/// Print the contents of one walkmesh file
fn info(path: &Path, table: &WalkabilityTable) -> Result<()> {
    let room = read_room(path, table)?;

    let walkable = room
        .materials
        .iter()
        .filter(|&&m| table.is_walkable(m))
        .count();
    let linked = room
        .adjacency
        .iter()
        .flatten()
        .filter(|n| n.is_some())
        .count();

    println!("{}", path.display());
    println!("  vertices:    {}", room.vertices.len());
    println!("  faces:       {} ({} walkable)", room.faces.len(), walkable);
    println!("  edge links:  {}", linked);
    println!("  transitions: {}", room.transitions.len());

    match &room.tree {
        Some(tree) => {
            println!("  bounds:      {:?} .. {:?}", tree.min(), tree.max());
            println!("  aabb leaves: {}", tree.leaves().len());
        }
        None => println!("  bounds:      none"),
    }

    Ok(())
}

/// Convert a text walkmesh to the binary room format
fn convert(input: &Path, output: &Path, table: &WalkabilityTable) -> Result<()> {
    let data =
        std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let room = read_text(&input.display().to_string(), &data)
        .map_err(|e| anyhow!("Failed to parse {}: {}", input.display(), e))?;

    let bytes = write_bwm(&room, table).map_err(|e| anyhow!("Failed to encode walkmesh: {}", e))?;
    std::fs::write(output, &bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Wrote {} faces ({} bytes) to {}",
        room.faces.len(),
        bytes.len(),
        output.display()
    );
    Ok(())
}

/// Assemble an area from rooms or tiles in a directory
fn load_area(
    dir: &Path,
    rooms: &[String],
    config: AreaConfig,
    table: WalkabilityTable,
) -> Result<Walkmesh> {
    let format = config.format;
    let mut builder = AreaBuilder::new(config, DirectoryLoader::new(dir), table)
        .map_err(|e| anyhow!("Invalid area configuration: {}", e))?;

    for arg in rooms {
        let room = parse_room(arg)?;
        match format {
            WalkmeshFormat::Tiles => {
                let (column, row, degrees) = match room.coords.as_slice() {
                    [c, r] => (*c, *r, 0.0),
                    [c, r, d] => (*c, *r, *d),
                    _ => bail!("Tile {} needs a column and row", arg),
                };
                if column < 0.0 || row < 0.0 || column.fract() != 0.0 || row.fract() != 0.0 {
                    bail!("Tile {} has a negative or fractional grid position", arg);
                }
                let rotation = Rotation::from_degrees(degrees)?;
                builder.add_tile(&room.name, column as u32, row as u32, rotation)
            }
            WalkmeshFormat::Text | WalkmeshFormat::Binary => {
                let placement = match room.coords.as_slice() {
                    [] => Placement::IDENTITY,
                    [x, y, z] => Placement::new(Vec3::new(*x, *y, *z), Rotation::R0),
                    [x, y, z, d] => {
                        Placement::new(Vec3::new(*x, *y, *z), Rotation::from_degrees(*d)?)
                    }
                    _ => bail!("Room {} needs x,y,z and an optional rotation", arg),
                };
                builder.add_data(&room.name, placement)
            }
        }
        .with_context(|| format!("Failed to load {}", room.name))?;
    }

    let walkmesh = builder.finalize().context("Failed to assemble area")?;
    println!(
        "Area loaded: {} rooms, {} vertices, {} faces",
        walkmesh.rooms().len(),
        walkmesh.vertices().len(),
        walkmesh.face_count()
    );
    Ok(walkmesh)
}

/// Find a path on an assembled area
fn find_path(
    walkmesh: &Walkmesh,
    config: PathConfig,
    start: Vec2,
    end: Vec2,
    output: Option<&Path>,
) -> Result<()> {
    let mut query = PathQuery::with_config(walkmesh, config)
        .map_err(|e| anyhow!("Invalid path configuration: {}", e))?;

    println!("Finding path from {} to {}...", start, end);

    let waypoints = query
        .find_smooth_path(start, end)
        .map_err(|status| anyhow!("Failed to find path: {}", status))?;

    println!(
        "Found path with {} faces after {} iterations",
        query.last_path().len(),
        query.last_iterations()
    );
    println!("Generated smoothed path with {} waypoints", waypoints.len());

    // Output the path
    if let Some(output_path) = output {
        println!("Saving path to {}...", output_path.display());

        let mut file = File::create(output_path)
            .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;

        writeln!(file, "# Path from {} to {}", start, end)?;
        writeln!(file, "# {} waypoints", waypoints.len())?;

        for waypoint in &waypoints {
            writeln!(file, "{},{},{}", waypoint.x, waypoint.y, waypoint.z)?;
        }
    } else {
        println!("Path:");
        for (i, waypoint) in waypoints.iter().enumerate() {
            println!("{}: {},{},{}", i, waypoint.x, waypoint.y, waypoint.z);
        }
    }

    Ok(())
}
