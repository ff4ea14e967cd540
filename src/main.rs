use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;

use bitmap_mapgen::binding::{CarryOver, ColorTerrainBinding};
use bitmap_mapgen::catalog::TerrainCatalog;
use bitmap_mapgen::config::{ExportFormat, MapSize, PipelineConfig, Rotation};
use bitmap_mapgen::export::{self, ScenarioMap, TargetMap};
use bitmap_mapgen::palette::Color;
use bitmap_mapgen::session::Session;
use bitmap_mapgen::{MapGenError, Result};

#[derive(Parser, Debug)]
#[command(name = "bitmap_mapgen")]
#[command(about = "Convert a bitmap into a terrain grid for a scenario map")]
struct Args {
    /// Source image (png, jpeg, bmp, ...)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// JSON pipeline configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of palette colors (1-20)
    #[arg(short = 'k', long)]
    colors: Option<usize>,

    /// Blur radius applied before quantization (0-50)
    #[arg(short = 'b', long)]
    simplify: Option<u32>,

    /// Named map size
    #[arg(short, long, value_enum)]
    size: Option<MapSize>,

    /// Explicit side length in tiles (overrides --size)
    #[arg(long)]
    tiles: Option<u32>,

    #[arg(short, long, value_enum)]
    rotation: Option<Rotation>,

    /// Clustering seed
    #[arg(long)]
    seed: Option<u64>,

    /// How existing bindings survive a regenerated palette
    #[arg(long, value_enum)]
    carry_over: Option<CarryOver>,

    /// Terrain catalog (CSV with Descriptive_Name/Constant_ID, or JSON)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Print the terrain catalog and exit
    #[arg(long)]
    list_terrains: bool,

    /// Color → terrain bindings (JSON)
    #[arg(long)]
    bindings: Option<PathBuf>,

    /// Bind a palette color, e.g. --bind "#1e5ac8=Water" (repeatable)
    #[arg(long = "bind", value_name = "COLOR=TERRAIN")]
    bind: Vec<String>,

    /// Write the current bindings (unbound colors as null) to this file
    #[arg(long)]
    write_bindings: Option<PathBuf>,

    /// Save the preview image
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Highlight one palette color in the preview and save that frame
    #[arg(long, value_name = "COLOR")]
    flash: Option<String>,

    /// Where to save the highlighted frame
    #[arg(long, default_value = "flash.png")]
    flash_output: PathBuf,

    #[arg(short, long, value_enum)]
    format: Option<ExportFormat>,

    /// Existing scenario to write into (otherwise a blank one is created)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Terrain covering a new scenario or tiles added by resizing one
    #[arg(long, default_value = "Grass 1")]
    base_terrain: String,

    /// Export destination
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(colors) = self.colors {
            config.colors = colors;
        }
        if let Some(simplify) = self.simplify {
            config.simplification = simplify;
        }
        if let Some(size) = self.size {
            config.map_size = size;
            config.target_size = None;
        }
        if let Some(tiles) = self.tiles {
            config.target_size = Some(tiles);
        }
        if let Some(rotation) = self.rotation {
            config.rotation = rotation;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(carry_over) = self.carry_over {
            config.carry_over = carry_over;
        }
        if let Some(format) = self.format {
            config.export_format = format;
        }
    }
}

fn parse_binding(pair: &str) -> Result<(Color, &str)> {
    let (color, terrain) = pair
        .split_once('=')
        .ok_or_else(|| MapGenError::InvalidColor(pair.to_string()))?;
    Ok((color.parse()?, terrain.trim()))
}

fn run(args: Args) -> Result<()> {
    let catalog = match &args.catalog {
        Some(path) => TerrainCatalog::load(path)?,
        None => TerrainCatalog::builtin(),
    };

    if args.list_terrains {
        for entry in catalog.entries() {
            println!("{:>4}  {}", entry.id, entry.name);
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let input = args.input.as_deref().ok_or(MapGenError::NoSourceImage)?;
    let size = config.target_size();
    let format = config.export_format;

    println!("Opening {}", input.display());
    let mut session = Session::new(config, catalog);
    session.open_image(input)?;

    if let Some(path) = &args.bindings {
        session.set_binding(ColorTerrainBinding::load(path)?);
    }

    println!("Generating {}x{} bitmap...", size, size);
    let generation = session.generate()?;
    println!(
        "Quantized to {} colors (score {:.6})",
        generation.palette().len(),
        generation.quantized.score
    );

    for pair in &args.bind {
        let (color, terrain) = parse_binding(pair)?;
        session.bind(color, terrain)?;
    }

    if let Some(palette) = session.palette() {
        println!("Palette:");
        for color in palette.distinct() {
            let terrain = session.binding().get(&color).unwrap_or("(unbound)");
            println!("  {}  {}", color, terrain);
        }
    }

    if let Some(path) = &args.write_bindings {
        session.binding().save(path)?;
        println!("Wrote bindings to {}", path.display());
    }

    if let Some(path) = &args.preview {
        if let Some(frame) = session.preview_frame() {
            frame.save(path)?;
            println!("Saved preview to {}", path.display());
        }
    }

    if let Some(text) = &args.flash {
        let color: Color = text.parse()?;
        let now = Instant::now();
        session.flash(color, now)?;
        if let Some(frame) = session.preview_frame() {
            frame.save(&args.flash_output)?;
            println!("Saved flash of {} to {}", color, args.flash_output.display());
        }
        let delay = Duration::from_millis(session.config().flash_millis);
        session.poll(now + delay);
    }

    let Some(output) = &args.output else {
        return Ok(());
    };

    let base = session
        .catalog()
        .id_of(&args.base_terrain)
        .ok_or_else(|| MapGenError::NotInCatalog(args.base_terrain.clone()))?;
    let side = size as usize;
    let mut map = match &args.scenario {
        Some(path) => {
            let mut map = ScenarioMap::load(path)?;
            if (map.width(), map.height()) != (side, side) {
                println!("Resizing {} from {}x{} to {}x{}", path.display(), map.width(), map.height(), side, side);
            }
            map.set_size(side, side, base);
            map
        }
        None => ScenarioMap::new(side, side, base),
    };

    println!("Exporting {} to {} ({}x{} map)...", format, output.display(), map.width(), map.height());
    let report = {
        let mut exporter = export::exporter_for(format, &mut map, output);
        session.export(&mut *exporter)?
    };

    println!("Wrote {} tiles ({}x{} region)", report.tiles_written, report.width, report.height);
    for omission in &report.omissions {
        println!(
            "  No terrain defined for color {}: {} tiles left unchanged (first at {}, {})",
            omission.color, omission.tiles, omission.first_seen.0, omission.first_seen.1
        );
    }

    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
