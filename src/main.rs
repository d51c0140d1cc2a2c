use std::collections::HashSet;
use std::path::PathBuf;

use canvas::camera::Camera;
use canvas::input::UiState;
use canvas::mapgen::{GenerateError, Generator, MapConfig};
use canvas::raster::{self, ImageSource, RasterError};
use canvas::render::{self, DrawOp, Frame, Viewport};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tabletop::config::PersistConfig;
use tabletop::services::persistence::{self, PersistError};
use tabletop::store::{self, FileStore, StoreError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("map generation failed: {0}")]
    Generate(#[from] GenerateError),
    #[error("render failed: {0}")]
    Raster(#[from] RasterError),
}

#[derive(Parser, Debug)]
#[command(name = "tabletop", about = "Virtual tabletop map tools")]
struct Cli {
    /// Root directory of the file-backed map store.
    #[arg(long, env = "TABLETOP_STORE_DIR", default_value = ".tabletop")]
    store_dir: PathBuf,

    /// Log filter, e.g. `info` or `tabletop=debug,canvas=warn`.
    #[arg(long, env = "TABLETOP_LOG", default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a procedural map image.
    Generate(GenerateArgs),
    /// Render a stored map to a PNG preview.
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// forest, manor, crypt, tavern, or dungeon.
    #[arg(long)]
    archetype: String,
    #[arg(long, default_value_t = 50)]
    complexity: u32,
    /// Width in tiles.
    #[arg(long, default_value_t = 20)]
    width: u32,
    /// Height in tiles.
    #[arg(long, default_value_t = 15)]
    height: u32,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    out: PathBuf,
    /// Also upload the image and place it as the map's background.
    #[arg(long)]
    map_id: Option<String>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[arg(long)]
    map_id: String,
    #[arg(long)]
    out: PathBuf,
    /// Viewport width in pixels.
    #[arg(long, default_value_t = 1280)]
    width: u32,
    /// Viewport height in pixels.
    #[arg(long, default_value_t = 720)]
    height: u32,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = FileStore::new(&cli.store_dir);
    let config = PersistConfig::from_env();

    match cli.command {
        Command::Generate(args) => run_generate(&store, &config, args).await,
        Command::Render(args) => run_render(&store, &config, args).await,
    }
}

async fn run_generate(store: &FileStore, config: &PersistConfig, args: GenerateArgs) -> Result<(), CliError> {
    let mut map_config = MapConfig::new(&args.archetype, args.complexity, args.width, args.height);
    map_config.seed = args.seed;
    let map = Generator::new().generate(&map_config)?;
    tokio::fs::write(&args.out, &map.png).await?;
    tracing::info!(
        archetype = %args.archetype,
        seed = map.seed,
        objects = map.objects.len(),
        out = %args.out.display(),
        "map generated"
    );

    let Some(map_id) = args.map_id else {
        return Ok(());
    };
    let pixel_size = map.pixel_size();
    persistence::attach_background(store, config, &map_id, map.png, pixel_size).await?;
    Ok(())
}

async fn run_render(store: &FileStore, config: &PersistConfig, args: RenderArgs) -> Result<(), CliError> {
    let scene = persistence::load_scene(store, config, &args.map_id).await?;
    let viewport = Viewport { width: f64::from(args.width.max(1)), height: f64::from(args.height.max(1)) };
    let frame = render::build_frame(&scene, &Camera::default(), &UiState::default(), viewport);
    let images = load_images(&frame).await;

    let output = raster::paint(&frame, &images, 1.0)?;
    tokio::fs::write(&args.out, output.encode_png()?).await?;
    tracing::info!(
        map_id = %args.map_id,
        entities = scene.entity_count(),
        skipped_text = output.texts.len(),
        out = %args.out.display(),
        "map rendered"
    );
    Ok(())
}

/// Decode every local image the frame references. Others draw their fallbacks.
async fn load_images(frame: &Frame) -> ImageSource {
    let srcs: HashSet<&str> = frame
        .commands
        .iter()
        .filter_map(|cmd| match &cmd.op {
            DrawOp::Image { src, .. } | DrawOp::TokenImage { src, .. } => Some(src.as_str()),
            _ => None,
        })
        .collect();

    let mut images = ImageSource::new();
    for src in srcs {
        let Some(path) = store::file_url_path(src) else {
            tracing::debug!(%src, "image is not a local file; drawing fallback");
            continue;
        };
        let decoded = match tokio::fs::read(&path).await {
            Ok(bytes) => raster::decode_image(&bytes),
            Err(e) => {
                tracing::warn!(%src, error = %e, "image unreadable");
                continue;
            }
        };
        match decoded {
            Ok(pixmap) => {
                images.insert(src.to_owned(), pixmap);
            }
            Err(e) => tracing::warn!(%src, error = %e, "image undecodable"),
        }
    }
    images
}
