// src/main.rs

use ply_fb::config::Config;
use ply_fb::fbdev::linux::LinuxFbdev;
use ply_fb::fbdev::mock::MockFbdev;
use ply_fb::fbdev::FramebufferBackend;
use ply_fb::{splash, DecodedImage, Framebuffer};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

/// Paint a PNG splash image onto the Linux framebuffer.
#[derive(Debug, Parser)]
#[command(name = "ply-fb", version)]
struct Cli {
    /// Image to paint (default: /splash.png).
    image: Option<PathBuf>,

    /// Framebuffer device node (default: /dev/fb0).
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Paint at native size instead of stretching to the screen.
    #[arg(long)]
    no_scale: bool,

    /// Anchor an unscaled image at the top-left corner.
    #[arg(long)]
    no_center: bool,

    /// Paint into an in-memory WIDTHxHEIGHT x8r8g8b8 device instead of hardware.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    dry_run: Option<Size>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Size {
    width: u32,
    height: u32,
}

fn parse_size(s: &str) -> Result<Size> {
    let Some((w, h)) = s.split_once(['x', 'X']) else {
        bail!("expected WIDTHxHEIGHT, got '{}'", s);
    };
    let width = w.trim().parse().with_context(|| format!("bad width '{}'", w))?;
    let height = h.trim().parse().with_context(|| format!("bad height '{}'", h))?;
    if width == 0 || height == 0 {
        bail!("dimensions must be nonzero");
    }
    Ok(Size { width, height })
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(image) = &cli.image {
        config.image.path = image.clone();
    }
    if let Some(device) = &cli.device {
        config.device.path = device.clone();
    }
    if cli.no_scale {
        config.image.scale_to_screen = false;
    }
    if cli.no_center {
        config.image.center = false;
    }
    Ok(config)
}

/// Opens the device, paints the image and closes it again.
fn paint_on<B: FramebufferBackend>(
    mut fb: Framebuffer<B>,
    backend: Option<B>,
    image: DecodedImage,
    config: &Config,
) -> Result<()> {
    let opened = match backend {
        Some(backend) => fb.open_with(backend),
        None => fb.open(),
    };
    opened.with_context(|| format!("could not open framebuffer {}", fb.device_path().display()))?;

    let screen = fb.size();
    let image = if config.image.scale_to_screen {
        image.resize(screen.width as u32, screen.height as u32)
    } else {
        image
    };

    splash::paint(&mut fb, &image, config.image.center).context("could not paint image")?;
    fb.close();
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    info!("Configuration: {:?}", config);

    // Decode first: a bad image must not touch the device.
    let image = DecodedImage::decode(&config.image.path).context("could not load image")?;
    info!(
        "Loaded {} ({}x{})",
        config.image.path.display(),
        image.width(),
        image.height()
    );

    match cli.dry_run {
        Some(Size { width, height }) => {
            warn!("Dry run: painting into a {}x{} in-memory device", width, height);
            let fb = Framebuffer::<MockFbdev>::new(Some(config.device.path.as_path()));
            paint_on(fb, Some(MockFbdev::xrgb8888(width, height, width)), image, &config)
        }
        None => {
            let fb = Framebuffer::<LinuxFbdev>::new(Some(config.device.path.as_path()));
            paint_on(fb, None, image, &config)
        }
    }
}
