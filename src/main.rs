use anyhow::{Context, Result};
use clap::Parser;
use msrcr::{msrcr, reflectance_image, PixelBuffer, RetinexConfig, ScaleMode};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "msrcr")]
#[command(about = "Apply Multi-Scale Retinex with Color Restoration to images", long_about = None)]
struct Cli {
    #[arg(help = "Input image file path")]
    input: PathBuf,

    #[arg(help = "Output image file path")]
    output: PathBuf,

    /// JSON file with filter parameters; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Largest Gaussian scale, 16 to 250
    #[arg(long)]
    max_scale: Option<i32>,

    /// Number of scales, 1 to 8
    #[arg(long)]
    nscales: Option<i32>,

    /// Distribution of the scales
    #[arg(short, long, value_enum)]
    mode: Option<ScaleMode>,

    /// Contrast control, 0 to 4
    #[arg(long)]
    variance_factor: Option<f64>,

    /// Save the raw reflectance (before color restoration) to a separate file
    #[arg(long)]
    reflectance: Option<PathBuf>,
}

impl Cli {
    fn retinex_config(&self) -> Result<RetinexConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => RetinexConfig::default(),
        };

        if let Some(max_scale) = self.max_scale {
            config.max_scale = max_scale;
        }
        if let Some(nscales) = self.nscales {
            config.nscales = nscales;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(variance_factor) = self.variance_factor {
            config.variance_factor = variance_factor;
        }

        config.validate()?;
        Ok(config)
    }
}

fn load_config(path: &Path) -> Result<RetinexConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))
}

fn save(buffer: &PixelBuffer, path: &Path) -> Result<()> {
    let image = buffer
        .to_dynamic_image()
        .context("Pixel buffer does not match its dimensions")?;
    image
        .save(path)
        .with_context(|| format!("Failed to save {}", path.display()))
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.retinex_config()?;

    let image = image::open(&cli.input)
        .with_context(|| format!("Failed to open {}", cli.input.display()))?;
    let mut buffer = PixelBuffer::from(&image);
    info!(
        width = buffer.width(),
        height = buffer.height(),
        channels = buffer.bpp(),
        ?config,
        "Loaded {}",
        cli.input.display()
    );

    // Save raw reflectance if requested
    if let Some(refl_path) = &cli.reflectance {
        let reflectance =
            reflectance_image(&buffer, &config).context("Failed to extract reflectance")?;
        save(&reflectance, refl_path)?;
        info!("Saved raw reflectance to {}", refl_path.display());
    }

    let report = |fraction: f64| debug!("Progress {:.0}%", fraction * 100.0);
    msrcr(&mut buffer, &config, Some(&report)).context("Processing failed")?;

    save(&buffer, &cli.output)?;
    info!("Saved result to {}", cli.output.display());
    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}
