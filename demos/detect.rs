use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use argh::FromArgs;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use yolov8_sdk::{Yolov8, Yolov8Config};

#[derive(FromArgs)]
/// YOLOv8 SDK detection driver arguments
struct Args {
    /// path to the YOLOv8 SDK shared library
    #[argh(option)]
    library: PathBuf,

    /// path to an input image
    #[argh(option)]
    image_path: PathBuf,

    /// detector configuration file in TOML format
    #[argh(option)]
    config: Option<PathBuf>,

    /// path to the ONNX model, overriding the configuration file
    #[argh(option)]
    model: Option<PathBuf>,

    /// original image width, probed from the image header when omitted
    #[argh(option)]
    width: Option<i32>,

    /// original image height, probed from the image header when omitted
    #[argh(option)]
    height: Option<i32>,
}

fn main() -> Result<()> {
    init_logging()?;

    let args: Args = argh::from_env();

    let mut config = match &args.config {
        Some(path) => {
            Yolov8Config::from_file(path).context("Failed to load detector config")?
        }
        None => Yolov8Config::default(),
    };
    if let Some(model) = args.model {
        config.onnx_path = model;
    }

    let mut model =
        Yolov8::load(&args.library, &config).context("Failed to load the YOLOv8 SDK")?;

    // read the raw encoded bytes; the SDK does its own decoding
    let image = fs::read(&args.image_path)
        .with_context(|| format!("Failed to read image {:?}", args.image_path))?;

    // the SDK needs the true source dimensions to scale boxes back
    let (width, height) = match (args.width, args.height) {
        (Some(width), Some(height)) => (width, height),
        _ => {
            let (width, height) = image::image_dimensions(&args.image_path)
                .with_context(|| {
                    format!("Failed to probe dimensions of {:?}", args.image_path)
                })?;
            (width as i32, height as i32)
        }
    };

    model
        .detect(&image, width, height)
        .context("Detection failed")?;

    for detection in model.detections().context("Failed to collect detections")? {
        println!("{detection}");
    }

    Ok(())
}

fn init_logging() -> Result<()> {
    let console_appender = fmt::layer().with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(console_appender)
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}
