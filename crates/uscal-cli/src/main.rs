//! uscal: command-line ultrasound probe calibration.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::{Deserialize, Serialize};
use uscal_core::{CoordinateSpace, PointList, Pt3, Real, mat4_to_rows};
use uscal_linear::{ImageDimensions, ResidualRecord};
use uscal_pipeline::imageless::{self, ImagelessConfig, ImagelessSession};
use uscal_pipeline::pointer::{self, PointerConfig, PointerSession};
use uscal_pipeline::CalibrationStatus;

#[derive(Debug, Parser)]
#[command(name = "uscal")]
#[command(about = "Compute the ImageToProbe transform of a tracked ultrasound probe")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Calibrate from probe corner points, imaging depth and image size.
    Imageless {
        /// Path to JSON file containing ImagelessInput.
        #[arg(long)]
        input: String,

        /// Optional path to JSON ImagelessConfig. Defaults are used if omitted.
        #[arg(long)]
        config: Option<String>,
    },
    /// Calibrate from paired image and probe points.
    Pointer {
        /// Path to JSON file containing PointerInput.
        #[arg(long)]
        input: String,

        /// Optional path to JSON PointerConfig. Defaults are used if omitted.
        #[arg(long)]
        config: Option<String>,
    },
}

/// Points are `[x, y, z]` in probe coordinates (mm).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ImagelessInput {
    marked_points: Vec<Pt3>,
    unmarked_points: Vec<Pt3>,
    depth_mm: Option<Real>,
    image: Option<ImageDimensions>,
}

/// Image points in image millimetres, probe points in probe coordinates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PointerInput {
    image_points: Vec<Pt3>,
    probe_points: Vec<Pt3>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CalibrationReport {
    method: String,
    status: CalibrationStatus,
    message: String,
    /// Row-major 4x4 `ImageToProbe`, absent when nothing could be computed.
    image_to_probe: Option<[[Real; 4]; 4]>,
    residuals: Vec<ResidualRecord>,
    rms_error: Option<Real>,
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

fn load_config<T: serde::de::DeserializeOwned + Default>(path: Option<&str>) -> Result<T> {
    match path {
        Some(p) => load_json_file(Path::new(p)),
        None => Ok(T::default()),
    }
}

fn run_imageless_from_files(input_path: &str, config_path: Option<&str>) -> Result<String> {
    let input: ImagelessInput = load_json_file(Path::new(input_path))?;
    let config: ImagelessConfig = load_config(config_path)?;

    let mut session = ImagelessSession::new();
    session.set_config(config)?;
    for p in input.marked_points {
        session.append_marked_point(p);
    }
    for p in input.unmarked_points {
        session.append_unmarked_point(p);
    }
    if let Some(depth) = input.depth_mm {
        session.set_depth(depth);
    }
    let outcome = session.set_image_dimensions(input.image);
    info!("imageless calibration: {}", outcome.status.message());

    let report = CalibrationReport {
        method: imageless::METHOD_NAME.to_string(),
        message: outcome.status.message(),
        status: outcome.status,
        image_to_probe: session.image_to_probe().map(|m| mat4_to_rows(&m)),
        residuals: Vec::new(),
        rms_error: None,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn run_pointer_from_files(input_path: &str, config_path: Option<&str>) -> Result<String> {
    let input: PointerInput = load_json_file(Path::new(input_path))?;
    let config: PointerConfig = load_config(config_path)?;

    let mut session = PointerSession::from_lists(
        PointList::from_positions(
            pointer::IMAGE_LIST_NAME,
            CoordinateSpace::ImageMm,
            input.image_points,
        ),
        PointList::from_positions(
            pointer::PROBE_LIST_NAME,
            CoordinateSpace::Probe,
            input.probe_points,
        ),
    );
    let outcome = session.set_config(config)?;
    info!(
        "pointer calibration over {} pairs: {}",
        session.pair_count(),
        outcome.status.message()
    );

    let report = CalibrationReport {
        method: pointer::METHOD_NAME.to_string(),
        message: outcome.status.message(),
        status: outcome.status,
        image_to_probe: session.image_to_probe().map(|m| mat4_to_rows(&m)),
        residuals: session.compute_errors(),
        rms_error: session.rms_error(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let json = match cli.command {
        Commands::Imageless { input, config } => {
            run_imageless_from_files(&input, config.as_deref())?
        }
        Commands::Pointer { input, config } => run_pointer_from_files(&input, config.as_deref())?,
    };
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use uscal_core::{mat4_from_rows, transform_point};
    use uscal_linear::RegistrationMode;

    fn write_json<T: Serialize>(value: &T, path: &Path) {
        serde_json::to_writer_pretty(fs::File::create(path).unwrap(), value).unwrap();
    }

    fn flat_probe_input() -> ImagelessInput {
        ImagelessInput {
            marked_points: vec![Pt3::new(0.0, -5.0, 0.0), Pt3::new(0.0, 5.0, 0.0)],
            unmarked_points: vec![Pt3::new(40.0, -5.0, 0.0), Pt3::new(40.0, 5.0, 0.0)],
            depth_mm: Some(60.0),
            image: Some(ImageDimensions::new(400, 600)),
        }
    }

    #[test]
    fn imageless_helper_smoke_test() {
        let input_file = NamedTempFile::new().unwrap();
        write_json(&flat_probe_input(), input_file.path());

        let json = run_imageless_from_files(input_file.path().to_str().unwrap(), None)
            .expect("cli helper should succeed");
        let report: CalibrationReport = serde_json::from_str(&json).unwrap();

        assert_eq!(report.method, "imageless");
        assert_eq!(report.message, "Success!");
        let m = mat4_from_rows(&report.image_to_probe.unwrap());
        // Pixel (400, 0) is the marked near corner at the probe origin.
        let corner = transform_point(&m, &Pt3::new(400.0, 0.0, 0.0));
        assert!(corner.coords.norm() < 1e-9, "{corner}");
    }

    #[test]
    fn imageless_reports_missing_depth() {
        let input_file = NamedTempFile::new().unwrap();
        let input = ImagelessInput {
            depth_mm: None,
            ..flat_probe_input()
        };
        write_json(&input, input_file.path());

        let json = run_imageless_from_files(input_file.path().to_str().unwrap(), None).unwrap();
        let report: CalibrationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report.status, CalibrationStatus::InvalidDepth);
        assert_eq!(report.message, "Depth improperly specified.");
        assert!(report.image_to_probe.is_none());
    }

    #[test]
    fn pointer_helper_with_config() {
        let image = vec![
            Pt3::new(0.0, 0.0, 0.0),
            Pt3::new(10.0, 0.0, 0.0),
            Pt3::new(0.0, 10.0, 0.0),
            Pt3::new(0.0, 0.0, 10.0),
        ];
        let probe: Vec<Pt3> = image
            .iter()
            .map(|p| Pt3::new(p.x + 5.0, p.y - 2.0, p.z + 1.0))
            .collect();
        let input_file = NamedTempFile::new().unwrap();
        let config_file = NamedTempFile::new().unwrap();
        write_json(
            &PointerInput {
                image_points: image,
                probe_points: probe,
            },
            input_file.path(),
        );
        write_json(
            &PointerConfig {
                registration: RegistrationMode::Rigid,
                min_pairs: 4,
            },
            config_file.path(),
        );

        let json = run_pointer_from_files(
            input_file.path().to_str().unwrap(),
            Some(config_file.path().to_str().unwrap()),
        )
        .unwrap();
        let report: CalibrationReport = serde_json::from_str(&json).unwrap();

        assert!(report.status.is_success());
        let rows = report.image_to_probe.unwrap();
        assert!((rows[0][3] - 5.0).abs() < 1e-9);
        assert!((rows[1][3] + 2.0).abs() < 1e-9);
        assert_eq!(report.residuals.len(), 4);
        assert!(report.rms_error.unwrap() < 1e-9);
    }

    #[test]
    fn pointer_reports_unsynchronized_lists() {
        let input_file = NamedTempFile::new().unwrap();
        write_json(
            &PointerInput {
                image_points: vec![Pt3::origin(); 5],
                probe_points: vec![Pt3::origin(); 3],
            },
            input_file.path(),
        );
        let json = run_pointer_from_files(input_file.path().to_str().unwrap(), None).unwrap();
        let report: CalibrationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(
            report.status,
            CalibrationStatus::Unsynchronized { image: 5, probe: 3 }
        );
        assert!(report.residuals.is_empty());
    }

    #[test]
    fn invalid_config_is_an_error() {
        let input_file = NamedTempFile::new().unwrap();
        let config_file = NamedTempFile::new().unwrap();
        write_json(&PointerInput::default(), input_file.path());
        fs::write(config_file.path(), r#"{"min_pairs": 2}"#).unwrap();
        let err = run_pointer_from_files(
            input_file.path().to_str().unwrap(),
            Some(config_file.path().to_str().unwrap()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("min_pairs"));
    }

    #[test]
    fn missing_input_file_is_an_error() {
        let err = run_imageless_from_files("/nonexistent/uscal-input.json", None).unwrap_err();
        assert!(err.to_string().contains("reading"));
    }
}
