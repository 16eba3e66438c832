//! Error types.
//!
//! One enum per concern. Cancellation is not an error: it is reported through
//! `capture::CaptureOutcome::Cancelled`.

use std::io;
use std::path::PathBuf;

/// Errors raised by a camera handle or its driver.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("can't open camera {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: io::Error,
    },
    #[error("camera is streaming; stop it before configuring")]
    Busy,
    #[error("camera has no configuration; configure it before starting")]
    NotConfigured,
    #[error("camera is not streaming")]
    NotStreaming,
    #[error("camera handle already released")]
    Released,
    #[error("camera driver error: {0}")]
    Driver(String),
    #[error("camera I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised by the capture procedure.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("{} already exists; refusing to overwrite it", .0.display())]
    Exists(PathBuf),
}

/// Errors raised while preprocessing an image or running a model.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("onnx runtime error: {0}")]
    Ort(#[from] ort::OrtError),
    #[error("tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("model returned no output")]
    EmptyOutput,
    #[error("model output is NaN at index {0}")]
    NotANumber(usize),
    #[error("unexpected model output shape {0:?}")]
    OutputShape(Vec<usize>),
}

/// Errors raised by the classification procedure.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("{kind} not found at {}", .path.display())]
    Missing { kind: &'static str, path: PathBuf },
    #[error("can't read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid class indices: {0}")]
    Json(#[from] serde_json::Error),
    #[error("class index {index} is assigned to both {first:?} and {second:?}")]
    DuplicateIndex {
        index: usize,
        first: String,
        second: String,
    },
    #[error("class indices must cover 0..{len} but {missing} has no label")]
    MissingIndex { len: usize, missing: usize },
    #[error("class indices name {labels} classes but the model outputs {outputs}")]
    WidthMismatch { labels: usize, outputs: usize },
    #[error("class index {0} has no label")]
    UnknownClass(usize),
    #[error(transparent)]
    Vision(#[from] VisionError),
}

/// Errors raised while loading or saving the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfError {
    #[error("config I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}
