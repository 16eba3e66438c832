//! Config Handler.

use serde::{Deserialize, Serialize};

use crate::module::error::ConfError;
use crate::module::vision::camera::Resolution;

/// Provides TOML config file handling.
pub mod toml {

    use super::DEFAULT_CONFIG;
    use crate::module::define;
    use crate::module::error::ConfError;
    use std::fs::File;
    use std::io::prelude::*;
    use std::path::Path;

    /// Loads a configuration file from the given directory.
    /// If not found, generates a default config file.
    ///
    /// # Arguments
    ///
    /// * `dir` - The directory where the configuration file is located or should be created.
    ///
    pub fn load(dir: &str) -> Result<super::Config, ConfError> {
        let path = Path::new(dir).join(define::path::CONF_FILE);

        if !path.is_file() {
            // Write the commented default so operators can edit it in place.
            let mut file = File::create(&path)?;
            file.write_all(DEFAULT_CONFIG.as_bytes())?;
            log::info!("Wrote default config to {}", path.display());
        }

        let conf_str = std::fs::read_to_string(&path)?;
        Ok(toml::from_str(&conf_str)?)
    }

    /// Saves a configuration file to the given directory.
    ///
    /// # Arguments
    ///
    /// * `dir` - The directory where the configuration file should be saved.
    /// * `conf` - The configuration data to be saved.
    ///
    pub fn save(dir: &str, conf: &super::Config) -> Result<(), ConfError> {
        let toml_str = toml::to_string(conf)?;
        let path = crate::module::util::path::join(&[dir, define::path::CONF_FILE]);
        let mut file = File::create(path)?;
        file.write_all(toml_str.as_bytes())?;
        Ok(())
    }
}

/// Represents the configuration data structure.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub system: System,
    pub camera: Camera,
    pub classifier: Classifier,
}

impl Config {
    /// The built-in configuration.
    pub fn builtin() -> Result<Self, ConfError> {
        Ok(::toml::from_str(DEFAULT_CONFIG)?)
    }
}

/// Represents system-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct System {
    pub log_level: String,
    pub tmp_dir: String,
}

/// Represents camera-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Camera {
    pub device: String,
    pub preview_width: u32,
    pub preview_height: u32,
    pub capture_width: u32,
    pub capture_height: u32,
    pub fps: u32,
    pub grab_times: u8,
    pub warmup_ms: u64,
    pub settle_ms: u64,
    pub preview_interval_ms: u64,
    pub output_dir: String,
}

impl Camera {
    pub fn preview_resolution(&self) -> Resolution {
        Resolution::new(self.preview_width, self.preview_height)
    }

    pub fn capture_resolution(&self) -> Resolution {
        Resolution::new(self.capture_width, self.capture_height)
    }
}

/// Represents classifier-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Classifier {
    pub model_path: String,
    pub class_indices_path: String,
    pub matting_model_path: String,
    pub remove_background: bool,
    pub image_size: u32,
    pub image_path: String,
    pub intra_threads: i16,
}

// Default configuration data in TOML format
const DEFAULT_CONFIG: &str = r#"
[system]
  log_level = 'INFO' # Log file level ('ERROR', 'WARN', 'INFO', 'DEBUG', 'TRACE')
  tmp_dir = '/tmp/plantcam' # Directory for ephemeral files such as the preview frame

[camera]
  device = '/dev/video0' # V4L2 device
  preview_width = 640 # Preview resolution
  preview_height = 480
  capture_width = 1920 # Still capture resolution
  capture_height = 1080
  fps = 30 # Frame rate requested from the driver
  grab_times = 3 # Frames grabbed per still; only the last is kept
  warmup_ms = 2000 # Auto exposure / white balance settling time after start
  settle_ms = 1000 # Settling time after switching to still mode
  preview_interval_ms = 100 # Preview refresh interval while waiting for the operator
  output_dir = '.' # Where image_<timestamp>.jpg is written

[classifier]
  model_path = 'plant_disease_model.onnx' # ONNX export of the trained classifier
  class_indices_path = 'class_indices.json' # {"label": index, ...}
  matting_model_path = 'u2net.onnx' # Salient object model used to remove the background
  remove_background = true # Composite the subject on white before classifying
  image_size = 224 # Classifier input edge length
  image_path = 'leaf.jpg' # Image classified when no path is given on the command line
  intra_threads = 4 # ONNX runtime intra-op threads
"#;
