//! Path Operations Module
//!
//! This module handles path operations for directories and files.

use chrono::{DateTime, TimeZone};
use std::path::PathBuf;

use crate::module::define;

/// Join Paths
///
/// This function takes a slice of strings as input and joins them into a single path string.
/// It uses the PathBuf type to handle platform-specific separators and conversions.
pub fn join(paths: &[&str]) -> String {
    let mut path: PathBuf = PathBuf::new();
    for p in paths {
        path.push(p);
    }
    path.to_string_lossy().into_owned()
}

/// Capture File Name
///
/// `image_<YYYYMMDD_HHMMSS>.jpg` for the given capture time.
pub fn capture_file_name<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}{}.{}",
        define::path::CAPTURE_PREFIX,
        at.format(define::path::CAPTURE_TIMESTAMP),
        define::path::CAPTURE_EXT
    )
}

pub mod dir {
    //! Directory Operations Submodule
    //!
    //! This submodule provides functions for directory operations.

    use std::fs;
    use std::io;
    use std::path::Path;

    use super::{PlantDir, PlantImg, PlantPath};
    use crate::module::define;
    use crate::module::util::conf::Config;

    /// Create Directory from Path List
    ///
    /// This function takes a slice of strings as input and creates a directory with the joined path.
    /// It returns the created path.
    pub fn create_dir_from_path_list(paths: &[&str]) -> io::Result<String> {
        let path = super::join(paths);
        fs::create_dir_all(Path::new(&path))?;
        Ok(path)
    }

    /// Create Application Subdirectory and Paths
    ///
    /// Creates the log directory inside `data_dir`, the ephemeral directory and the
    /// capture output directory named by the configuration, and returns their paths.
    pub fn create_app_sub_dir(data_dir: &str, conf: &Config) -> io::Result<PlantPath> {
        let data_dir = create_dir_from_path_list(&[data_dir])?;
        let log_dir = create_dir_from_path_list(&[&data_dir, define::path::LOG_DIR])?;
        let tmp_dir = create_dir_from_path_list(&[&conf.system.tmp_dir])?;
        let output_dir = create_dir_from_path_list(&[&conf.camera.output_dir])?;
        let preview = super::join(&[&tmp_dir, define::path::PREVIEW_IMAGE]);
        Ok(PlantPath {
            dir: PlantDir {
                data: data_dir,
                tmp: tmp_dir,
                log: log_dir,
                output: output_dir,
            },
            img: PlantImg { preview },
        })
    }
}

/// Paths of Resources
///
/// This struct represents the paths of the resources used by the application.
#[derive(Debug, Clone)]
pub struct PlantPath {
    /// Directories Paths
    pub dir: PlantDir,
    /// Images Paths
    pub img: PlantImg,
}

/// Paths of Directories
#[derive(Debug, Clone)]
pub struct PlantDir {
    /// Data Directory Path
    pub data: String,
    /// Temporary Directory Path
    pub tmp: String,
    /// Log Directory Path
    pub log: String,
    /// Capture Output Directory Path
    pub output: String,
}

/// Paths of Images
#[derive(Debug, Clone)]
pub struct PlantImg {
    /// Latest Preview Frame Path
    pub preview: String,
}
