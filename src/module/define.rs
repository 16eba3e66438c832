//! Module for Constants and Paths Definitions
//!
//! This module defines various constants and paths used throughout the application.

/// File Paths
pub mod path {

    // Data Directory (config and logs live here)
    pub const DATA_DIR: &str = "./";

    // Log Directory
    pub const LOG_DIR: &str = "log";

    // Configuration File
    pub const CONF_FILE: &str = "conf.toml";

    // Latest Preview Frame
    pub const PREVIEW_IMAGE: &str = "preview.jpg";

    // Captured image file name parts
    pub const CAPTURE_PREFIX: &str = "image_";
    pub const CAPTURE_EXT: &str = "jpg";
    pub const CAPTURE_TIMESTAMP: &str = "%Y%m%d_%H%M%S";
}

/// Vision Constants
pub mod vision {
    // Salient object model input edge length
    pub const MATTING_SIZE: u32 = 320;

    // ImageNet normalization used by the salient object model
    pub const MATTING_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
    pub const MATTING_STD: [f32; 3] = [0.229, 0.224, 0.225];
}
