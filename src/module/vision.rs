//! Processing related to visual information.
//!

pub mod background;
pub mod camera;
pub mod classifier;
pub mod labels;
pub mod preprocess;
