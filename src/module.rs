//! This module contains all the sub-modules of the project.

pub mod capture; // Capture module: Preview-then-still camera sequence.
pub mod classify; // Classify module: Disease prediction for a single image.
pub mod define; // Definition module: Contains definitions and constants used throughout the project.
pub mod error; // Error module: Error types shared by the procedures.
pub mod util; // Utility module: Provides configuration, initialization and path helpers.
pub mod vision; // Vision module: Camera control, preprocessing and inference.
