//! plantcam: a field camera that captures leaf photographs and classifies plant diseases.

pub mod module; // Capture and classification procedures with their supporting modules.
