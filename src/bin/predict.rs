//! Classify one leaf image and print the predicted disease.
//!
//! The image path comes from the first argument, or `classifier.image_path`.

use std::path::Path;

use plantcam::module::classify::{PredictionOutcome, Predictor};
use plantcam::module::error::ClassifyError;
use plantcam::module::util::init::{init_log, resource::init};

fn main() {
    let property = match init() {
        Ok(property) => property,
        Err(e) => {
            eprintln!("Can't prepare resources: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = init_log(&property.path.dir.data, "predict", &property.conf.system.log_level) {
        eprintln!("Can't initialize logging: {}", e);
    }
    let conf = &property.conf.classifier;

    let predictor = match Predictor::load(conf) {
        Ok(predictor) => predictor,
        Err(e @ ClassifyError::Missing { .. }) => {
            log::error!("{}", e);
            eprintln!("\nERROR: Model or class indices not found. {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            log::error!("Can't load classifier: {}", e);
            eprintln!("\nERROR: Can't load classifier: {}", e);
            std::process::exit(1);
        }
    };

    let image_path = std::env::args().nth(1).unwrap_or_else(|| conf.image_path.clone());
    let image_path = Path::new(&image_path);
    match predictor.predict_image(image_path) {
        Ok(PredictionOutcome::Predicted(prediction)) => {
            let name = image_path.file_name().unwrap_or(image_path.as_os_str());
            println!("{}", "-".repeat(40));
            println!("Image: {}", name.to_string_lossy());
            println!("Predicted Disease: {}", prediction.label);
            println!("Confidence: {:.2}%", prediction.confidence);
            println!("{}", "-".repeat(40));
        }
        Ok(PredictionOutcome::ImageMissing) => {
            eprintln!(
                "\nERROR: {} does not exist. Pass an image path or update classifier.image_path.",
                image_path.display()
            );
            std::process::exit(1);
        }
        Err(e) => {
            log::error!("Prediction failed: {}", e);
            eprintln!("\nERROR: Prediction failed: {}", e);
            std::process::exit(1);
        }
    }
}
