//! Preview the camera and take one high resolution picture.

use plantcam::module::capture::{self, CaptureOutcome, ConsoleOperator};
use plantcam::module::util::init::{init_log, resource::init, PlantProperty};
use plantcam::module::vision::camera::V4l2Camera;

fn main() {
    let property = match init() {
        Ok(property) => property,
        Err(e) => {
            eprintln!("Can't prepare resources: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = init_log(&property.path.dir.data, "capture", &property.conf.system.log_level) {
        eprintln!("Can't initialize logging: {}", e);
    }
    log::info!("Starting capture...");

    match run(&property) {
        Ok(CaptureOutcome::Captured(path)) => {
            println!("{}", "-".repeat(30));
            println!("Image successfully captured!");
            println!("File saved as: {}", path.display());
            println!("{}", "-".repeat(30));
        }
        Ok(CaptureOutcome::Cancelled) => println!("\nOperation cancelled by user (Ctrl+C)."),
        Err(e) => {
            log::error!("Capture failed: {}", e);
            println!("\nAn error occurred: {}", e);
        }
    }
    // The camera handle is released inside `capture::run` on every path.
    println!("Camera gracefully stopped. Exiting.");
}

fn run(property: &PlantProperty) -> Result<CaptureOutcome, Box<dyn std::error::Error>> {
    let conf = &property.conf.camera;
    let mut operator = ConsoleOperator::new()?;
    println!("Initializing camera {}...", conf.device);
    let driver = V4l2Camera::new(&conf.device, conf.grab_times, &property.path.img.preview)?;
    Ok(capture::run(driver, conf, &mut operator)?)
}
