//! This module is responsible for preparing the resources needed by the application, such as directories, configurations, logs, etc.
//!

use std::str::FromStr;

use crate::module::define;

pub mod resource {
    use super::PlantProperty;
    use crate::module::define;

    /// Initialize the application resources and return a PlantProperty instance containing paths and configurations.
    ///
    /// The config is read from (or generated in) `define::path::DATA_DIR`.
    pub fn init() -> Result<PlantProperty, Box<dyn std::error::Error>> {
        init_in(define::path::DATA_DIR)
    }

    /// Same as [`init`] with an explicit data directory.
    pub fn init_in(data_dir: &str) -> Result<PlantProperty, Box<dyn std::error::Error>> {
        let conf = crate::module::util::conf::toml::load(data_dir)?;
        let paths = crate::module::util::path::dir::create_app_sub_dir(data_dir, &conf)?;
        Ok(PlantProperty { path: paths, conf })
    }
}

/// This struct represents the properties of the app, such as paths and configurations.
///
#[derive(Debug, Clone)]
pub struct PlantProperty {
    pub path: crate::module::util::path::PlantPath, // The paths of the app resources
    pub conf: crate::module::util::conf::Config,    // The configurations of the app
}

/// This function initializes the logger system using the log4rs crate.
///
/// # Arguments
/// * `dir` - The data directory; the log file is written to `<dir>/log/<name>.log`
/// * `name` - The name of the log file
/// * `level` - Level filter name such as `INFO`; unknown names fall back to `INFO`
///
/// # Log Example
/// ```
/// log::info!("Info Message");
/// log::error!("Error Message");
/// ```
pub fn init_log(dir: &str, name: &str, level: &str) -> Result<(), Box<dyn std::error::Error>> {
    use crate::module::util::path::join;
    use log::LevelFilter;
    use log4rs::append::file::FileAppender;
    use log4rs::config::{Appender, Config, Root};
    use log4rs::encode::pattern::PatternEncoder;

    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);

    let logfile = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{h({d} - {l}: {m}{n})}")))
        .build(join(&[dir, define::path::LOG_DIR, &format!("{}.log", name)]))?;

    let config = Config::builder()
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .build(Root::builder().appender("logfile").build(level))?;
    log4rs::init_config(config)?;
    Ok(())
}
