//! Camera Functions
//!
//! A camera is driven through two mutually exclusive configurations, preview
//! and still. The stream must be stopped before it is reconfigured and
//! configured before it is started again.
//!
//! [`CameraHandle`] checks that order at run time and releases the driver
//! exactly once when dropped. [`Camera`] encodes the preview/still state in
//! its type so the only way to reach still mode is [`Camera::into_still`].

use rscam::Camera as RsCamera;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::module::error::CameraError;

/// Pixel resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Camera configuration states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Preview, // low resolution live feed
    Still,   // high resolution single frame
}

/// A configuration applied to a stopped camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub mode: Mode,
    pub resolution: Resolution,
    pub fps: u32,
}

/// Operations a camera driver provides.
///
/// Drivers may assume the calls arrive in a valid order; [`CameraHandle`]
/// enforces it.
pub trait CameraDriver {
    /// Apply a configuration. Only called while stopped.
    fn configure(&mut self, config: &StreamConfig) -> Result<(), CameraError>;
    /// Start streaming with the last configuration.
    fn start(&mut self) -> Result<(), CameraError>;
    /// Stop streaming.
    fn stop(&mut self) -> Result<(), CameraError>;
    fn start_preview(&mut self) -> Result<(), CameraError>;
    fn stop_preview(&mut self) -> Result<(), CameraError>;
    /// Show the newest frame to the operator.
    fn render_preview(&mut self) -> Result<(), CameraError>;
    /// Write one frame to `path`. The file must not exist afterwards on failure.
    fn capture_file(&mut self, path: &Path) -> Result<(), CameraError>;
    /// Give the device back. Called exactly once, after streaming has stopped.
    fn release(&mut self);
}

/// Exclusive owner of a camera driver.
///
/// Dropping the handle stops preview and streaming if they are still active and
/// then releases the driver. This runs on every exit path, including early
/// returns and unwinding.
pub struct CameraHandle<D: CameraDriver> {
    driver: D,
    config: Option<StreamConfig>,
    streaming: bool,
    previewing: bool,
}

impl<D: CameraDriver> CameraHandle<D> {
    /// Take ownership of an opened driver. The handle starts stopped and unconfigured.
    pub fn open(driver: D) -> Self {
        log::info!("Camera opened");
        Self {
            driver,
            config: None,
            streaming: false,
            previewing: false,
        }
    }

    pub fn configure(&mut self, config: StreamConfig) -> Result<(), CameraError> {
        if self.streaming {
            return Err(CameraError::Busy);
        }
        self.driver.configure(&config)?;
        log::info!("Camera configured: {:?} {}", config.mode, config.resolution);
        self.config = Some(config);
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), CameraError> {
        if self.config.is_none() {
            return Err(CameraError::NotConfigured);
        }
        if self.streaming {
            return Err(CameraError::Busy);
        }
        self.driver.start()?;
        self.streaming = true;
        Ok(())
    }

    /// Stop streaming. A stopped handle is left as is.
    pub fn stop(&mut self) -> Result<(), CameraError> {
        if !self.streaming {
            return Ok(());
        }
        self.driver.stop()?;
        self.streaming = false;
        Ok(())
    }

    pub fn start_preview(&mut self) -> Result<(), CameraError> {
        if self.previewing {
            return Ok(());
        }
        self.driver.start_preview()?;
        self.previewing = true;
        Ok(())
    }

    pub fn stop_preview(&mut self) -> Result<(), CameraError> {
        if !self.previewing {
            return Ok(());
        }
        self.driver.stop_preview()?;
        self.previewing = false;
        Ok(())
    }

    pub fn render_preview(&mut self) -> Result<(), CameraError> {
        if !self.streaming || !self.previewing {
            return Err(CameraError::NotStreaming);
        }
        self.driver.render_preview()
    }

    pub fn capture_file(&mut self, path: &Path) -> Result<(), CameraError> {
        if !self.streaming {
            return Err(CameraError::NotStreaming);
        }
        self.driver.capture_file(path)
    }

    /// Mode of the last applied configuration.
    pub fn mode(&self) -> Option<Mode> {
        self.config.map(|c| c.mode)
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }
}

impl<D: CameraDriver> Drop for CameraHandle<D> {
    fn drop(&mut self) {
        if let Err(e) = self.stop_preview() {
            log::warn!("Failed to stop preview on release: {}", e);
        }
        if let Err(e) = self.stop() {
            log::warn!("Failed to stop camera on release: {}", e);
        }
        self.driver.release();
        log::info!("Camera released");
    }
}

/// Typestate marker: preview configuration applied and streaming.
#[derive(Debug)]
pub struct Preview;

/// Typestate marker: still configuration applied and streaming.
#[derive(Debug)]
pub struct Still;

/// A streaming camera in mode `M`.
pub struct Camera<D: CameraDriver, M> {
    handle: CameraHandle<D>,
    _mode: PhantomData<M>,
}

impl<D: CameraDriver> Camera<D, Preview> {
    /// Open the driver, apply the preview configuration and start preview and streaming.
    ///
    /// On failure the driver is released before returning.
    pub fn open(driver: D, resolution: Resolution, fps: u32) -> Result<Self, CameraError> {
        let mut handle = CameraHandle::open(driver);
        handle.configure(StreamConfig {
            mode: Mode::Preview,
            resolution,
            fps,
        })?;
        handle.start_preview()?;
        handle.start()?;
        Ok(Self {
            handle,
            _mode: PhantomData,
        })
    }

    /// Refresh the preview once.
    pub fn refresh(&mut self) -> Result<(), CameraError> {
        self.handle.render_preview()
    }

    /// Switch to still mode: stop preview, stop streaming, reconfigure, restart.
    pub fn into_still(mut self, resolution: Resolution, fps: u32) -> Result<Camera<D, Still>, CameraError> {
        self.handle.stop_preview()?;
        self.handle.stop()?;
        log::info!("Camera stopped for reconfiguration");
        self.handle.configure(StreamConfig {
            mode: Mode::Still,
            resolution,
            fps,
        })?;
        self.handle.start()?;
        Ok(Camera {
            handle: self.handle,
            _mode: PhantomData,
        })
    }
}

impl<D: CameraDriver> Camera<D, Still> {
    /// Capture one frame to `path`.
    pub fn capture_file(&mut self, path: &Path) -> Result<(), CameraError> {
        self.handle.capture_file(path)
    }
}

impl<D: CameraDriver, M> Camera<D, M> {
    pub fn handle(&self) -> &CameraHandle<D> {
        &self.handle
    }
}

/// Represents a V4L2 camera configuration and capture functionality.
///
pub struct V4l2Camera {
    device: String,
    cap: Option<RsCamera>, // None once released.
    config: Option<StreamConfig>,
    grab_times: u8,        // Frames grabbed per still; the last one is kept.
    preview_path: PathBuf, // Where the newest preview frame is written.
}

impl V4l2Camera {
    /// Opens the V4L2 device.
    ///
    /// # Arguments
    ///
    /// * `device` - Device node such as `/dev/video0`.
    /// * `grab_times` - Frames grabbed per still capture; earlier ones flush stale buffers.
    /// * `preview_path` - File refreshed with the newest frame while previewing.
    ///
    pub fn new(device: &str, grab_times: u8, preview_path: impl Into<PathBuf>) -> Result<Self, CameraError> {
        let cap = RsCamera::new(device).map_err(|source| CameraError::Open {
            device: device.to_owned(),
            source,
        })?;
        Ok(Self {
            device: device.to_owned(),
            cap: Some(cap),
            config: None,
            grab_times,
            preview_path: preview_path.into(),
        })
    }

    fn cap(&self) -> Result<&RsCamera, CameraError> {
        self.cap.as_ref().ok_or(CameraError::Released)
    }

    fn cap_mut(&mut self) -> Result<&mut RsCamera, CameraError> {
        self.cap.as_mut().ok_or(CameraError::Released)
    }

    /// Grab `grab_times` frames and return the last one.
    fn grab(&self) -> Result<rscam::Frame, CameraError> {
        let cap = self.cap()?;
        for _ in 1..self.grab_times {
            let _ = cap.capture()?; // Grab a frame to reduce delay.
        }
        Ok(cap.capture()?)
    }
}

impl CameraDriver for V4l2Camera {
    fn configure(&mut self, config: &StreamConfig) -> Result<(), CameraError> {
        // V4L2 takes the format at stream start, so it is kept until then.
        self.config = Some(*config);
        Ok(())
    }

    fn start(&mut self) -> Result<(), CameraError> {
        let config = self.config.ok_or(CameraError::NotConfigured)?;
        self.cap_mut()?
            .start(&rscam::Config {
                interval: (1, config.fps),
                resolution: (config.resolution.width, config.resolution.height),
                format: b"MJPG",
                nbuffers: 1,
                ..Default::default()
            })
            .map_err(|e| CameraError::Driver(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), CameraError> {
        self.cap_mut()?
            .stop()
            .map_err(|e| CameraError::Driver(e.to_string()))
    }

    fn start_preview(&mut self) -> Result<(), CameraError> {
        log::info!("Preview frames go to {}", self.preview_path.display());
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    fn render_preview(&mut self) -> Result<(), CameraError> {
        let frame = self.cap()?.capture()?;
        // Replace atomically so a viewer never reads a half written frame.
        let part = self.preview_path.with_extension("part");
        fs::write(&part, &frame[..])?;
        fs::rename(&part, &self.preview_path)?;
        Ok(())
    }

    fn capture_file(&mut self, path: &Path) -> Result<(), CameraError> {
        let frame = self.grab()?;
        Ok(write_new(path, &frame[..])?)
    }

    fn release(&mut self) {
        if self.cap.take().is_some() {
            log::info!("Closed {}", self.device);
        }
    }
}

/// Write `bytes` to a file that must not exist yet. A partly written file is removed.
fn write_new(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    if let Err(e) = file.write_all(bytes).and_then(|_| file.sync_all()) {
        let _ = fs::remove_file(path);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod mock {
    //! Recording driver for sequence tests.

    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Call {
        Configure(Mode),
        Start,
        Stop,
        StartPreview,
        StopPreview,
        RenderPreview,
        Capture,
        Release,
    }

    /// Shared call log; stays readable after the driver is dropped.
    pub type CallLog = Rc<RefCell<Vec<Call>>>;

    /// Records every call. `fail_on` makes the first matching call fail.
    /// `foreign_file` is written to the capture path just before the driver's
    /// own write, as another process would.
    pub struct RecordingDriver {
        pub log: CallLog,
        pub fail_on: Option<Call>,
        pub foreign_file: Option<&'static [u8]>,
    }

    impl RecordingDriver {
        pub fn new() -> (Self, CallLog) {
            let log = CallLog::default();
            (
                Self {
                    log: log.clone(),
                    fail_on: None,
                    foreign_file: None,
                },
                log,
            )
        }

        pub fn failing_on(call: Call) -> (Self, CallLog) {
            let (mut driver, log) = Self::new();
            driver.fail_on = Some(call);
            (driver, log)
        }

        fn record(&mut self, call: Call) -> Result<(), CameraError> {
            self.log.borrow_mut().push(call);
            if self.fail_on == Some(call) {
                self.fail_on = None;
                return Err(CameraError::Driver(format!("{:?} failed", call)));
            }
            Ok(())
        }
    }

    impl CameraDriver for RecordingDriver {
        fn configure(&mut self, config: &StreamConfig) -> Result<(), CameraError> {
            self.record(Call::Configure(config.mode))
        }
        fn start(&mut self) -> Result<(), CameraError> {
            self.record(Call::Start)
        }
        fn stop(&mut self) -> Result<(), CameraError> {
            self.record(Call::Stop)
        }
        fn start_preview(&mut self) -> Result<(), CameraError> {
            self.record(Call::StartPreview)
        }
        fn stop_preview(&mut self) -> Result<(), CameraError> {
            self.record(Call::StopPreview)
        }
        fn render_preview(&mut self) -> Result<(), CameraError> {
            self.record(Call::RenderPreview)
        }
        fn capture_file(&mut self, path: &Path) -> Result<(), CameraError> {
            self.record(Call::Capture)?;
            if let Some(bytes) = self.foreign_file {
                fs::write(path, bytes)?;
            }
            Ok(write_new(path, b"\xff\xd8\xff\xd9")?)
        }
        fn release(&mut self) {
            self.log.borrow_mut().push(Call::Release);
        }
    }

    /// No `Configure` while streaming: between the last `Start` and a
    /// `Configure` there must be a `Stop`.
    pub fn never_configured_while_streaming(calls: &[Call]) -> bool {
        let mut streaming = false;
        for call in calls {
            match call {
                Call::Start => streaming = true,
                Call::Stop => streaming = false,
                Call::Configure(_) if streaming => return false,
                _ => (),
            }
        }
        true
    }
}
