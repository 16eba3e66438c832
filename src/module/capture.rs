//! Preview-then-still capture sequence.
//!

use chrono::Local;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::{thread, time};

use crate::module::error::{CameraError, CaptureError};
use crate::module::util::{conf, path};
use crate::module::vision::camera::{Camera, CameraDriver, Preview};

/// What the operator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Capture,
    Cancel,
}

/// Source of the operator's decision. Polled while the preview runs.
pub trait Operator {
    /// `None` while the operator has not decided yet.
    fn poll(&mut self) -> Option<Decision>;

    /// Whether the operator aborted after deciding to capture.
    fn interrupted(&self) -> bool {
        false
    }
}

/// Result of a capture run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Captured(PathBuf),
    Cancelled,
}

/// Run the capture sequence once.
///
/// Preview at the preview resolution until the operator decides, then switch
/// to the capture resolution and write `image_<timestamp>.jpg` into
/// `conf.output_dir`. The driver is released before this returns, whatever
/// the outcome.
pub fn run<D, O>(driver: D, conf: &conf::Camera, operator: &mut O) -> Result<CaptureOutcome, CaptureError>
where
    D: CameraDriver,
    O: Operator + ?Sized,
{
    let preview = conf.preview_resolution();
    let mut camera = Camera::open(driver, preview, conf.fps)?;
    println!("Camera preview started. Resolution: {}", preview);
    log::info!("Preview started at {}", preview);

    println!("Waiting for camera to warm up...");
    thread::sleep(time::Duration::from_millis(conf.warmup_ms));

    println!("Press 'Enter' to take a picture, or 'Ctrl+C' to quit preview and exit.");
    let interval = time::Duration::from_millis(conf.preview_interval_ms);
    if wait_for_operator(&mut camera, operator, interval)? == Decision::Cancel {
        log::info!("Capture cancelled by operator");
        return Ok(CaptureOutcome::Cancelled);
    }

    let still = conf.capture_resolution();
    let mut camera = camera.into_still(still, conf.fps)?;
    println!("Capture resolution set to: {}", still);
    if operator.interrupted() {
        log::info!("Capture interrupted after reconfiguration");
        return Ok(CaptureOutcome::Cancelled);
    }
    thread::sleep(time::Duration::from_millis(conf.settle_ms));
    if operator.interrupted() {
        log::info!("Capture interrupted while settling");
        return Ok(CaptureOutcome::Cancelled);
    }

    let path = Path::new(&conf.output_dir).join(path::capture_file_name(&Local::now()));
    if path.exists() {
        return Err(CaptureError::Exists(path));
    }
    // The driver cleans up its own partial write; a file that appeared in
    // the meantime belongs to someone else and is left alone.
    match camera.capture_file(&path) {
        Ok(()) => {}
        Err(CameraError::Io(e)) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(CaptureError::Exists(path));
        }
        Err(e) => return Err(e.into()),
    }
    log::info!("Captured {}", path.display());
    Ok(CaptureOutcome::Captured(path))
}

/// Keep the preview fresh until the operator decides. No timeout.
fn wait_for_operator<D, O>(
    camera: &mut Camera<D, Preview>,
    operator: &mut O,
    interval: time::Duration,
) -> Result<Decision, CaptureError>
where
    D: CameraDriver,
    O: Operator + ?Sized,
{
    loop {
        if let Some(decision) = operator.poll() {
            return Ok(decision);
        }
        camera.refresh()?;
        thread::sleep(interval);
    }
}

/// Set by the first Ctrl+C.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Operator at the terminal: Enter captures, Ctrl+C or end of input cancels.
pub struct ConsoleOperator {
    rx: Receiver<Decision>,
}

impl ConsoleOperator {
    /// Install the Ctrl+C handler and start reading stdin.
    ///
    /// The first Ctrl+C cancels the run; a second one exits the process, for
    /// a device blocked in a read. Call once per process; `ctrlc` refuses a
    /// second handler.
    pub fn new() -> Result<Self, ctrlc::Error> {
        ctrlc::set_handler(|| {
            if INTERRUPTED.swap(true, Ordering::SeqCst) {
                log::warn!("Interrupted twice, exiting");
                std::process::exit(130);
            }
        })?;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut line = String::new();
            let decision = match io::stdin().lock().read_line(&mut line) {
                Ok(0) | Err(_) => Decision::Cancel,
                Ok(_) => Decision::Capture,
            };
            let _ = tx.send(decision);
        });
        Ok(Self { rx })
    }
}

impl Operator for ConsoleOperator {
    fn poll(&mut self) -> Option<Decision> {
        if INTERRUPTED.load(Ordering::SeqCst) {
            return Some(Decision::Cancel);
        }
        match self.rx.try_recv() {
            Ok(decision) => Some(decision),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Decision::Cancel),
        }
    }

    fn interrupted(&self) -> bool {
        INTERRUPTED.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::vision::camera::mock::{never_configured_while_streaming, Call, RecordingDriver};
    use crate::module::vision::camera::Mode;
    use std::fs;

    /// Decides after a fixed number of empty polls.
    struct Scripted {
        pending: usize,
        decision: Decision,
    }

    impl Operator for Scripted {
        fn poll(&mut self) -> Option<Decision> {
            if self.pending == 0 {
                return Some(self.decision);
            }
            self.pending -= 1;
            None
        }
    }

    /// Confirms the capture, then presses Ctrl+C.
    struct ConfirmThenInterrupt {
        confirmed: bool,
    }

    impl Operator for ConfirmThenInterrupt {
        fn poll(&mut self) -> Option<Decision> {
            self.confirmed = true;
            Some(Decision::Capture)
        }

        fn interrupted(&self) -> bool {
            self.confirmed
        }
    }

    fn test_conf(output_dir: &Path) -> conf::Camera {
        let mut camera = conf::Config::builtin().unwrap().camera;
        camera.warmup_ms = 0;
        camera.settle_ms = 0;
        camera.preview_interval_ms = 0;
        camera.output_dir = output_dir.to_string_lossy().into_owned();
        camera
    }

    fn output_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn count(calls: &[Call], call: Call) -> usize {
        calls.iter().filter(|c| **c == call).count()
    }

    #[test]
    fn capture_writes_one_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let (driver, log) = RecordingDriver::new();
        let mut operator = Scripted {
            pending: 3,
            decision: Decision::Capture,
        };

        let outcome = run(driver, &test_conf(dir.path()), &mut operator).unwrap();

        let files = output_files(dir.path());
        assert_eq!(files.len(), 1);
        let name = &files[0];
        assert!(name.starts_with("image_") && name.ends_with(".jpg"));
        let digits: String = name.chars().filter(|c| c.is_ascii_digit()).collect();
        assert_eq!(digits.len(), 14);
        assert_eq!(outcome, CaptureOutcome::Captured(dir.path().join(name)));

        let calls = log.borrow();
        assert_eq!(count(&calls, Call::RenderPreview), 3);
        assert_eq!(count(&calls, Call::Release), 1);
        assert_eq!(calls.last(), Some(&Call::Release));
        assert!(never_configured_while_streaming(&calls));
        // Stop preview and stream before the still configuration.
        let still = calls
            .iter()
            .position(|c| *c == Call::Configure(Mode::Still))
            .unwrap();
        assert_eq!(&calls[still - 2..still], &[Call::StopPreview, Call::Stop]);
    }

    #[test]
    fn cancel_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (driver, log) = RecordingDriver::new();
        let mut operator = Scripted {
            pending: 1,
            decision: Decision::Cancel,
        };

        let outcome = run(driver, &test_conf(dir.path()), &mut operator).unwrap();

        assert_eq!(outcome, CaptureOutcome::Cancelled);
        assert!(output_files(dir.path()).is_empty());
        let calls = log.borrow();
        assert_eq!(count(&calls, Call::Release), 1);
        assert_eq!(count(&calls, Call::Capture), 0);
        assert!(!calls.contains(&Call::Configure(Mode::Still)));
    }

    #[test]
    fn driver_failure_releases_and_writes_nothing() {
        for failing in [
            Call::Configure(Mode::Preview),
            Call::RenderPreview,
            Call::Stop,
            Call::Configure(Mode::Still),
            Call::Capture,
        ] {
            let dir = tempfile::tempdir().unwrap();
            let (driver, log) = RecordingDriver::failing_on(failing);
            let mut operator = Scripted {
                pending: 1,
                decision: Decision::Capture,
            };

            let res = run(driver, &test_conf(dir.path()), &mut operator);

            assert!(res.is_err(), "{:?} should fail the run", failing);
            assert!(output_files(dir.path()).is_empty());
            let calls = log.borrow();
            assert_eq!(count(&calls, Call::Release), 1, "{:?}", failing);
            assert!(never_configured_while_streaming(&calls));
        }
    }

    #[test]
    fn interrupt_after_confirm_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (driver, log) = RecordingDriver::new();
        let mut operator = ConfirmThenInterrupt { confirmed: false };

        let outcome = run(driver, &test_conf(dir.path()), &mut operator).unwrap();

        assert_eq!(outcome, CaptureOutcome::Cancelled);
        assert!(output_files(dir.path()).is_empty());
        let calls = log.borrow();
        assert_eq!(count(&calls, Call::Capture), 0);
        assert_eq!(count(&calls, Call::Release), 1);
        assert_eq!(calls.last(), Some(&Call::Release));
    }

    #[test]
    fn file_appearing_during_capture_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let (mut driver, log) = RecordingDriver::new();
        driver.foreign_file = Some(&b"someone else's photo"[..]);
        let mut operator = Scripted {
            pending: 0,
            decision: Decision::Capture,
        };

        let res = run(driver, &test_conf(dir.path()), &mut operator);

        let path = match res {
            Err(CaptureError::Exists(path)) => path,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(fs::read(&path).unwrap(), b"someone else's photo");
        assert_eq!(output_files(dir.path()).len(), 1);
        assert_eq!(count(&log.borrow(), Call::Release), 1);
    }

    #[test]
    fn console_operator_decisions() {
        let (tx, rx) = mpsc::channel();
        let mut operator = ConsoleOperator { rx };
        assert_eq!(operator.poll(), None);
        tx.send(Decision::Capture).unwrap();
        assert_eq!(operator.poll(), Some(Decision::Capture));
        drop(tx);
        assert_eq!(operator.poll(), Some(Decision::Cancel));
    }
}
