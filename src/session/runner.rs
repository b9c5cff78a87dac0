//! Feed runner
//!
//! Drives the two periodic cycles of a session:
//!
//! - refresh: read a frame, publish it for detection and show it on the feed
//! - detect: threshold the newest frame, check for interference, detect and
//!   resolve a shot
//!
//! Both ticks are also exposed as plain methods so hosts and tests can drive
//! the pipeline deterministically from one thread.

use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use super::context::SessionContext;
use super::hit::HitOutcome;
use super::prompt::UserPrompt;
use super::scheduler::{PeriodicTask, ShutdownLatch};
use crate::config::RunnerConfig;
use crate::surface::{FeedImage, Point};
use crate::vision::{FrameCell, FrameSource, InterferenceMonitor, LaserColor, ShotDetector};
use crate::{Result, ShootOffError};

struct Shared {
    session: Mutex<SessionContext>,
    frames: FrameCell,
    monitor: Mutex<InterferenceMonitor>,
    source: Mutex<Option<Box<dyn FrameSource>>>,
    prompt: Arc<dyn UserPrompt + Send + Sync>,
    latch: ShutdownLatch,
    /// Consecutive failed reads
    missed_frames: AtomicU32,
    config: Mutex<RunnerConfig>,
}

impl Shared {
    fn refresh_tick(&self) -> bool {
        if self.latch.is_set() {
            return false;
        }

        let read = {
            let mut source = self.source.lock();
            let Some(source) = source.as_mut() else {
                return false;
            };
            source.read()
        };

        let frame = match read {
            Ok(frame) => frame,
            Err(e) => {
                self.frame_missed(e);
                return false;
            }
        };
        self.missed_frames.store(0, Ordering::SeqCst);

        let show_mask = self.monitor.lock().take_view_tick();
        let frame = self.frames.publish(frame);

        let mut session = self.session.lock();
        if show_mask {
            let mask = ShotDetector::from_preferences(session.preferences()).threshold(&frame);
            session.show_feed(FeedImage::Mask(&mask));
        } else {
            session.show_feed(FeedImage::Color(frame.image()));
        }
        true
    }

    fn frame_missed(&self, error: ShootOffError) {
        let missed = self.missed_frames.fetch_add(1, Ordering::SeqCst) + 1;
        let limit = self.config.lock().max_missed_frames;
        log::debug!("Missed frame {} of {}: {}", missed, limit, error);

        if missed >= limit {
            log::error!("Webcam lost after {} consecutive missed frames", missed);
            self.prompt.show_error(
                "Webcam Disconnected",
                "Missed too many webcam frames. The camera is probably disconnected, so \
                 ShootOFF will stop.",
            );
            self.latch.trigger();
        }
    }

    fn detect_tick(&self) -> Option<HitOutcome> {
        if self.latch.is_set() {
            return None;
        }

        let frame = self.frames.latest()?;
        let detector = ShotDetector::from_preferences(self.session.lock().preferences());
        let mask = detector.threshold(&frame);

        {
            let mut monitor = self.monitor.lock();
            if !monitor.has_seen() {
                monitor.observe(&mask, self.prompt.as_ref());
            }
        }

        let candidate = detector.detect_in_mask(&frame, &mask)?;
        Some(self.session.lock().handle_shot(candidate))
    }
}

/// Owns a session and the periodic tasks feeding it
pub struct FeedRunner {
    shared: Arc<Shared>,
    tasks: Vec<PeriodicTask>,
}

impl FeedRunner {
    pub fn new(
        config: RunnerConfig,
        session: SessionContext,
        prompt: Arc<dyn UserPrompt + Send + Sync>,
    ) -> Self {
        let monitor = InterferenceMonitor::new(config.interference_ticks());
        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                frames: FrameCell::new(),
                monitor: Mutex::new(monitor),
                source: Mutex::new(None),
                prompt,
                latch: ShutdownLatch::new(),
                missed_frames: AtomicU32::new(0),
                config: Mutex::new(config),
            }),
            tasks: Vec::new(),
        }
    }

    /// Attach a frame source without starting the periodic tasks.
    ///
    /// A source that cannot be opened is fatal: the user is told and the
    /// shutdown latch is set.
    pub fn open(&self, mut source: Box<dyn FrameSource>) -> Result<()> {
        if !source.is_opened() {
            log::error!("Capture source could not be opened");
            self.shared.prompt.show_error(
                "Webcam Unavailable",
                "Couldn't connect to the webcam. Make sure it is plugged in and not used by \
                 another program.",
            );
            self.shared.latch.trigger();
            return Err(ShootOffError::CaptureUnavailable);
        }

        let mut config = self.shared.config.lock();
        let (min_width, min_height) = config.min_resolution;
        let (width, height) = source.resolution();
        if width < min_width && height < min_height {
            log::info!(
                "Capture resolution {}x{} is too small, requesting {}x{}",
                width,
                height,
                min_width,
                min_height
            );
            if let Err(e) = source.set_resolution(min_width, min_height) {
                log::warn!("Capture source refused {}x{}: {}", min_width, min_height, e);
            }
        }

        let fps = source.frame_rate();
        *config = config.clone().with_frame_rate(fps);
        *self.shared.monitor.lock() = InterferenceMonitor::new(config.interference_ticks());

        log::info!(
            "Capture source opened at {}x{}, refreshing every {:?}",
            source.resolution().0,
            source.resolution().1,
            config.feed_interval
        );

        self.shared.missed_frames.store(0, Ordering::SeqCst);
        self.shared.frames.clear();
        *self.shared.source.lock() = Some(source);
        Ok(())
    }

    /// Open the source and start the refresh and detection tasks.
    ///
    /// A runner cannot be restarted once its latch is set, whether by
    /// `stop` or by a lost camera.
    pub fn start(&mut self, source: Box<dyn FrameSource>) -> Result<()> {
        if !self.tasks.is_empty() {
            return Err(ShootOffError::AlreadyRunning);
        }
        if self.shared.latch.is_set() {
            return Err(ShootOffError::ShutDown);
        }

        self.open(source)?;

        let feed_interval = self.shared.config.lock().feed_interval;
        let detection_interval = self.shared.session.lock().preferences().detection_interval();

        let shared = self.shared.clone();
        let refresh = PeriodicTask::spawn(
            "shootoff-feed",
            feed_interval,
            self.shared.latch.clone(),
            move || {
                shared.refresh_tick();
            },
        )?;
        self.tasks.push(refresh);

        let shared = self.shared.clone();
        let detect = PeriodicTask::spawn(
            "shootoff-detect",
            detection_interval,
            self.shared.latch.clone(),
            move || {
                shared.detect_tick();
            },
        );
        match detect {
            Ok(task) => self.tasks.push(task),
            Err(e) => {
                self.stop();
                return Err(e);
            }
        }

        log::info!("Feed runner started");
        Ok(())
    }

    /// Set the latch and wait for both tasks to finish their current tick
    pub fn stop(&mut self) {
        self.shared.latch.trigger();
        if self.tasks.is_empty() {
            return;
        }
        for task in self.tasks.drain(..) {
            task.join();
        }
        log::info!("Feed runner stopped");
    }

    /// Read and show one frame. Returns true if a frame was shown.
    pub fn refresh_tick(&self) -> bool {
        self.shared.refresh_tick()
    }

    /// Run detection once on the newest frame
    pub fn detect_tick(&self) -> Option<HitOutcome> {
        self.shared.detect_tick()
    }

    /// Click on the feed; becomes a shot when debug is on
    pub fn inject_click(&self, color: LaserColor, point: Point) -> Option<HitOutcome> {
        self.shared.session.lock().inject_shot(color, point)
    }

    pub fn session(&self) -> MutexGuard<'_, SessionContext> {
        self.shared.session.lock()
    }

    pub fn latch(&self) -> ShutdownLatch {
        self.shared.latch.clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.latch.is_set()
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty() && !self.is_shutdown()
    }

    pub fn missed_frames(&self) -> u32 {
        self.shared.missed_frames.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> RunnerConfig {
        self.shared.config.lock().clone()
    }

    /// Whether the interference warning has been raised this session
    pub fn interference_seen(&self) -> bool {
        self.shared.monitor.lock().has_seen()
    }
}

impl Drop for FeedRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preferences;
    use crate::protocols::NullAudio;
    use crate::session::HeadlessPrompt;
    use crate::surface::MemoryCanvas;
    use crate::vision::{Frame, FrameSequence};
    use image::RgbImage;
    use std::time::Duration;

    fn runner() -> FeedRunner {
        let session = SessionContext::new(
            Preferences::default(),
            MemoryCanvas::shared(640, 480),
            Arc::new(NullAudio),
        );
        FeedRunner::new(RunnerConfig::default(), session, Arc::new(HeadlessPrompt))
    }

    fn dark_frame(width: u32, height: u32) -> Frame {
        Frame::new(RgbImage::new(width, height))
    }

    #[test]
    fn test_unopened_source_is_fatal() {
        let runner = runner();
        let source = FrameSequence::new(Vec::new(), false);

        assert!(matches!(
            runner.open(Box::new(source)),
            Err(ShootOffError::CaptureUnavailable)
        ));
        assert!(runner.is_shutdown());
        assert!(!runner.refresh_tick());
    }

    #[test]
    fn test_open_applies_frame_rate() {
        let runner = runner();
        let source = FrameSequence::new(vec![dark_frame(8, 8)], true).with_frame_rate(20.0);

        runner.open(Box::new(source)).unwrap();
        assert_eq!(runner.config().feed_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_detect_without_frame_is_noop() {
        let runner = runner();
        assert!(runner.detect_tick().is_none());
        assert!(!runner.is_shutdown());
    }

    #[test]
    fn test_start_twice() {
        let mut runner = runner();
        let frames = || Box::new(FrameSequence::new(vec![dark_frame(8, 8)], true));

        runner.start(frames()).unwrap();
        assert!(runner.is_running());
        assert!(matches!(runner.start(frames()), Err(ShootOffError::AlreadyRunning)));

        runner.stop();
        assert!(!runner.is_running());
        assert!(runner.is_shutdown());
    }

    #[test]
    fn test_start_after_stop_is_refused() {
        let mut runner = runner();
        let frames = || Box::new(FrameSequence::new(vec![dark_frame(8, 8)], true));

        runner.start(frames()).unwrap();
        runner.stop();

        assert!(matches!(runner.start(frames()), Err(ShootOffError::ShutDown)));
        assert!(!runner.is_running());
    }

    #[test]
    fn test_start_after_lost_camera_is_refused() {
        let mut runner = runner();
        runner.latch().trigger();
        let frames = Box::new(FrameSequence::new(vec![dark_frame(8, 8)], true));

        assert!(matches!(runner.start(frames), Err(ShootOffError::ShutDown)));
    }
}
