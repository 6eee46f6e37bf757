//! Presentation of counts and annotated frames.

use std::sync::Arc;

use crate::hand::fingers::FingerCount;
use crate::image::Image;
use crate::indicator::IndicatorState;

/// Receives the results of the frame pipeline.
///
/// Frames and counts are delivered separately, and in concurrent mode possibly at different
/// rates. A count of zero is the normal state when no hand is visible.
pub trait Sink {
    /// Shows an annotated frame.
    fn show_frame(&mut self, frame: Arc<Image>) -> anyhow::Result<()>;

    /// Shows the latest finger count.
    fn show_count(&mut self, count: FingerCount) -> anyhow::Result<()>;

    /// Tells the user that the pipeline failed and is shutting down.
    fn show_error(&mut self, message: &str) {
        log::error!("{message}");
    }

    /// Returns `false` once the user has closed the presentation, which stops the pipeline.
    fn is_open(&self) -> bool {
        true
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn show_frame(&mut self, frame: Arc<Image>) -> anyhow::Result<()> {
        (**self).show_frame(frame)
    }

    fn show_count(&mut self, count: FingerCount) -> anyhow::Result<()> {
        (**self).show_count(count)
    }

    fn show_error(&mut self, message: &str) {
        (**self).show_error(message)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// A [`Sink`] that logs count changes together with the LED pattern.
#[derive(Default)]
pub struct LogSink {
    last: Option<FingerCount>,
    frames: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for LogSink {
    fn show_frame(&mut self, frame: Arc<Image>) -> anyhow::Result<()> {
        self.frames += 1;
        log::trace!("frame #{} ({})", self.frames, frame.resolution());
        Ok(())
    }

    fn show_count(&mut self, count: FingerCount) -> anyhow::Result<()> {
        if self.last != Some(count) {
            let leds = IndicatorState::new(count);
            log::info!("{count} finger(s) {leds}");
            self.last = Some(count);
        }
        Ok(())
    }
}

/// A [`Sink`] that keeps everything it receives.
#[derive(Default)]
pub struct Recorder {
    frames: Vec<Arc<Image>>,
    counts: Vec<FingerCount>,
    errors: Vec<String>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Arc<Image>] {
        &self.frames
    }

    pub fn counts(&self) -> &[FingerCount] {
        &self.counts
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// The most recent count, or zero if none was received yet.
    pub fn last_count(&self) -> FingerCount {
        self.counts.last().copied().unwrap_or_default()
    }

    /// The LED state for the most recent count.
    pub fn indicator(&self) -> IndicatorState {
        IndicatorState::new(self.last_count())
    }
}

impl Sink for Recorder {
    fn show_frame(&mut self, frame: Arc<Image>) -> anyhow::Result<()> {
        self.frames.push(frame);
        Ok(())
    }

    fn show_count(&mut self, count: FingerCount) -> anyhow::Result<()> {
        self.counts.push(count);
        Ok(())
    }

    fn show_error(&mut self, message: &str) {
        log::error!("{message}");
        self.errors.push(message.to_string());
    }
}

#[cfg(feature = "window")]
pub use window::WindowSink;

#[cfg(feature = "window")]
mod window {
    use std::sync::Arc;

    use minifb::{Key, Window, WindowOptions};

    use crate::hand::fingers::FingerCount;
    use crate::image::{Color, Image};
    use crate::indicator::IndicatorState;

    use super::Sink;

    /// A [`Sink`] that shows frames in a native window.
    ///
    /// The window is opened when the first frame arrives and sized to fit it. The current count
    /// and LED pattern are shown in the title bar. Closing the window or pressing Escape closes
    /// the sink.
    pub struct WindowSink {
        title: String,
        window: Option<Window>,
        buffer: Vec<u32>,
        closed: bool,
    }

    impl WindowSink {
        pub fn new(title: impl Into<String>) -> Self {
            Self {
                title: title.into(),
                window: None,
                buffer: Vec::new(),
                closed: false,
            }
        }
    }

    impl Sink for WindowSink {
        fn show_frame(&mut self, frame: Arc<Image>) -> anyhow::Result<()> {
            let (w, h) = (frame.width() as usize, frame.height() as usize);
            if self.window.is_none() {
                log::debug!("creating window '{}' at {}", self.title, frame.resolution());
                self.window = Some(Window::new(&self.title, w, h, WindowOptions::default())?);
            }
            let Some(window) = &mut self.window else {
                return Ok(());
            };

            self.buffer.clear();
            self.buffer.extend(
                frame
                    .data()
                    .chunks_exact(4)
                    .map(|px| Color::from_rgb8(px[0], px[1], px[2]).to_0rgb()),
            );
            window.update_with_buffer(&self.buffer, w, h)?;

            if !window.is_open() || window.is_key_down(Key::Escape) {
                self.closed = true;
            }
            Ok(())
        }

        fn show_count(&mut self, count: FingerCount) -> anyhow::Result<()> {
            if let Some(window) = &mut self.window {
                let leds = IndicatorState::new(count);
                window.set_title(&format!("{} - {count} {leds}", self.title));
            }
            Ok(())
        }

        fn show_error(&mut self, message: &str) {
            log::error!("{message}");
            if let Some(window) = &mut self.window {
                window.set_title(&format!("{} - error: {message}", self.title));
            }
        }

        fn is_open(&self) -> bool {
            !self.closed
        }
    }
}
