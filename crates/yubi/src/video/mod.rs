//! Frame acquisition.
//!
//! Camera access lives outside of this crate; anything that can produce frames implements
//! [`FrameSource`].

mod still;

pub use still::StillImages;

use crate::image::{Color, Image, Resolution};

/// A source of video frames.
///
/// A source is owned by exactly one loop (the single-threaded loop or the pipeline's producer
/// thread) and dropped when that loop exits, which is where device handles should be released.
pub trait FrameSource {
    /// Reads the next frame.
    ///
    /// Errors are treated as transient: the caller skips the current tick and tries again on the
    /// next one.
    fn read(&mut self) -> anyhow::Result<Image>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read(&mut self) -> anyhow::Result<Image> {
        (**self).read()
    }
}

/// A [`FrameSource`] yielding solid-colored frames of a fixed size.
///
/// Useful together with a scripted landmark source, where the image content does not matter.
pub struct BlankFrames {
    res: Resolution,
    color: Color,
}

impl BlankFrames {
    pub fn new(res: Resolution) -> Self {
        Self {
            res,
            color: Color::BLACK,
        }
    }

    pub fn color(self, color: Color) -> Self {
        Self { color, ..self }
    }
}

impl FrameSource for BlankFrames {
    fn read(&mut self) -> anyhow::Result<Image> {
        let mut image = Image::new(self.res.width(), self.res.height());
        image.clear(self.color);
        Ok(image)
    }
}
