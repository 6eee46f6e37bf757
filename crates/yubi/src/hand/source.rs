//! Landmark detector interface.

use anyhow::ensure;

use crate::image::Image;

use super::landmark::HandObservation;

/// A hand landmark detector.
///
/// Implementations typically wrap a pretrained neural network. They report every hand found in
/// the frame, in a stable order; the pipeline only counts the fingers of the first one.
pub trait LandmarkSource {
    /// Detects hands in `image`.
    ///
    /// An empty list means that no hand is visible. This is not an error.
    fn detect(&mut self, image: &Image) -> Vec<HandObservation>;
}

impl<S: LandmarkSource + ?Sized> LandmarkSource for Box<S> {
    fn detect(&mut self, image: &Image) -> Vec<HandObservation> {
        (**self).detect(image)
    }
}

/// Tuning knobs passed on to landmark detector implementations.
///
/// Use [`DetectorOptions::validate`] before handing the options to a detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorOptions {
    min_detection_confidence: f32,
    min_tracking_confidence: f32,
    max_hands: usize,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            max_hands: 1,
        }
    }
}

impl DetectorOptions {
    /// Sets the confidence a new hand detection needs to be reported.
    ///
    /// Must be in range `(0.0, 1.0]`. The default is 0.5.
    #[inline]
    pub fn min_detection_confidence(self, confidence: f32) -> Self {
        Self {
            min_detection_confidence: confidence,
            ..self
        }
    }

    /// Sets the confidence below which a tracked hand is considered lost.
    ///
    /// Must be in range `(0.0, 1.0]`. The default is 0.5.
    #[inline]
    pub fn min_tracking_confidence(self, confidence: f32) -> Self {
        Self {
            min_tracking_confidence: confidence,
            ..self
        }
    }

    /// Sets the maximum number of hands to report per frame.
    ///
    /// Must be at least 1. The default is 1.
    #[inline]
    pub fn max_hands(self, max_hands: usize) -> Self {
        Self { max_hands, ..self }
    }

    #[inline]
    pub fn detection_confidence(&self) -> f32 {
        self.min_detection_confidence
    }

    #[inline]
    pub fn tracking_confidence(&self) -> f32 {
        self.min_tracking_confidence
    }

    #[inline]
    pub fn hand_limit(&self) -> usize {
        self.max_hands
    }

    /// Checks that all values are within their allowed ranges.
    pub fn validate(self) -> anyhow::Result<Self> {
        for (name, value) in [
            ("minimum detection confidence", self.min_detection_confidence),
            ("minimum tracking confidence", self.min_tracking_confidence),
        ] {
            ensure!(
                value > 0.0 && value <= 1.0,
                "{name} must be in range (0, 1], got {value}"
            );
        }
        ensure!(self.max_hands >= 1, "maximum number of hands must be at least 1");
        Ok(self)
    }
}

/// A [`LandmarkSource`] that replays a fixed script of per-frame detections.
///
/// Stands in for a real detector in demos and tests. Each call to
/// [`LandmarkSource::detect`] returns the next entry of the script (ignoring the image), looping
/// back to the start once the end is reached. At most [`DetectorOptions::max_hands`] hands are
/// reported per frame.
pub struct ScriptedSource {
    script: Vec<Vec<HandObservation>>,
    next: usize,
    options: DetectorOptions,
}

impl ScriptedSource {
    pub fn new(script: Vec<Vec<HandObservation>>) -> Self {
        Self {
            script,
            next: 0,
            options: DetectorOptions::default(),
        }
    }

    /// Applies detector options, rejecting invalid ones.
    pub fn with_options(self, options: DetectorOptions) -> anyhow::Result<Self> {
        Ok(Self {
            options: options.validate()?,
            ..self
        })
    }

    /// Creates a source that reports the same hands for every frame.
    pub fn constant(hands: Vec<HandObservation>) -> Self {
        Self::new(vec![hands])
    }
}

impl LandmarkSource for ScriptedSource {
    fn detect(&mut self, _image: &Image) -> Vec<HandObservation> {
        if self.script.is_empty() {
            return Vec::new();
        }
        let hands = &self.script[self.next];
        self.next = (self.next + 1) % self.script.len();
        hands
            .iter()
            .take(self.options.hand_limit())
            .cloned()
            .collect()
    }
}
