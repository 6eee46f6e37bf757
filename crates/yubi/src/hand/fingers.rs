//! Classification of fingers as extended or folded.
//!
//! The classifier is purely geometric: it compares a few landmark coordinates of a single
//! [`HandObservation`] and keeps no state between frames.
//!
//! - The thumb is extended if its tip is further out *horizontally* than the joint below it.
//!   Which direction is "out" depends on the hand, see [`ThumbPolicy`].
//! - The other four fingers are extended if their tip is *higher up* in the frame (smaller Y)
//!   than the joint below it.

use std::{error::Error, fmt};

use super::landmark::{HandObservation, Handedness, LandmarkIdx, NUM_LANDMARKS};

/// The five fingers of a hand, in classification order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// The landmark on the tip of this finger.
    pub fn tip(self) -> LandmarkIdx {
        match self {
            Finger::Thumb => LandmarkIdx::ThumbTip,
            Finger::Index => LandmarkIdx::IndexFingerTip,
            Finger::Middle => LandmarkIdx::MiddleFingerTip,
            Finger::Ring => LandmarkIdx::RingFingerTip,
            Finger::Pinky => LandmarkIdx::PinkyTip,
        }
    }

    /// The joint right below the tip, which the tip is compared against.
    pub fn pip(self) -> LandmarkIdx {
        match self {
            Finger::Thumb => LandmarkIdx::ThumbIp,
            Finger::Index => LandmarkIdx::IndexFingerDip,
            Finger::Middle => LandmarkIdx::MiddleFingerDip,
            Finger::Ring => LandmarkIdx::RingFingerDip,
            Finger::Pinky => LandmarkIdx::PinkyDip,
        }
    }

    /// The knuckle at the base of this finger.
    pub fn mcp(self) -> LandmarkIdx {
        match self {
            Finger::Thumb => LandmarkIdx::ThumbMcp,
            Finger::Index => LandmarkIdx::IndexFingerMcp,
            Finger::Middle => LandmarkIdx::MiddleFingerMcp,
            Finger::Ring => LandmarkIdx::RingFingerMcp,
            Finger::Pinky => LandmarkIdx::PinkyMcp,
        }
    }
}

/// Per-finger extended (`true`) or folded (`false`) state, ordered like [`Finger::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FingerStates([bool; 5]);

impl FingerStates {
    /// All fingers folded. This is what a frame without a hand classifies as.
    pub const NONE: Self = Self([false; 5]);

    #[inline]
    pub const fn new(states: [bool; 5]) -> Self {
        Self(states)
    }

    #[inline]
    pub fn is_extended(&self, finger: Finger) -> bool {
        self.0[finger as usize]
    }

    #[inline]
    pub fn as_array(&self) -> [bool; 5] {
        self.0
    }

    /// Returns the fingers that are extended.
    pub fn extended(&self) -> impl Iterator<Item = Finger> + '_ {
        Finger::ALL
            .into_iter()
            .filter(move |finger| self.is_extended(*finger))
    }

    /// Returns the number of extended fingers.
    #[inline]
    pub fn count(&self) -> FingerCount {
        FingerCount(self.0.iter().filter(|ext| **ext).count() as u8)
    }
}

/// Number of extended fingers on a hand, from 0 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FingerCount(u8);

impl FingerCount {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(5);

    /// Creates a count, returning `None` if `count` is larger than 5.
    #[inline]
    pub const fn new(count: u8) -> Option<Self> {
        if count <= Self::MAX.0 {
            Some(Self(count))
        } else {
            None
        }
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for FingerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Selects how the thumb is classified.
///
/// Unlike the other fingers, the thumb folds sideways, so it is classified by comparing X
/// coordinates. A right hand facing the camera has its thumb pointing to the right of the frame,
/// a left hand to the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbPolicy {
    /// Uses the [`Handedness`] reported by the detector: for a right hand the thumb is extended if
    /// its tip is right of its IP joint, for a left hand if it is left of it.
    ///
    /// Falls back to [`ThumbPolicy::Fixed`] when the handedness is [`Handedness::Unknown`].
    #[default]
    Handedness,
    /// Ignores handedness and always treats the thumb as extended when its tip is right of its IP
    /// joint.
    ///
    /// This misclassifies the thumb of a mirrored hand.
    Fixed,
}

/// Error returned when a [`HandObservation`] does not have exactly [`NUM_LANDMARKS`] landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLandmarkCount {
    found: usize,
}

impl InvalidLandmarkCount {
    /// The number of landmarks the rejected observation contained.
    pub fn found(&self) -> usize {
        self.found
    }
}

impl fmt::Display for InvalidLandmarkCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hand observation has {} landmarks (expected {})",
            self.found, NUM_LANDMARKS
        )
    }
}

impl Error for InvalidLandmarkCount {}

/// Classifies the fingers of a hand as extended or folded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    thumb: ThumbPolicy,
}

impl Classifier {
    pub fn new(thumb: ThumbPolicy) -> Self {
        Self { thumb }
    }

    #[inline]
    pub fn thumb_policy(&self) -> ThumbPolicy {
        self.thumb
    }

    /// Classifies every finger of `hand`.
    ///
    /// Returns an error if `hand` does not consist of exactly [`NUM_LANDMARKS`] landmarks.
    pub fn classify(&self, hand: &HandObservation) -> Result<FingerStates, InvalidLandmarkCount> {
        if !hand.is_well_formed() {
            return Err(InvalidLandmarkCount { found: hand.len() });
        }

        let lm = hand.landmarks();
        let mut states = [false; 5];
        for (state, finger) in states.iter_mut().zip(Finger::ALL) {
            let tip = lm[finger.tip() as usize];
            let pip = lm[finger.pip() as usize];
            *state = match finger {
                Finger::Thumb => {
                    let handedness = match self.thumb {
                        ThumbPolicy::Handedness => hand.handedness(),
                        ThumbPolicy::Fixed => Handedness::Unknown,
                    };
                    match handedness {
                        Handedness::Left => tip.x < pip.x,
                        Handedness::Right | Handedness::Unknown => tip.x > pip.x,
                    }
                }
                _ => tip.y < pip.y,
            };
        }

        Ok(FingerStates(states))
    }

    /// Classifies the first hand in `hands`, ignoring all others.
    ///
    /// Detectors report hands in a stable order, so this always counts the same hand when several
    /// are visible. If `hands` is empty, all fingers are reported as folded.
    pub fn classify_first(
        &self,
        hands: &[HandObservation],
    ) -> Result<FingerStates, InvalidLandmarkCount> {
        match hands.first() {
            Some(hand) => self.classify(hand),
            None => Ok(FingerStates::NONE),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::hand::synthetic;

    use super::*;

    fn hand_with(f: impl Fn(&mut [[f32; 3]; NUM_LANDMARKS])) -> HandObservation {
        let mut lm = [[0.5, 0.5, 0.0]; NUM_LANDMARKS];
        f(&mut lm);
        HandObservation::new(lm, Handedness::Right)
    }

    #[test]
    fn finger_landmarks() {
        let tips = Finger::ALL.map(|f| f.tip() as usize);
        let pips = Finger::ALL.map(|f| f.pip() as usize);
        let mcps = Finger::ALL.map(|f| f.mcp() as usize);
        assert_eq!(tips, [4, 8, 12, 16, 20]);
        assert_eq!(pips, [3, 7, 11, 15, 19]);
        assert_eq!(mcps, [2, 5, 9, 13, 17]);
    }

    #[test]
    fn finger_raised_above_joint_is_extended() {
        for finger in &Finger::ALL[1..] {
            let hand = hand_with(|lm| {
                lm[finger.tip() as usize][1] = 0.2;
                lm[finger.pip() as usize][1] = 0.5;
            });
            let states = Classifier::default().classify(&hand).unwrap();
            assert!(states.is_extended(*finger), "{finger:?}");
            assert_eq!(states.count().get(), 1, "{finger:?}");

            let hand = hand_with(|lm| {
                lm[finger.tip() as usize][1] = 0.6;
                lm[finger.pip() as usize][1] = 0.5;
            });
            let states = Classifier::default().classify(&hand).unwrap();
            assert!(!states.is_extended(*finger), "{finger:?}");
        }
    }

    #[test]
    fn equal_height_is_folded() {
        let hand = hand_with(|_| {});
        let states = Classifier::default().classify(&hand).unwrap();
        assert_eq!(states, FingerStates::NONE);
    }

    #[test]
    fn thumb_follows_handedness() {
        let out_right = hand_with(|lm| {
            lm[4][0] = 0.9;
            lm[3][0] = 0.5;
        });
        let out_left = hand_with(|lm| {
            lm[4][0] = 0.1;
            lm[3][0] = 0.5;
        });

        let classifier = Classifier::new(ThumbPolicy::Handedness);
        let thumb = |hand: &HandObservation, handedness| {
            classifier
                .classify(&hand.clone().with_handedness(handedness))
                .unwrap()
                .is_extended(Finger::Thumb)
        };

        assert!(thumb(&out_right, Handedness::Right));
        assert!(!thumb(&out_left, Handedness::Right));
        assert!(thumb(&out_left, Handedness::Left));
        assert!(!thumb(&out_right, Handedness::Left));
        assert!(thumb(&out_right, Handedness::Unknown));
        assert!(!thumb(&out_left, Handedness::Unknown));
    }

    #[test]
    fn fixed_thumb_policy_ignores_handedness() {
        let classifier = Classifier::new(ThumbPolicy::Fixed);
        let hand = hand_with(|lm| {
            lm[4][0] = 0.9;
            lm[3][0] = 0.5;
        })
        .with_handedness(Handedness::Left);
        assert!(classifier
            .classify(&hand)
            .unwrap()
            .is_extended(Finger::Thumb));
        assert!(!Classifier::new(ThumbPolicy::Handedness)
            .classify(&hand)
            .unwrap()
            .is_extended(Finger::Thumb));
    }

    #[test]
    fn open_hand() {
        let hand = hand_with(|lm| {
            for finger in &Finger::ALL[1..] {
                lm[finger.tip() as usize][1] = 0.2;
                lm[finger.pip() as usize][1] = 0.5;
            }
            lm[4][0] = 0.9;
            lm[3][0] = 0.5;
        });
        let states = Classifier::default().classify(&hand).unwrap();
        assert_eq!(states.as_array(), [true; 5]);
        assert_eq!(states.count(), FingerCount::MAX);
    }

    #[test]
    fn closed_fist() {
        let hand = hand_with(|lm| {
            for finger in &Finger::ALL[1..] {
                lm[finger.tip() as usize][1] = 0.6;
                lm[finger.pip() as usize][1] = 0.5;
            }
            lm[4][0] = 0.4;
            lm[3][0] = 0.5;
        });
        let states = Classifier::default().classify(&hand).unwrap();
        assert_eq!(states.as_array(), [false; 5]);
        assert_eq!(states.count(), FingerCount::ZERO);
    }

    #[test]
    fn no_hand_counts_zero() {
        let states = Classifier::default().classify_first(&[]).unwrap();
        assert_eq!(states, FingerStates::NONE);
        assert_eq!(states.count().get(), 0);
    }

    #[test]
    fn only_first_hand_is_counted() {
        let two = synthetic::pose(&[Finger::Index, Finger::Middle], Handedness::Right);
        let five = synthetic::pose(&Finger::ALL, Handedness::Right);
        let states = Classifier::default()
            .classify_first(&[two.clone(), five.clone()])
            .unwrap();
        assert_eq!(states.count().get(), 2);
        let states = Classifier::default().classify_first(&[five, two]).unwrap();
        assert_eq!(states.count().get(), 5);
    }

    #[test]
    fn wrong_landmark_count_is_rejected() {
        let hand = HandObservation::new([[0.5f32, 0.5]; 20], Handedness::Right);
        let err = Classifier::default().classify(&hand).unwrap_err();
        assert_eq!(err.found(), 20);
        assert_eq!(
            err.to_string(),
            "hand observation has 20 landmarks (expected 21)"
        );

        let hand = HandObservation::new(Vec::<[f32; 2]>::new(), Handedness::Unknown);
        assert!(Classifier::default().classify_first(&[hand]).is_err());
    }

    #[test]
    fn random_hands() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for _ in 0..500 {
            let lm: Vec<[f32; 3]> = (0..NUM_LANDMARKS)
                .map(|_| [rng.f32(), rng.f32(), rng.f32()])
                .collect();
            let handedness = match rng.u8(0..3) {
                0 => Handedness::Left,
                1 => Handedness::Right,
                _ => Handedness::Unknown,
            };
            let hand = HandObservation::new(lm, handedness);
            let classifier = Classifier::default();
            let states = classifier.classify(&hand).unwrap();

            // Same input, same output.
            assert_eq!(classifier.classify(&hand).unwrap(), states);

            let popcount = states.as_array().iter().filter(|s| **s).count();
            assert_eq!(states.count().get() as usize, popcount);
            assert!(states.count() <= FingerCount::MAX);
            assert_eq!(states.extended().count(), popcount);

            for finger in &Finger::ALL[1..] {
                let tip = hand.get(finger.tip()).unwrap();
                let pip = hand.get(finger.pip()).unwrap();
                assert_eq!(states.is_extended(*finger), tip.y < pip.y);
            }
        }
    }

    #[test]
    fn finger_count_range() {
        assert_eq!(FingerCount::new(5), Some(FingerCount::MAX));
        assert_eq!(FingerCount::new(6), None);
        assert_eq!(FingerCount::new(3).unwrap().to_string(), "3");
    }
}
