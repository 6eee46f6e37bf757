//! Hand landmark topology and per-frame observations.

use std::fmt;

/// Number of landmarks a well-formed [`HandObservation`] contains.
pub const NUM_LANDMARKS: usize = 21;

/// A single hand keypoint.
///
/// `x` and `y` are normalized to the frame size (0.0 to 1.0, Y pointing down). `z` is the
/// detector's relative depth estimate and is `0.0` for 2D-only sources.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Converts the normalized position to pixel coordinates in a `width`x`height` frame.
    ///
    /// Positions far outside the frame are clamped to a margin of one frame size around it, so the
    /// result is always safe to draw with. NaN maps to 0.
    #[inline]
    pub fn to_pixel(&self, width: u32, height: u32) -> (i32, i32) {
        fn scale(v: f32, size: u32) -> i32 {
            let size = size as f32;
            (v * size).clamp(-size, 2.0 * size) as i32
        }
        (scale(self.x, width), scale(self.y, height))
    }
}

impl From<[f32; 3]> for Landmark {
    #[inline]
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<[f32; 2]> for Landmark {
    #[inline]
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// Which hand was observed, as reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Handedness {
    Left,
    Right,
    /// The detector did not report handedness.
    #[default]
    Unknown,
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Handedness::Left => "L",
            Handedness::Right => "R",
            Handedness::Unknown => "?",
        })
    }
}

/// The landmarks of one hand detected in one frame.
///
/// Observations are produced fresh for every frame and are never updated afterwards. No identity
/// is carried across frames.
///
/// The constructor accepts whatever the detector produced. Well-formed observations contain
/// exactly [`NUM_LANDMARKS`] points ordered as in [`LandmarkIdx`]; the classifier rejects
/// anything else.
#[derive(Debug, Clone, PartialEq)]
pub struct HandObservation {
    landmarks: Box<[Landmark]>,
    handedness: Handedness,
}

impl HandObservation {
    pub fn new<L, I>(landmarks: I, handedness: Handedness) -> Self
    where
        L: Into<Landmark>,
        I: IntoIterator<Item = L>,
    {
        Self {
            landmarks: landmarks.into_iter().map(Into::into).collect(),
            handedness,
        }
    }

    #[inline]
    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// Returns a copy of this observation with a different handedness label.
    pub fn with_handedness(self, handedness: Handedness) -> Self {
        Self { handedness, ..self }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Whether this observation has the expected number of landmarks.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.landmarks.len() == NUM_LANDMARKS
    }

    #[inline]
    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// Returns the landmark at `idx`, or `None` if the observation is too short to contain it.
    #[inline]
    pub fn get(&self, idx: LandmarkIdx) -> Option<Landmark> {
        self.landmarks.get(idx as usize).copied()
    }

    /// Returns the pairs of landmarks connected by a bone, skipping any the observation lacks.
    pub fn bones(&self) -> impl Iterator<Item = (Landmark, Landmark)> + '_ {
        CONNECTIVITY
            .iter()
            .filter_map(|&(a, b)| Some((self.get(a)?, self.get(b)?)))
    }
}

/// Names for the hand landmarks, in the order the detector reports them.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl LandmarkIdx {
    pub const ALL: [LandmarkIdx; NUM_LANDMARKS] = {
        use LandmarkIdx::*;
        [
            Wrist,
            ThumbCmc,
            ThumbMcp,
            ThumbIp,
            ThumbTip,
            IndexFingerMcp,
            IndexFingerPip,
            IndexFingerDip,
            IndexFingerTip,
            MiddleFingerMcp,
            MiddleFingerPip,
            MiddleFingerDip,
            MiddleFingerTip,
            RingFingerMcp,
            RingFingerPip,
            RingFingerDip,
            RingFingerTip,
            PinkyMcp,
            PinkyPip,
            PinkyDip,
            PinkyTip,
        ]
    };
}

/// Bones of the hand skeleton, used to draw the overlay.
pub const CONNECTIVITY: &[(LandmarkIdx, LandmarkIdx)] = {
    use LandmarkIdx::*;
    &[
        // Surround the palm:
        (Wrist, ThumbCmc),
        (ThumbCmc, IndexFingerMcp),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, PinkyMcp),
        (PinkyMcp, Wrist),
        // Thumb:
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        // Index:
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        // Middle:
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        // Ring:
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        // Pinky:
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ]
};
