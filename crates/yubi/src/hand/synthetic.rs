//! Synthetic hand poses.
//!
//! Used by the demo binary and tests in place of a landmark detector.

use super::{
    fingers::Finger,
    landmark::{HandObservation, Handedness, Landmark, LandmarkIdx, NUM_LANDMARKS},
};

/// Horizontal position of each non-thumb finger's column, for a right hand.
const FINGER_COLUMNS: [(Finger, f32); 4] = [
    (Finger::Index, 0.56),
    (Finger::Middle, 0.50),
    (Finger::Ring, 0.44),
    (Finger::Pinky, 0.38),
];

/// Builds a plausible, upright hand facing the camera with the given fingers extended.
///
/// The hand is roughly centered in the frame. Left hands are the mirror image of right hands;
/// [`Handedness::Unknown`] uses the right hand's geometry.
pub fn pose(extended: &[Finger], handedness: Handedness) -> HandObservation {
    let mut lm = [Landmark::default(); NUM_LANDMARKS];
    let mut set = |idx: LandmarkIdx, x: f32, y: f32| lm[idx as usize] = Landmark::new(x, y, 0.0);

    set(LandmarkIdx::Wrist, 0.50, 0.85);

    set(LandmarkIdx::ThumbCmc, 0.56, 0.78);
    set(LandmarkIdx::ThumbMcp, 0.62, 0.72);
    set(LandmarkIdx::ThumbIp, 0.67, 0.66);
    if extended.contains(&Finger::Thumb) {
        set(LandmarkIdx::ThumbTip, 0.72, 0.62);
    } else {
        // Folded across the palm.
        set(LandmarkIdx::ThumbTip, 0.60, 0.66);
    }

    for (finger, x) in FINGER_COLUMNS {
        let mcp = finger.mcp() as usize;
        // MCP, PIP, DIP and tip are consecutive landmarks.
        let [pip, dip, tip] = [mcp + 1, mcp + 2, mcp + 3];
        lm[mcp] = Landmark::new(x, 0.60, 0.0);
        if extended.contains(&finger) {
            lm[pip] = Landmark::new(x, 0.50, 0.0);
            lm[dip] = Landmark::new(x, 0.42, 0.0);
            lm[tip] = Landmark::new(x, 0.35, 0.0);
        } else {
            lm[pip] = Landmark::new(x, 0.52, 0.0);
            lm[dip] = Landmark::new(x, 0.58, 0.0);
            lm[tip] = Landmark::new(x, 0.62, 0.0);
        }
    }

    if handedness == Handedness::Left {
        for p in &mut lm {
            p.x = 1.0 - p.x;
        }
    }

    HandObservation::new(lm, handedness)
}

/// Builds a hand with the first `count` fingers (starting at the index finger, thumb last)
/// extended.
///
/// `count` is clamped to 5.
pub fn counting(count: u8, handedness: Handedness) -> HandObservation {
    const ORDER: [Finger; 5] = [
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
        Finger::Thumb,
    ];
    let count = usize::from(count.min(5));
    pose(&ORDER[..count], handedness)
}
