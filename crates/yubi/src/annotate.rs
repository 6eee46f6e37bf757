//! Frame annotation: skeleton overlay, count and LED row.

use crate::hand::{
    fingers::FingerStates,
    landmark::{HandObservation, LandmarkIdx},
};
use crate::image::{draw, Color, Image};
use crate::indicator::IndicatorState;

const SKELETON: Color = Color::GREEN;
const IGNORED_SKELETON: Color = Color::from_rgb8(127, 127, 127);
const EXTENDED_TIP: Color = Color::YELLOW;

/// Draws the skeleton of a single hand.
///
/// Fingertips of extended fingers are highlighted. Landmarks outside of the image are clipped.
pub fn draw_hand(target: &mut Image, hand: &HandObservation, states: Option<&FingerStates>) {
    let (w, h) = (target.width(), target.height());
    let bone_color = if states.is_some() {
        SKELETON
    } else {
        IGNORED_SKELETON
    };

    for (a, b) in hand.bones() {
        let (ax, ay) = a.to_pixel(w, h);
        let (bx, by) = b.to_pixel(w, h);
        draw::line(target, ax, ay, bx, by).color(bone_color);
    }
    for lm in hand.landmarks() {
        let (x, y) = lm.to_pixel(w, h);
        draw::marker(target, x, y);
    }

    if let Some(states) = states {
        for finger in states.extended() {
            if let Some(tip) = hand.get(finger.tip()) {
                let (x, y) = tip.to_pixel(w, h);
                draw::marker(target, x, y).color(EXTENDED_TIP).size(7);
            }
        }
    }

    if let Some(wrist) = hand.get(LandmarkIdx::Wrist) {
        let (x, y) = wrist.to_pixel(w, h);
        let label = hand.handedness().to_string();
        draw::text(target, x, y + 8, &label).align_top();
    }
}

/// Annotates a frame with everything the presentation layer shows.
///
/// All `hands` get a skeleton overlay, but only the first one is highlighted, since that is the
/// one whose fingers were counted. The count itself is printed in the top left corner, and the
/// LED row is drawn along the bottom.
pub fn annotate_frame(target: &mut Image, hands: &[HandObservation], states: &FingerStates) {
    for (i, hand) in hands.iter().enumerate() {
        let counted = if i == 0 { Some(states) } else { None };
        draw_hand(target, hand, counted);
    }

    let count = states.count();
    let text = count.to_string();
    draw::text(target, 8, 8, &text)
        .large()
        .color(Color::GREEN)
        .align_top()
        .align_left();

    IndicatorState::new(count).draw(target);
}
