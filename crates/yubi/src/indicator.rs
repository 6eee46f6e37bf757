//! The LED row driven by the finger count.

use std::fmt;

use crate::hand::fingers::FingerCount;
use crate::image::{draw, Color, Image};

/// Number of LEDs in the indicator row.
pub const NUM_LEDS: usize = 5;

const LED_ON: Color = Color::from_rgb8(250, 204, 21);
const LED_OFF: Color = Color::from_rgb8(209, 213, 219);

/// On/off state of a row of [`NUM_LEDS`] LEDs.
///
/// The row fills from the left: with a count of `n`, the first `n` LEDs are on and the rest are
/// off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndicatorState([bool; NUM_LEDS]);

impl IndicatorState {
    pub fn new(count: FingerCount) -> Self {
        let mut leds = [false; NUM_LEDS];
        for (i, led) in leds.iter_mut().enumerate() {
            *led = i < usize::from(count.get());
        }
        Self(leds)
    }

    /// Returns whether LED `led` is on, or `None` if there is no such LED.
    #[inline]
    pub fn is_on(&self, led: usize) -> Option<bool> {
        self.0.get(led).copied()
    }

    #[inline]
    pub fn leds(&self) -> [bool; NUM_LEDS] {
        self.0
    }

    /// Returns the number of LEDs that are on.
    pub fn active(&self) -> usize {
        self.0.iter().filter(|on| **on).count()
    }

    /// Draws the LED row along the bottom edge of `target`.
    pub fn draw(&self, target: &mut Image) {
        let spacing = (target.width() / (NUM_LEDS as u32 + 1)).max(1);
        let diameter = (spacing / 2).clamp(3, 64);
        let y = target.height().saturating_sub(diameter) as i32;
        for (i, on) in self.0.iter().enumerate() {
            let x = (spacing * (i as u32 + 1)) as i32;
            let mut led = draw::circle(target, x, y, diameter);
            led.stroke_width(2);
            if *on {
                led.color(LED_ON).fill(LED_ON);
            } else {
                led.color(LED_OFF);
            }
        }
    }
}

impl From<FingerCount> for IndicatorState {
    fn from(count: FingerCount) -> Self {
        Self::new(count)
    }
}

/// Displays the row as `●` (on) and `○` (off) characters.
impl fmt::Display for IndicatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for on in self.0 {
            f.write_str(if on { "●" } else { "○" })?;
        }
        Ok(())
    }
}
