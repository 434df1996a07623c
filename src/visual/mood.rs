//! Mood colors for the orb

use crate::session::SessionState;

/// An RGB color triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Rgb {
    /// Create a color from channel values
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Move toward `target` by `factor` of the remaining gap per channel
    ///
    /// Always advances by at least one unit per channel; a fractional step
    /// that rounds away would otherwise stall short of the target forever.
    #[must_use]
    pub fn lerp(self, target: Self, factor: f32) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        fn step(from: u8, to: u8, factor: f32) -> u8 {
            let delta = f32::from(to) - f32::from(from);
            let stepped = (f32::from(from) + delta * factor).round().clamp(0.0, 255.0) as u8;
            if stepped == from && from != to {
                if to > from {
                    from + 1
                } else {
                    from - 1
                }
            } else {
                stepped
            }
        }

        Self {
            r: step(self.r, target.r, factor),
            g: step(self.g, target.g, factor),
            b: step(self.b, target.b, factor),
        }
    }
}

/// Mood associated with a session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    /// Waiting for speech - green, ambient amplitude
    Listening,
    /// Completion call in flight - amber, slow oscillation
    Processing,
    /// Speaking a reply - coral, faster oscillation
    Speaking,
    /// Transient failure - bright red, amplitude forced to zero
    Error,
}

impl Mood {
    /// The orb color for this mood
    #[must_use]
    pub const fn color(self) -> Rgb {
        match self {
            Self::Listening => Rgb::new(0x00, 0xFF, 0x88),
            Self::Processing => Rgb::new(0xFF, 0xD7, 0x00),
            Self::Speaking => Rgb::new(0xFF, 0x6B, 0x6B),
            Self::Error => Rgb::new(0xFF, 0x44, 0x44),
        }
    }

    /// Target amplitude applied when transitioning into this mood, if the
    /// transition pins one (Listening leaves the ambient simulation in charge)
    #[must_use]
    pub const fn base_amplitude(self) -> Option<f32> {
        match self {
            Self::Listening => None,
            Self::Processing => Some(0.3),
            Self::Speaking => Some(0.5),
            Self::Error => Some(0.0),
        }
    }
}

impl From<SessionState> for Mood {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Listening => Self::Listening,
            SessionState::Processing => Self::Processing,
            SessionState::Speaking => Self::Speaking,
            SessionState::Error => Self::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_moves_toward_target() {
        let from = Rgb::new(0, 0, 0);
        let to = Rgb::new(200, 100, 50);

        let stepped = from.lerp(to, 0.5);
        assert_eq!(stepped, Rgb::new(100, 50, 25));
    }

    #[test]
    fn test_lerp_full_factor_reaches_target() {
        let from = Rgb::new(10, 20, 30);
        let to = Rgb::new(255, 0, 128);

        assert_eq!(from.lerp(to, 1.0), to);
    }

    #[test]
    fn test_lerp_converges_over_many_steps() {
        let mut color = Rgb::new(0, 255, 136);
        let target = Mood::Error.color();

        for _ in 0..500 {
            color = color.lerp(target, 0.05);
        }
        assert_eq!(color, target);
    }

    #[test]
    fn test_lerp_closes_small_gaps() {
        // A sub-unit step per tick must still make progress, or the color
        // sticks a few units short of the target.
        let mut color = Rgb::new(246, 78, 78);
        let target = Rgb::new(255, 68, 68);

        for _ in 0..50 {
            color = color.lerp(target, 0.05);
            if color == target {
                break;
            }
        }
        assert_eq!(color, target);
    }

    #[test]
    fn test_mood_colors_are_distinct() {
        let colors = [
            Mood::Listening.color(),
            Mood::Processing.color(),
            Mood::Speaking.color(),
            Mood::Error.color(),
        ];

        for (i, a) in colors.iter().enumerate() {
            for b in colors.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
