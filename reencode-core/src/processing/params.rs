//! Frame rate and keyframe spacing derivation.
//!
//! Pure functions: the same probe string and interval always produce the
//! same parameters, and bad probe data falls back instead of failing.

use crate::config::{FALLBACK_FRAME_RATE, MAX_GOP_SIZE};

use std::fmt;

/// Keyframe spacing in frames, always within `1..=MAX_GOP_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GopSize(u16);

impl GopSize {
    /// Rounds `frame_rate * interval_secs` and clamps it into range.
    ///
    /// A NaN product (only possible with non-finite inputs) maps to 1.
    pub fn from_product(frame_rate: f64, interval_secs: f64) -> Self {
        let frames = (frame_rate * interval_secs).round();
        let clamped = if frames.is_nan() {
            1.0
        } else {
            frames.clamp(1.0, f64::from(MAX_GOP_SIZE))
        };
        Self(clamped as u16)
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for GopSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters derived for one file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeParameters {
    /// Canonical frame rate; positive and finite.
    pub frame_rate: f64,
    pub gop_size: GopSize,
    /// True when the probed value was unusable and the default was applied.
    pub frame_rate_fallback: bool,
}

/// Parses `num/den` or a plain decimal. Returns `None` for anything that is
/// not a positive, finite rate.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let value = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Derives the frame rate and keyframe spacing for a file.
pub fn derive_parameters(raw_frame_rate: &str, keyframe_interval_secs: f64) -> EncodeParameters {
    let (frame_rate, frame_rate_fallback) = match parse_frame_rate(raw_frame_rate) {
        Some(rate) => (rate, false),
        None => {
            log::debug!(
                "Unusable frame rate {:?}; falling back to {} fps",
                raw_frame_rate,
                FALLBACK_FRAME_RATE
            );
            (FALLBACK_FRAME_RATE, true)
        }
    };

    EncodeParameters {
        frame_rate,
        gop_size: GopSize::from_product(frame_rate, keyframe_interval_secs),
        frame_rate_fallback,
    }
}
