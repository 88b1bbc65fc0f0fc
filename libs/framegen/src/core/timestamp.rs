// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Frame timing: the rational media time callers hand in and the
//! nanosecond timestamp attached to produced framebuffers.

use crate::core::{FrameGenError, Result};

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Rational media time (`value / timescale` seconds), as delivered by
/// capture and decode APIs alongside each pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaTime {
    pub value: i64,
    pub timescale: i32,
    /// Distinguishes timelines that restart (e.g. looping playback).
    pub epoch: i64,
}

impl MediaTime {
    pub const fn new(value: i64, timescale: i32) -> Self {
        Self {
            value,
            timescale,
            epoch: 0,
        }
    }

    /// Closest representable time to `seconds` at `timescale`.
    pub fn from_seconds(seconds: f64, timescale: i32) -> Self {
        Self::new((seconds * timescale as f64).round() as i64, timescale)
    }

    pub const fn is_valid(&self) -> bool {
        self.timescale > 0
    }

    pub fn seconds(&self) -> Option<f64> {
        self.is_valid()
            .then(|| self.value as f64 / self.timescale as f64)
    }
}

/// Presentation timestamp attached to a framebuffer, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    pub epoch: i64,
    pub timestamp_ns: i64,
}

impl Timestamp {
    pub const fn from_nanos(timestamp_ns: i64) -> Self {
        Self {
            epoch: 0,
            timestamp_ns,
        }
    }

    pub fn seconds(&self) -> f64 {
        self.timestamp_ns as f64 / NANOS_PER_SECOND as f64
    }
}

impl TryFrom<MediaTime> for Timestamp {
    type Error = FrameGenError;

    /// Rounds to the nearest nanosecond. Fails on a non-positive timescale
    /// or a time outside the `i64` nanosecond range.
    fn try_from(time: MediaTime) -> Result<Self> {
        if !time.is_valid() {
            return Err(FrameGenError::InvalidTime(format!(
                "timescale must be positive, got {}",
                time.timescale
            )));
        }

        let timescale = time.timescale as i128;
        let scaled = time.value as i128 * NANOS_PER_SECOND;
        let half = timescale / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / timescale
        } else {
            (scaled - half) / timescale
        };
        let timestamp_ns = i64::try_from(rounded).map_err(|_| {
            FrameGenError::InvalidTime(format!(
                "{}/{} does not fit in a nanosecond timestamp",
                time.value, time.timescale
            ))
        })?;

        Ok(Self {
            epoch: time.epoch,
            timestamp_ns,
        })
    }
}

/// How a framebuffer relates to time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimingStyle {
    /// No presentation time (intermediate or not-yet-stamped buffers).
    #[default]
    StillImage,
    VideoFrame(Timestamp),
}

impl TimingStyle {
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            Self::StillImage => None,
            Self::VideoFrame(timestamp) => Some(*timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_timescales_convert_exactly() {
        let ts = Timestamp::try_from(MediaTime::new(1001, 30000)).unwrap();
        assert_eq!(ts.timestamp_ns, 33_366_667);

        let ts = Timestamp::try_from(MediaTime::new(90_000, 90_000)).unwrap();
        assert_eq!(ts.timestamp_ns, 1_000_000_000);
    }

    #[test]
    fn test_negative_times_round_symmetrically() {
        let ts = Timestamp::try_from(MediaTime::new(-1001, 30000)).unwrap();
        assert_eq!(ts.timestamp_ns, -33_366_667);
    }

    #[test]
    fn test_invalid_timescale_is_rejected() {
        assert!(matches!(
            Timestamp::try_from(MediaTime::new(10, 0)),
            Err(FrameGenError::InvalidTime(_))
        ));
        assert!(Timestamp::try_from(MediaTime::new(10, -1)).is_err());
    }

    #[test]
    fn test_overflowing_time_is_rejected() {
        assert!(Timestamp::try_from(MediaTime::new(i64::MAX, 1)).is_err());
    }

    #[test]
    fn test_epoch_is_carried_and_orders_first() {
        let mut later_epoch = MediaTime::new(0, 600);
        later_epoch.epoch = 1;
        let a = Timestamp::try_from(MediaTime::new(6000, 600)).unwrap();
        let b = Timestamp::try_from(later_epoch).unwrap();
        assert_eq!(b.epoch, 1);
        assert!(a < b);
    }

    #[test]
    fn test_from_seconds_matches_default_sample_time() {
        let time = MediaTime::from_seconds(1.0, 1000);
        assert_eq!(time, MediaTime::new(1000, 1000));
        assert_eq!(time.seconds(), Some(1.0));
    }

    #[test]
    fn test_timing_style_timestamp() {
        assert_eq!(TimingStyle::StillImage.timestamp(), None);
        let ts = Timestamp::from_nanos(5);
        assert_eq!(TimingStyle::VideoFrame(ts).timestamp(), Some(ts));
    }
}
