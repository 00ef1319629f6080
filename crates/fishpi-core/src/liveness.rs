//! Liveness score bookkeeping.
//!
//! The service credits a fixed increment for chat activity at most once per
//! 30 seconds, up to 100 per day. `LivenessState` mirrors that locally; the
//! caller supplies the current local time so the state machine stays pure.

use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{FishPiError, Result};

pub const INCREMENT: f64 = 1.67;
pub const MAX_SCORE: f64 = 100.0;
/// Seconds between two creditable messages used for the ETA.
pub const INTERVAL_SECS: f64 = 40.0;
pub const MIN_GAP_SECS: i64 = 30;

/// Daily local-time window in which activity counts. `start` is inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ActiveWindow {
    /// Parse two `HH:MM` strings. `start` must be before `end`.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |s: &str| {
            NaiveTime::parse_from_str(s, "%H:%M")
                .map_err(|e| FishPiError::Config(format!("invalid time {s:?}: {e}")))
        };
        let w = Self {
            start: parse(start)?,
            end: parse(end)?,
        };
        if w.start >= w.end {
            return Err(FishPiError::Config(
                "activeWindow.start must be before activeWindow.end".into(),
            ));
        }
        Ok(w)
    }

    /// Absolute bounds of the window on `day`.
    pub fn bounds(&self, day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        (day.and_time(self.start), day.and_time(self.end))
    }
}

/// Progress estimate printed after a credited message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    /// Messages still needed.
    pub need: u32,
    /// Messages needed from zero.
    pub all: u32,
    pub eta_minutes: u32,
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "还差({}/{}) 预计还需{}分钟", self.need, self.all, self.eta_minutes)
    }
}

pub fn estimate(score: f64) -> Estimate {
    let all = (MAX_SCORE / INCREMENT).ceil();
    let need = ((MAX_SCORE - score).max(0.0) / INCREMENT).ceil();
    let eta = (need * INTERVAL_SECS / 60.0).ceil();
    Estimate {
        need: need as u32,
        all: all as u32,
        eta_minutes: eta as u32,
    }
}

/// Outcome of `LivenessState::record_activity`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bump {
    /// Credited; carries the new score.
    Accepted(f64),
    TooSoon,
    OutsideWindow,
    Complete,
}

#[derive(Debug, Clone)]
pub struct LivenessState {
    score: f64,
    last_bump: Option<NaiveDateTime>,
    day: NaiveDate,
    window: Option<ActiveWindow>,
    bounds: Option<(NaiveDateTime, NaiveDateTime)>,
}

impl LivenessState {
    pub fn new(score: f64, now: NaiveDateTime, window: Option<ActiveWindow>) -> Self {
        let day = now.date();
        Self {
            score: score.clamp(0.0, MAX_SCORE),
            last_bump: None,
            day,
            window,
            bounds: window.map(|w| w.bounds(day)),
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn is_complete(&self) -> bool {
        self.score >= MAX_SCORE
    }

    /// Overwrite the score with a server value.
    pub fn set_score(&mut self, score: f64) {
        self.score = score.clamp(0.0, MAX_SCORE);
    }

    /// Reset on a new local day. Returns true if a rollover happened.
    pub fn roll_day(&mut self, now: NaiveDateTime) -> bool {
        let today = now.date();
        if today == self.day {
            return false;
        }
        self.day = today;
        self.score = 0.0;
        self.last_bump = None;
        self.bounds = self.window.map(|w| w.bounds(today));
        true
    }

    pub fn in_window(&self, now: NaiveDateTime) -> bool {
        match self.bounds {
            Some((start, end)) => now >= start && now < end,
            None => true,
        }
    }

    pub fn record_activity(&mut self, now: NaiveDateTime) -> Bump {
        self.roll_day(now);
        if self.is_complete() {
            return Bump::Complete;
        }
        if !self.in_window(now) {
            return Bump::OutsideWindow;
        }
        if let Some(last) = self.last_bump {
            if now - last < Duration::seconds(MIN_GAP_SECS) {
                return Bump::TooSoon;
            }
        }
        self.last_bump = Some(now);
        self.score = (self.score + INCREMENT).min(MAX_SCORE);
        Bump::Accepted(self.score)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn estimate_from_zero() {
        let e = estimate(0.0);
        assert_eq!(e, Estimate { need: 60, all: 60, eta_minutes: 40 });
        assert_eq!(e.to_string(), "还差(60/60) 预计还需40分钟");
    }

    #[test]
    fn window_rejects_outside_and_inverted() {
        let w = ActiveWindow::parse("08:00", "22:00").unwrap();
        let mut s = LivenessState::new(0.0, at("2024-01-01 07:00:00"), Some(w));
        assert_eq!(s.record_activity(at("2024-01-01 07:59:59")), Bump::OutsideWindow);
        assert!(matches!(s.record_activity(at("2024-01-01 08:00:00")), Bump::Accepted(_)));
        assert!(ActiveWindow::parse("22:00", "08:00").is_err());
    }

    #[test]
    fn gap_is_measured_from_last_accepted() {
        let mut s = LivenessState::new(0.0, at("2024-01-01 10:00:00"), None);
        assert!(matches!(s.record_activity(at("2024-01-01 10:00:00")), Bump::Accepted(_)));
        assert_eq!(s.record_activity(at("2024-01-01 10:00:20")), Bump::TooSoon);
        assert!(matches!(s.record_activity(at("2024-01-01 10:00:30")), Bump::Accepted(_)));
    }
}
