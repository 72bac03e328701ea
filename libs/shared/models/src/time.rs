use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ClinicError;

/// Wall-clock time of day at minute precision.
///
/// This is the only time representation used inside the engine. Every
/// incoming string is parsed into a `SlotTime` once, and every outgoing
/// value is rendered as zero-padded 24-hour `HH:MM`. Comparisons never
/// happen on strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(NaiveTime);

const ACCEPTED_FORMATS: [&str; 4] = ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];

impl SlotTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(SlotTime)
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        Self::new(minutes / 60, minutes % 60)
    }

    /// Parse boundary input. Accepts `H:MM`, `HH:MM`, `HH:MM:SS` and
    /// `h:MM AM/PM`; seconds are truncated.
    pub fn parse(input: &str) -> Result<Self, ClinicError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ClinicError::Validation("time is required".to_string()));
        }
        let upper = trimmed.to_ascii_uppercase();

        ACCEPTED_FORMATS
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(&upper, format).ok())
            .and_then(|time| Self::new(time.hour(), time.minute()))
            .ok_or_else(|| ClinicError::Validation(format!("invalid time '{}', expected HH:MM", input)))
    }

    pub fn minutes_from_midnight(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }

    /// Adds minutes without wrapping past midnight.
    pub fn checked_add_minutes(&self, minutes: u32) -> Option<Self> {
        Self::from_minutes(self.minutes_from_midnight().checked_add(minutes)?)
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

impl FromStr for SlotTime {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveTime> for SlotTime {
    fn from(time: NaiveTime) -> Self {
        SlotTime(time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time))
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SlotTime::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Half-open interval `[start, end)` within one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: SlotTime,
    pub end: SlotTime,
}

impl TimeRange {
    pub fn new(start: SlotTime, end: SlotTime) -> Result<Self, ClinicError> {
        if start >= end {
            return Err(ClinicError::Validation(format!(
                "start time {} must be before end time {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn starting_at(start: SlotTime, duration_minutes: u32) -> Result<Self, ClinicError> {
        let end = start.checked_add_minutes(duration_minutes).ok_or_else(|| {
            ClinicError::Validation(format!("interval starting at {} runs past midnight", start))
        })?;
        Self::new(start, end)
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration_minutes(&self) -> u32 {
        self.end.minutes_from_midnight() - self.start.minutes_from_midnight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(raw: &str) -> SlotTime {
        SlotTime::parse(raw).unwrap()
    }

    #[test]
    fn display_forms_collapse_to_one_value() {
        assert_eq!(t("9:00 AM"), t("09:00"));
        assert_eq!(t("9:00"), t("09:00:00"));
        assert_eq!(t("1:30 pm"), t("13:30"));
        assert_eq!(t("9:00 AM").to_string(), "09:00");
    }

    #[test]
    fn rejects_garbage() {
        assert!(SlotTime::parse("25:00").is_err());
        assert!(SlotTime::parse("noon").is_err());
        assert!(SlotTime::parse("  ").is_err());
    }

    #[test]
    fn ordering_is_chronological_not_lexical() {
        assert!(t("9:00 AM") < t("10:00"));
        assert!(t("12:00 PM") < t("1:00 PM"));
    }

    #[test]
    fn adding_minutes_never_wraps() {
        assert_eq!(t("23:30").checked_add_minutes(30), None);
        assert_eq!(t("16:30").checked_add_minutes(30), Some(t("17:00")));
    }

    #[test]
    fn ranges_are_half_open() {
        let morning = TimeRange::new(t("09:00"), t("09:30")).unwrap();
        let next = TimeRange::new(t("09:30"), t("10:00")).unwrap();
        let straddle = TimeRange::new(t("09:15"), t("09:45")).unwrap();

        assert!(!morning.overlaps(&next));
        assert!(morning.overlaps(&straddle));
        assert!(next.overlaps(&straddle));
        assert!(TimeRange::new(t("10:00"), t("10:00")).is_err());
    }

    #[test]
    fn serializes_as_canonical_label() {
        let json = serde_json::to_string(&t("7:05 PM")).unwrap();
        assert_eq!(json, "\"19:05\"");
        let back: SlotTime = serde_json::from_str("\"19:05:00\"").unwrap();
        assert_eq!(back, t("19:05"));
    }
}
