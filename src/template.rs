//! Output path templates
//!
//! A template is an ordinary path containing `{placeholder}` tokens that are
//! resolved from the recording [`Identity`] and a [`SegmentTiming`] snapshot.
//!
//! Supported placeholders:
//! - `{server_id}`, `{hostname_short}`, `{hostname_long}`
//! - `{stream_name}`, `{channel_name}`, `{stream_id}`, `{channel_id}`
//! - `{start_*}` and `{end_*}` where `*` is one of `year`, `month`, `day`,
//!   `hour`, `minute`, `second`, `millisecond`, `unix_second`,
//!   `unix_millisecond`, `time` or `pts`
//! - `{duration_second}`, `{duration_millisecond}`
//!
//! Unknown placeholders are kept verbatim.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use nvrmux::{Identity, PathTemplate, SegmentTiming};
//!
//! let identity = Identity {
//!     stream_name: "lobby".to_string(),
//!     ..Default::default()
//! };
//! let timing = SegmentTiming::starting_at(Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap());
//! let template = PathTemplate::new("/rec/{stream_name}/{start_year}/{start_month}/{unknown}.mp4");
//!
//! assert_eq!(template.render(&identity, &timing), "/rec/lobby/2024/3/{unknown}.mp4");
//! ```

use crate::Identity;
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::time::Duration;

/// Timing bookmarks of the segment being named
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentTiming {
    /// Wall-clock time the segment was opened
    pub start: DateTime<Utc>,
    /// Wall-clock time the segment was (or is being) closed
    pub end: DateTime<Utc>,
    /// Presentation time of the first packet in the segment
    pub pts_start: Duration,
    /// Presentation time of the last packet in the segment
    pub pts_end: Duration,
    /// Accumulated primary-stream duration
    pub duration: Duration,
}

impl SegmentTiming {
    /// Fresh bookmarks for a segment opened at `start`
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: start,
            pts_start: Duration::ZERO,
            pts_end: Duration::ZERO,
            duration: Duration::ZERO,
        }
    }
}

/// Path with `{placeholder}` tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    template: String,
}

impl PathTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Resolve every known placeholder.
    ///
    /// The template is scanned once from left to right, so substituted values
    /// are never themselves treated as placeholders.
    pub fn render(&self, identity: &Identity, timing: &SegmentTiming) -> String {
        let mut out = String::with_capacity(self.template.len() + 32);
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) if !after[..close].contains('{') => {
                    let name = &after[..close];
                    match resolve(name, identity, timing) {
                        Some(value) => out.push_str(&value),
                        None => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                Some(_) => {
                    // stray brace before the real token
                    out.push('{');
                    rest = after;
                }
                None => {
                    rest = &rest[open..];
                    break;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

fn resolve(name: &str, identity: &Identity, timing: &SegmentTiming) -> Option<String> {
    let value = match name {
        "server_id" => identity.server_id.clone(),
        "hostname_short" => identity.hostname_short().to_string(),
        "hostname_long" => identity.hostname.clone(),
        "stream_name" => identity.stream_name.clone(),
        "channel_name" => identity.channel_name.clone(),
        "stream_id" => identity.stream_id.clone(),
        "channel_id" => identity.channel_id.clone(),
        "duration_second" => format!("{:.6}", timing.duration.as_secs_f64()),
        "duration_millisecond" => timing.duration.as_millis().to_string(),
        _ => {
            if let Some(field) = name.strip_prefix("start_") {
                return time_field(field, &timing.start, timing.pts_start);
            }
            if let Some(field) = name.strip_prefix("end_") {
                return time_field(field, &timing.end, timing.pts_end);
            }
            return None;
        }
    };
    Some(value)
}

fn time_field(field: &str, at: &DateTime<Utc>, pts: Duration) -> Option<String> {
    let value = match field {
        "year" => at.year().to_string(),
        "month" => at.month().to_string(),
        "day" => at.day().to_string(),
        "hour" => at.hour().to_string(),
        "minute" => at.minute().to_string(),
        "second" => at.second().to_string(),
        "millisecond" => at.timestamp_subsec_millis().to_string(),
        "unix_second" => at.timestamp().to_string(),
        "unix_millisecond" => at.timestamp_millis().to_string(),
        "time" => at.format("%Y-%m-%dT%H:%M:%S%z").to_string(),
        "pts" => pts.as_millis().to_string(),
        _ => return None,
    };
    Some(value)
}
