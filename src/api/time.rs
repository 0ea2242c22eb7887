//! Bit-exact time formats used by the Management Activity API.
//!
//! Window bounds travel as naive `YYYY-MM-DDTHH:MM:SS` strings, and
//! `contentCreated` timestamps carry a trailing `Z` but are defined by the
//! upstream service in the reporting zone, not UTC. Both sides are therefore
//! interpreted in the host's local time zone; normalizing to UTC would shift
//! the dedup watermark whenever the host zone differs from the API's.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// Serialization format for `startTime` / `endTime` query parameters.
pub const WINDOW_BOUND_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const WINDOW_MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M";
const WINDOW_DATE_FORMAT: &str = "%Y-%m-%d";
const CONTENT_CREATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Formats a window bound the way the content endpoint expects it.
pub fn format_window_bound(t: DateTime<Local>) -> String {
    t.format(WINDOW_BOUND_FORMAT).to_string()
}

/// Parses a window bound in any of the three precisions the API accepts:
/// date only, minute, or second.
pub fn parse_window_bound(s: &str) -> Result<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(s, WINDOW_BOUND_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, WINDOW_MINUTE_FORMAT))
        .or_else(|_| {
            NaiveDate::parse_from_str(s, WINDOW_DATE_FORMAT).map(|d| d.and_time(NaiveTime::MIN))
        })
        .with_context(|| format!("invalid window bound {s:?}"))?;
    into_local(naive)
}

/// Parses a `contentCreated` timestamp, fractional seconds optional.
pub fn parse_content_created(s: &str) -> Result<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(s, CONTENT_CREATED_FORMAT)
        .with_context(|| format!("invalid content creation time {s:?}"))?;
    into_local(naive)
}

fn into_local(naive: NaiveDateTime) -> Result<DateTime<Local>> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(t) => Ok(t),
        // DST fold: both mappings are valid, take the earlier one.
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(anyhow!("local time {naive} does not exist in this time zone")),
    }
}
