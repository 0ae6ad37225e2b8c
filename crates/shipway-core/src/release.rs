//! Release identity and ordering
//!
//! A release is named by the UTC instant it was created, rendered at
//! millisecond resolution so that identifiers are collision-free across
//! back-to-back deploys and lexicographic order of the rendered form
//! coincides with chronological order.

use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};

use crate::error::Error;

/// Rendered form of a release identifier, e.g. `20260806_142301_512`.
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

/// Monotonic identifier of a release.
///
/// Ordering is defined on the underlying instant, not on any string
/// encoding; the fixed-width rendered form sorts identically, which keeps
/// directory listings and identifier order in agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseId(DateTime<Utc>);

impl ReleaseId {
    /// Identifier for a release created now.
    pub fn now() -> Self {
        Self::from_instant(Utc::now())
    }

    /// Identifier for a release created at `instant`.
    ///
    /// The instant is truncated to millisecond resolution so that rendering
    /// and re-parsing an identifier round-trips exactly.
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        let millis = instant.timestamp_subsec_millis();
        let truncated = instant
            .with_nanosecond(millis * 1_000_000)
            .expect("millisecond value is always in range - this is a bug in shipway");
        ReleaseId(truncated)
    }

    /// The creation instant this identifier encodes.
    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(STAMP_FORMAT))
    }
}

impl FromStr for ReleaseId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let naive = NaiveDateTime::parse_from_str(s, STAMP_FORMAT)
            .map_err(|_| Error::invalid_release_id(s))?;
        Ok(ReleaseId(Utc.from_utc_datetime(&naive)))
    }
}

/// An immutable, timestamped snapshot of the deployable source tree.
///
/// Releases are deleted wholesale, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Identifier, unique within the retention window
    pub id: ReleaseId,
    /// Directory under the releases root
    pub path: Utf8PathBuf,
}
