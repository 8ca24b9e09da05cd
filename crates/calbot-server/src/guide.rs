//! Locating the current weekend guide.
//!
//! A new guide is published every Thursday at
//! `/little-rock-weekend-guide-<mon>-<thu>-<sun>/`, e.g.
//! `/little-rock-weekend-guide-may-9-12/`.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use url::Url;

use crate::error::ServerResult;

/// The most recent Thursday on or before `today`.
pub fn publication_thursday(today: NaiveDate) -> NaiveDate {
    let since = (today.weekday().num_days_from_monday() + 7
        - Weekday::Thu.num_days_from_monday())
        % 7;
    today - Days::new(u64::from(since))
}

/// URL of the guide published on `thursday`.
///
/// The Sunday in the slug is the Thursday's day of month plus three, even
/// when the weekend crosses into the next month; the site names its
/// articles that way.
pub fn guide_url(base: &Url, thursday: NaiveDate) -> ServerResult<Url> {
    let month = thursday.format("%b").to_string().to_lowercase();
    let day = thursday.day();
    let slug = format!("little-rock-weekend-guide-{month}-{day}-{}/", day + 3);
    Ok(base.join(&slug)?)
}
