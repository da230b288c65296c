//! # Seasonal Recipient Resolution
//!
//! Recipients live in plain-text documents (typically raw Gist URLs) so the list can
//! be edited without redeploying. There are three lists:
//!
//! - **test**: used whenever test mode is on, regardless of season
//! - **main**: used during summer
//! - **offseason**: used the rest of the year
//!
//! The season comes from a [`SeasonCalendar`], normally the anchor-date policy.
//! A missing URL for the selected branch is a configuration error raised before
//! the fetch is attempted.

use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::RecipientUrls;
use crate::fetcher::{FetchError, ResilientFetcher};
use crate::season::{Season, SeasonCalendar};

#[derive(Error, Debug)]
pub enum RecipientError {
    /// No URL configured for the selected list
    #[error("recipient URL `email.recipient_urls.{0}` is not set")]
    MissingUrl(&'static str),

    #[error("failed to retrieve recipient list: {0}")]
    Fetch(#[from] FetchError),
}

/// Cleaned recipient addresses: trimmed, lower-cased, no empty entries.
///
/// Insertion order is kept for logging; downstream treats the list as a set of
/// Bcc targets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecipientList {
    addresses: Vec<String>,
}

impl RecipientList {
    /// Parse freeform text with comma and/or newline separators.
    ///
    /// # Example
    /// ```
    /// use ocean_report_lib::RecipientList;
    ///
    /// let list = RecipientList::parse("A@X.COM, b@x.com\n  c@x.com  ");
    /// assert_eq!(list.joined(), "a@x.com,b@x.com,c@x.com");
    /// ```
    pub fn parse(text: &str) -> Self {
        let addresses = text
            .split([',', '\n'])
            .map(|entry| entry.trim().to_lowercase())
            .filter(|entry| !entry.is_empty())
            .collect();
        RecipientList { addresses }
    }

    /// Comma-joined addresses without spaces
    pub fn joined(&self) -> String {
        self.addresses.join(",")
    }

    pub fn as_slice(&self) -> &[String] {
        &self.addresses
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl fmt::Display for RecipientList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

/// Which configured list to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecipientSource {
    Main,
    Offseason,
    Test,
}

impl RecipientSource {
    /// Config key under `email.recipient_urls`
    pub fn key(&self) -> &'static str {
        match self {
            RecipientSource::Main => "main",
            RecipientSource::Offseason => "offseason",
            RecipientSource::Test => "test",
        }
    }
}

pub struct SeasonalRecipientResolver<C: SeasonCalendar> {
    fetcher: ResilientFetcher,
    urls: RecipientUrls,
    calendar: C,
}

impl<C: SeasonCalendar> SeasonalRecipientResolver<C> {
    pub fn new(fetcher: ResilientFetcher, urls: RecipientUrls, calendar: C) -> Self {
        SeasonalRecipientResolver {
            fetcher,
            urls,
            calendar,
        }
    }

    /// Test mode wins; otherwise the season picks main or offseason.
    pub fn select_source(&self, today: NaiveDate, test_mode: bool) -> RecipientSource {
        if test_mode {
            return RecipientSource::Test;
        }
        match self.calendar.season_on(today) {
            Season::Summer => RecipientSource::Main,
            Season::Offseason => RecipientSource::Offseason,
        }
    }

    /// Configured URL for `source`; empty strings count as missing.
    pub fn source_url(&self, source: RecipientSource) -> Result<&str, RecipientError> {
        let url = match source {
            RecipientSource::Main => self.urls.main.as_deref(),
            RecipientSource::Offseason => self.urls.offseason.as_deref(),
            RecipientSource::Test => self.urls.test.as_deref(),
        };
        url.map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(RecipientError::MissingUrl(source.key()))
    }

    /// Fetch and clean the recipient list that applies on `today`.
    pub async fn resolve(
        &self,
        today: NaiveDate,
        test_mode: bool,
    ) -> Result<RecipientList, RecipientError> {
        let season = self.calendar.season_on(today);
        let source = self.select_source(today, test_mode);
        let url = self.source_url(source)?;
        info!(%season, list = source.key(), "Resolving recipients");

        let text = self.fetcher.get(url, &[]).await?;
        let recipients = RecipientList::parse(&text);
        debug!(recipients = ?recipients.as_slice(), "Parsed recipient list");
        info!(count = recipients.len(), "Resolved recipients");
        Ok(recipients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::season::{AnchorDateCalendar, MonthRangeCalendar};
    use crate::tests::stub::StubTransport;
    use std::sync::Arc;
    use std::time::Duration;

    const MAIN: &str = "https://lists.test/main.txt";
    const OFFSEASON: &str = "https://lists.test/offseason.txt";
    const TEST: &str = "https://lists.test/test.txt";

    fn urls() -> RecipientUrls {
        RecipientUrls {
            main: Some(MAIN.to_string()),
            offseason: Some(OFFSEASON.to_string()),
            test: Some(TEST.to_string()),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolver(
        stub: &Arc<StubTransport>,
        urls: RecipientUrls,
    ) -> SeasonalRecipientResolver<AnchorDateCalendar> {
        let fetcher = ResilientFetcher::new(stub.clone(), Duration::from_secs(10));
        let calendar = AnchorDateCalendar {
            memorial_day_offset: -4,
            labor_day_offset: 7,
        };
        SeasonalRecipientResolver::new(fetcher, urls, calendar)
    }

    #[test]
    fn test_parse_mixed_separators() {
        let raw = "A@EXAMPLE.COM, b@example.com\nc@example.com\n  D@EXAMPLE.com  ";
        assert_eq!(
            RecipientList::parse(raw).joined(),
            "a@example.com,b@example.com,c@example.com,d@example.com"
        );
    }

    #[test]
    fn test_parse_is_idempotent() {
        let once = RecipientList::parse("A@X.COM, b@x.com\n  c@x.com  \r\n,,\n");
        let twice = RecipientList::parse(&once.joined());
        assert_eq!(once.joined(), "a@x.com,b@x.com,c@x.com");
        assert_eq!(twice, once);
    }

    #[test]
    fn test_parse_blank_text() {
        assert!(RecipientList::parse("  \n , \n").is_empty());
    }

    #[test]
    fn test_test_mode_has_priority() {
        let stub = Arc::new(StubTransport::new());
        let r = resolver(&stub, urls());
        assert_eq!(r.select_source(ymd(2024, 7, 4), true), RecipientSource::Test);
        assert_eq!(r.select_source(ymd(2024, 7, 4), false), RecipientSource::Main);
        assert_eq!(
            r.select_source(ymd(2024, 12, 1), false),
            RecipientSource::Offseason
        );
    }

    #[test]
    fn test_alternate_calendar() {
        let fetcher = ResilientFetcher::new(Arc::new(StubTransport::new()), Duration::from_secs(1));
        let r = SeasonalRecipientResolver::new(fetcher, urls(), MonthRangeCalendar);
        // Late May is summer under the anchor policy but not under the month check
        assert_eq!(
            r.select_source(ymd(2024, 5, 28), false),
            RecipientSource::Offseason
        );
    }

    #[tokio::test]
    async fn test_resolve_fetches_seasonal_list() {
        let stub = Arc::new(
            StubTransport::new()
                .respond(MAIN, "Summer@X.com\nother@x.com")
                .respond(OFFSEASON, "winter@x.com"),
        );
        let r = resolver(&stub, urls());

        let summer = r.resolve(ymd(2024, 7, 4), false).await.unwrap();
        assert_eq!(summer.joined(), "summer@x.com,other@x.com");

        let winter = r.resolve(ymd(2024, 11, 4), false).await.unwrap();
        assert_eq!(winter.joined(), "winter@x.com");
    }

    #[tokio::test]
    async fn test_missing_url_fails_before_fetch() {
        let stub = Arc::new(StubTransport::new());
        let r = resolver(
            &stub,
            RecipientUrls {
                test: Some("   ".to_string()),
                ..urls()
            },
        );

        let err = r.resolve(ymd(2024, 7, 4), true).await.unwrap_err();
        assert!(matches!(err, RecipientError::MissingUrl("test")));
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_error() {
        let stub = Arc::new(StubTransport::new().fail(TEST, FetchError::Status(404)));
        let r = resolver(&stub, urls());

        let err = r.resolve(ymd(2024, 7, 4), true).await.unwrap_err();
        assert!(matches!(err, RecipientError::Fetch(FetchError::Status(404))));
    }
}
