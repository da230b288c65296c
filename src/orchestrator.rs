//! # Report Orchestration
//!
//! Runs one report end to end:
//!
//! 1. In send mode, check SMTP credentials before touching the network
//! 2. Fetch tides, water temperature, wind and recipients concurrently
//! 3. Abort if wind or recipients failed; degrade tides and temperature
//! 4. Compose the body and subject
//! 5. Send the email, or return the printable message in dry-run mode

use chrono::{Local, NaiveDate};
use thiserror::Error;
use tracing::{error, info};

use crate::config::{Config, ConfigError};
use crate::emailer::{DispatchError, EmailDispatcher, OutgoingEmail};
use crate::fetcher::ResilientFetcher;
use crate::recipients::{RecipientError, SeasonalRecipientResolver};
use crate::report::{self, ReportComposer};
use crate::season::AnchorDateCalendar;
use crate::tide_data::{self, TideWindowFilter};
use crate::water_temp::WaterTempReader;
use crate::wind::{WindClassifier, WindError};
use crate::Fetched;

/// Fatal failures of a report run.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("wind section failed: {0}")]
    Wind(#[from] WindError),

    #[error("recipient resolution failed: {0}")]
    Recipients(#[from] RecipientError),

    #[error("email delivery failed: {0}")]
    Dispatch(#[from] DispatchError),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions {
    /// Send the email; otherwise return the message for printing
    pub send: bool,
    /// Use the test recipient list and mark the subject
    pub test_mode: bool,
    /// Report date; today's local date when `None`
    pub today: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Sent { recipients: usize },
    /// Dry run: the full message (headers and body)
    Printed(String),
}

pub struct ReportOrchestrator<'a> {
    config: &'a Config,
    fetcher: ResilientFetcher,
}

impl<'a> ReportOrchestrator<'a> {
    pub fn new(config: &'a Config, fetcher: ResilientFetcher) -> Self {
        ReportOrchestrator { config, fetcher }
    }

    /// Fetch everything and assemble the addressed email.
    pub async fn build_email(
        &self,
        today: NaiveDate,
        test_mode: bool,
    ) -> Result<OutgoingEmail, ReportError> {
        let config = self.config;

        let tides = TideWindowFilter::new(
            self.fetcher.clone(),
            &config.noaa.api_url,
            &config.noaa.application,
        );
        let water = WaterTempReader::new(
            self.fetcher.clone(),
            &config.noaa.api_url,
            &config.noaa.application,
        );
        let wind = WindClassifier::new(
            self.fetcher.clone(),
            &config.wind.api_url,
            &config.location.timezone,
        );
        let resolver = SeasonalRecipientResolver::new(
            self.fetcher.clone(),
            config.email.recipient_urls.clone(),
            AnchorDateCalendar::from_config(&config.summer),
        );

        // A missing list URL is a configuration error; fail before any fetch
        resolver.source_url(resolver.select_source(today, test_mode))?;

        info!(%today, test_mode, "Fetching report data");
        let (tide_events, water_temp, wind_samples, recipients) = tokio::join!(
            tides.fetch_tides(&config.noaa.station_id, Some(today)),
            water.fetch_latest(&config.noaa.station_id),
            wind.fetch_daily_wind(
                config.location.latitude,
                config.location.longitude,
                config.location.beach_orientation_degrees,
                &config.wind.times,
                Some(today),
            ),
            resolver.resolve(today, test_mode),
        );

        let wind_samples =
            wind_samples.inspect_err(|err| error!(error = %err, "Wind fetch failed"))?;
        let recipients =
            recipients.inspect_err(|err| error!(error = %err, "Recipient resolution failed"))?;

        let daytime = match &tide_events {
            Fetched::Ready(events) => Some(tide_data::filter_daytime(
                events,
                config.tides.start_hour,
                config.tides.end_hour,
            )),
            Fetched::Absent | Fetched::Failed(_) => None,
        };

        info!("Generating email body");
        let composer = ReportComposer::new(&config.noaa.station_name, &config.noaa.station_id);
        let body = composer.compose(
            today,
            &report::format_water_temp(&water_temp),
            &report::format_tides(daytime.as_deref()),
            &report::format_wind(&wind_samples),
        );

        Ok(OutgoingEmail {
            subject: report::subject_line(&config.email.subject, today, test_mode),
            body,
            sender: config.email.sender.clone(),
            recipient: config.email.recipient.trim().to_string(),
            bcc: recipients.as_slice().to_vec(),
        })
    }

    /// Run the whole report.
    pub async fn run(&self, options: RunOptions) -> Result<RunOutcome, ReportError> {
        if options.send {
            self.config.validate_for_send()?;
        }

        let today = options.today.unwrap_or_else(|| Local::now().date_naive());
        let email = self.build_email(today, options.test_mode).await?;

        if !options.send {
            info!("Email sending is disabled; printing message instead");
            return Ok(RunOutcome::Printed(email.preview()));
        }

        info!(recipients = email.bcc.len(), "Sending email");
        let dispatcher = EmailDispatcher::from_config(&self.config.email, self.fetcher.timeout());
        dispatcher
            .send(&email, self.config.email.password.as_deref())
            .await?;

        Ok(RunOutcome::Sent {
            recipients: email.bcc.len(),
        })
    }
}
