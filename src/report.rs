//! # Report Formatting
//!
//! Turns fetched data into the plain-text email body. Each data source renders its
//! own section; [`ReportComposer::compose`] then concatenates a dated header, the
//! sections in fixed order (water temperature, tides, wind) and an attribution
//! footer.
//!
//! Missing data never removes a section. The heading stays and its content says
//! the data is unavailable.

use chrono::NaiveDate;

use crate::{Fetched, TideEvent, WindSample};

/// Shown in place of data that could not be fetched
pub const UNAVAILABLE: &str = "unavailable";

/// `🌡️ Water Temperature: 72.5 °F`
pub fn format_water_temp(temperature: &Fetched<f64>) -> String {
    match temperature {
        Fetched::Ready(temp_f) => format!("🌡️ Water Temperature: {temp_f:.1} °F\n\n"),
        Fetched::Absent | Fetched::Failed(_) => {
            format!("🌡️ Water Temperature: {UNAVAILABLE}\n\n")
        }
    }
}

/// One line per tide event, e.g. `High Tide at 2:47 PM — 3.2 ft`.
///
/// `None` means the tide feed failed; an empty slice means no extrema fell in
/// the daylight window.
pub fn format_tides(events: Option<&[TideEvent]>) -> String {
    let lines = match events {
        None => UNAVAILABLE.to_string(),
        Some([]) => "No high or low tides during daylight hours".to_string(),
        Some(events) => events
            .iter()
            .map(|event| {
                format!(
                    "{} at {} — {:.1} ft",
                    event.kind,
                    event.timestamp.format("%-I:%M %p"),
                    event.height_ft
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    };
    format!("🌊 Tides:\n{lines}\n\n")
}

/// Aligned wind lines, e.g. `-  8 AM:  6.2 mph SE  (140°) → Onshore`.
pub fn format_wind(samples: &[WindSample]) -> String {
    let mut lines = vec![
        "🌬️ Wind Forecast:".to_string(),
        "Key times for your beach today:".to_string(),
    ];

    if samples.is_empty() {
        lines.push("No wind forecast for today's key times".to_string());
    }

    for sample in samples {
        let time = sample.timestamp().format("%-I %p").to_string();
        let speed = format!("{:.1}", sample.speed_mph());
        let degrees = format!("({:.0}°)", sample.direction_deg());
        lines.push(format!(
            "- {time:>5}: {speed:>4} mph {direction:<3} {degrees:>6} → {wind_type}",
            direction = sample.compass(),
            wind_type = sample.wind_type(),
        ));
    }

    lines.join("\n") + "\n\n"
}

/// Email subject: `<base>: YYYY-MM-DD`, prefixed with `TEST: ` in test mode.
pub fn subject_line(base: &str, date: NaiveDate, test_mode: bool) -> String {
    let subject = format!("{base}: {}", date.format("%Y-%m-%d"));
    if test_mode {
        format!("TEST: {subject}")
    } else {
        subject
    }
}

/// Assembles the report body.
#[derive(Clone, Debug)]
pub struct ReportComposer {
    attribution: String,
}

impl ReportComposer {
    pub fn new(station_name: &str, station_id: &str) -> Self {
        ReportComposer {
            attribution: format!(
                "Tide & water temp from NOAA ({station_name} Station {station_id}) | Wind by Open-Meteo"
            ),
        }
    }

    /// Header, then water temperature, tides and wind sections, then the footer.
    pub fn compose(
        &self,
        date: NaiveDate,
        water_temp_section: &str,
        tide_section: &str,
        wind_section: &str,
    ) -> String {
        let header = format!(
            "Daily Water Report – {} \n\n",
            date.format("%A, %B %d, %Y")
        );
        [
            header.as_str(),
            water_temp_section,
            tide_section,
            wind_section,
            "--------",
            "\n",
            self.attribution.as_str(),
        ]
        .concat()
    }
}
