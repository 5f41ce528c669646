//! Capture identity encoded in recording base names.
//!
//! A base name is produced once, at capture time, and never changes:
//!
//! ```text
//! YYYY-MM-DD_HH-MM-SS_<lat>_<lon>_<accuracy>_<altitude>     (6 tokens, lat/lon form)
//! YYYYMMDD_HHMMSS_<gridref>_<accuracy>_<altitude>           (5 tokens, grid reference form)
//! ```
//!
//! Both the dashed and the compact date/time spellings are accepted by the
//! parser. The location form is decided by the token count alone. Altitude
//! is an integer number of meters or `none` when the fix carried no altitude.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{FieldrecError, Result};
use crate::storage::{split_object_name, ASSET_SUFFIX};

/// Altitude token written when the fix had no altitude.
pub const NO_ALTITUDE: &str = "none";

const GRID_FORM_TOKENS: usize = 5;
const LATLON_FORM_TOKENS: usize = 6;

/// Location half of a capture identity.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureLocation {
    /// A single grid reference token.
    GridRef(String),
    /// Decimal degrees as recorded by the device.
    LatLon { latitude: f64, longitude: f64 },
}

/// Decoded capture identity of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureDetails {
    pub captured_at: NaiveDateTime,
    pub location: CaptureLocation,
    /// Horizontal accuracy in meters.
    pub accuracy_m: u32,
    /// Altitude in meters, if recorded.
    pub altitude_m: Option<i32>,
}

/// Capture details rendered as display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayDetails {
    pub filename: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub accuracy: String,
    pub altitude: String,
}

impl CaptureDetails {
    /// Build capture details from a live fix, rounding the way the recorder does:
    /// coordinates to 5 decimals, accuracy up, altitude down.
    pub fn from_fix(
        captured_at: NaiveDateTime,
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        altitude: Option<f64>,
    ) -> Self {
        let round5 = |v: f64| (v * 100_000.0).round() / 100_000.0;
        Self {
            captured_at,
            location: CaptureLocation::LatLon {
                latitude: round5(latitude),
                longitude: round5(longitude),
            },
            accuracy_m: accuracy.max(0.0).ceil() as u32,
            altitude_m: altitude.map(|a| a.floor() as i32),
        }
    }

    /// Parse a base name, or an asset/document object name.
    pub fn parse(name: &str) -> Result<Self> {
        let base = split_object_name(name)
            .map(|(_, base)| base)
            .unwrap_or(name);
        let invalid = |reason: &str| FieldrecError::InvalidFilename {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let tokens: Vec<&str> = base.split('_').collect();
        let (location, accuracy, altitude) = match tokens.len() {
            GRID_FORM_TOKENS => {
                if tokens[2].is_empty() {
                    return Err(invalid("empty grid reference"));
                }
                (
                    CaptureLocation::GridRef(tokens[2].to_string()),
                    tokens[3],
                    tokens[4],
                )
            }
            LATLON_FORM_TOKENS => {
                let latitude = tokens[2]
                    .parse::<f64>()
                    .map_err(|_| invalid("latitude is not a number"))?;
                let longitude = tokens[3]
                    .parse::<f64>()
                    .map_err(|_| invalid("longitude is not a number"))?;
                if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude)
                {
                    return Err(invalid("coordinates out of range"));
                }
                (
                    CaptureLocation::LatLon {
                        latitude,
                        longitude,
                    },
                    tokens[4],
                    tokens[5],
                )
            }
            n => return Err(invalid(&format!("expected 5 or 6 tokens, found {n}"))),
        };

        let date = parse_date(tokens[0]).ok_or_else(|| invalid("unrecognised date"))?;
        let time = parse_time(tokens[1]).ok_or_else(|| invalid("unrecognised time"))?;

        let accuracy_m = accuracy
            .parse::<u32>()
            .map_err(|_| invalid("accuracy is not a whole number of meters"))?;

        let altitude_m = match altitude {
            "" | NO_ALTITUDE => None,
            a => Some(
                a.parse::<i32>()
                    .map_err(|_| invalid("altitude is not a whole number of meters"))?,
            ),
        };

        Ok(Self {
            captured_at: date.and_time(time),
            location,
            accuracy_m,
            altitude_m,
        })
    }

    /// Encode as a base name (dashed form, no suffix).
    pub fn base_name(&self) -> String {
        let location = match &self.location {
            CaptureLocation::GridRef(gr) => gr.clone(),
            CaptureLocation::LatLon {
                latitude,
                longitude,
            } => format!("{latitude}_{longitude}"),
        };
        let altitude = self
            .altitude_m
            .map(|a| a.to_string())
            .unwrap_or_else(|| NO_ALTITUDE.to_string());
        format!(
            "{}_{}_{}_{}",
            self.captured_at.format("%Y-%m-%d_%H-%M-%S"),
            location,
            self.accuracy_m,
            altitude
        )
    }

    /// Object name of the recording asset.
    pub fn asset_name(&self) -> String {
        format!("{}{ASSET_SUFFIX}", self.base_name())
    }

    /// Original high-precision fix, when the name carries one.
    pub fn original_fix(&self) -> Option<(f64, f64)> {
        match self.location {
            CaptureLocation::LatLon {
                latitude,
                longitude,
            } => Some((latitude, longitude)),
            CaptureLocation::GridRef(_) => None,
        }
    }

    /// Capture date as `DD/MM/YYYY`.
    pub fn date_display(&self) -> String {
        self.captured_at.format("%d/%m/%Y").to_string()
    }

    /// Capture date as `YYYY-MM-DD`, the metadata document's date format.
    pub fn date_iso(&self) -> String {
        self.captured_at.format("%Y-%m-%d").to_string()
    }

    /// Capture time as `HH:MM:SS`.
    pub fn time_display(&self) -> String {
        self.captured_at.format("%H:%M:%S").to_string()
    }

    pub fn location_display(&self) -> String {
        match &self.location {
            CaptureLocation::GridRef(gr) => gr.clone(),
            CaptureLocation::LatLon {
                latitude,
                longitude,
            } => format!("{latitude}/{longitude}"),
        }
    }

    pub fn display(&self, filename: &str) -> DisplayDetails {
        DisplayDetails {
            filename: filename.to_string(),
            date: self.date_display(),
            time: self.time_display(),
            location: self.location_display(),
            accuracy: self.accuracy_m.to_string(),
            altitude: self.altitude_m.map(|a| a.to_string()).unwrap_or_default(),
        }
    }
}

fn parse_date(token: &str) -> Option<chrono::NaiveDate> {
    let format = if token.len() == 8 { "%Y%m%d" } else { "%Y-%m-%d" };
    chrono::NaiveDate::parse_from_str(token, format).ok()
}

fn parse_time(token: &str) -> Option<chrono::NaiveTime> {
    let format = if token.len() == 6 { "%H%M%S" } else { "%H-%M-%S" };
    chrono::NaiveTime::parse_from_str(token, format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_decode_grid_form() {
        let details = CaptureDetails::parse("20240321_140530_SU1234_10_52.wav").unwrap();
        let display = details.display("20240321_140530_SU1234_10_52.wav");

        assert_eq!(display.date, "21/03/2024");
        assert_eq!(display.time, "14:05:30");
        assert_eq!(display.location, "SU1234");
        assert_eq!(display.accuracy, "10");
        assert_eq!(display.altitude, "52");
        assert_eq!(details.original_fix(), None);
    }

    #[test]
    fn test_decode_latlon_form() {
        let details =
            CaptureDetails::parse("2015-02-14_20-54-45_53.59675_-2.51646_15_none").unwrap();

        assert_eq!(details.date_display(), "14/02/2015");
        assert_eq!(details.time_display(), "20:54:45");
        assert_eq!(details.original_fix(), Some((53.59675, -2.51646)));
        assert_eq!(details.location_display(), "53.59675/-2.51646");
        assert_eq!(details.accuracy_m, 15);
        assert_eq!(details.altitude_m, None);
    }

    #[test]
    fn test_document_name_is_accepted() {
        let details = CaptureDetails::parse("20240321_140530_SU1234_10_52.txt").unwrap();
        assert_eq!(details.location, CaptureLocation::GridRef("SU1234".into()));
    }

    #[test]
    fn test_negative_altitude() {
        let details = CaptureDetails::parse("20240321_140530_SU1234_3_-4").unwrap();
        assert_eq!(details.altitude_m, Some(-4));
    }

    #[test]
    fn test_rejects_wrong_token_count() {
        assert!(CaptureDetails::parse("20240321_140530_10_52").is_err());
        assert!(CaptureDetails::parse("not-a-recording").is_err());
        assert!(CaptureDetails::parse("a_b_c_d_e_f_g").is_err());
    }

    #[test]
    fn test_rejects_bad_fields() {
        assert!(CaptureDetails::parse("20241341_140530_SU1234_10_52").is_err());
        assert!(CaptureDetails::parse("20240321_250530_SU1234_10_52").is_err());
        assert!(CaptureDetails::parse("20240321_140530_SU1234_ten_52").is_err());
        assert!(CaptureDetails::parse("20240321_140530_SU1234_10_high").is_err());
        assert!(CaptureDetails::parse("20240321_140530_91.0_0.0_10_52").is_err());
    }

    #[test]
    fn test_encode_from_fix() {
        let at = NaiveDate::from_ymd_opt(2015, 2, 14)
            .unwrap()
            .and_hms_opt(20, 54, 45)
            .unwrap();
        let details = CaptureDetails::from_fix(at, 53.596754, -2.516461, 14.2, Some(12.9));

        assert_eq!(details.base_name(), "2015-02-14_20-54-45_53.59675_-2.51646_15_12");
        assert_eq!(
            details.asset_name(),
            "2015-02-14_20-54-45_53.59675_-2.51646_15_12.wav"
        );

        let reparsed = CaptureDetails::parse(&details.asset_name()).unwrap();
        assert_eq!(reparsed, details);
    }

    #[test]
    fn test_encode_without_altitude() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 21)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let details = CaptureDetails::from_fix(at, 51.5, -0.1, 5.0, None);
        assert!(details.base_name().ends_with("_5_none"));
    }
}
