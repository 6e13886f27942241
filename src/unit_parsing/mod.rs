// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to parse strings into plain numbers or some quantity with a unit,
//! e.g. interpolation windows like "30s" or "1.5MHz".

mod error;

pub use error::UnitParseError;

use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, EnumIter, EnumString, IntoStaticStr)]
pub enum TimeFormat {
    /// Seconds
    S,

    /// Milliseconds
    Ms,

    /// Minutes
    Min,

    /// Hours
    H,
}

impl TimeFormat {
    /// Multiply a number in this unit by this to get seconds.
    pub fn to_seconds(self) -> f64 {
        match self {
            TimeFormat::S => 1.0,
            TimeFormat::Ms => 1e-3,
            TimeFormat::Min => 60.0,
            TimeFormat::H => 3600.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, EnumIter, EnumString, IntoStaticStr)]
#[allow(non_camel_case_types)]
pub enum FreqFormat {
    /// Hertz
    Hz,

    /// kiloHertz
    kHz,

    /// MegaHertz
    MHz,

    /// GigaHertz
    GHz,
}

impl FreqFormat {
    /// Multiply a number in this unit by this to get Hz.
    pub fn to_hz(self) -> f64 {
        match self {
            FreqFormat::Hz => 1.0,
            FreqFormat::kHz => 1e3,
            FreqFormat::MHz => 1e6,
            FreqFormat::GHz => 1e9,
        }
    }
}

/// Split a string like "1.5 MHz" into its number and its (trimmed) suffix.
fn split_suffix(s: &str) -> (&str, &str) {
    let s = s.trim();
    let suffix = s
        .trim_start_matches(|c: char| c.is_numeric() || c == '.' || c == '-' || c == '+')
        .trim();
    let prefix = s.trim_end_matches(char::is_alphabetic).trim();
    (prefix, suffix)
}

/// Parse a string that may have a unit of time attached to it. `None` is
/// returned as the format if no unit was given.
pub fn parse_time(s: &str) -> Result<(f64, Option<TimeFormat>), UnitParseError> {
    // Try to parse a naked number.
    if let Ok(number) = s.trim().parse() {
        return Ok((number, None));
    };

    // That didn't work; let's search over our supported formats.
    let (prefix, suffix) = split_suffix(s);
    for time_format in TimeFormat::iter() {
        let time_format_str: &'static str = time_format.into();
        if suffix.to_uppercase() == time_format_str.to_uppercase() {
            let number: f64 = prefix
                .parse()
                .map_err(|_| UnitParseError::GotTimeUnitButCantParse(s.to_string()))?;
            return Ok((number, Some(time_format)));
        }
    }

    // If we made it this far, we don't know how to parse the string.
    Err(UnitParseError::Unknown {
        input: s.to_string(),
        unit_type: "time",
    })
}

/// Parse a string that may have a unit of frequency attached to it. `None` is
/// returned as the format if no unit was given.
pub fn parse_freq(s: &str) -> Result<(f64, Option<FreqFormat>), UnitParseError> {
    if let Ok(number) = s.trim().parse() {
        return Ok((number, None));
    };

    let (prefix, suffix) = split_suffix(s);
    for freq_format in FreqFormat::iter() {
        let freq_format_str: &'static str = freq_format.into();
        if suffix.to_uppercase() == freq_format_str.to_uppercase() {
            let number: f64 = prefix
                .parse()
                .map_err(|_| UnitParseError::GotFreqUnitButCantParse(s.to_string()))?;
            return Ok((number, Some(freq_format)));
        }
    }

    Err(UnitParseError::Unknown {
        input: s.to_string(),
        unit_type: "frequency",
    })
}

/// Parse a time quantity into seconds. A naked number is taken to be seconds.
pub fn parse_seconds(s: &str) -> Result<f64, UnitParseError> {
    let (number, format) = parse_time(s)?;
    Ok(number * format.map(TimeFormat::to_seconds).unwrap_or(1.0))
}

/// Parse a frequency quantity into Hz. A naked number is taken to be Hz.
pub fn parse_hz(s: &str) -> Result<f64, UnitParseError> {
    let (number, format) = parse_freq(s)?;
    Ok(number * format.map(FreqFormat::to_hz).unwrap_or(1.0))
}
