//! Parsing error types
//!
//! `ExtractionError` is raised by the pure extraction rules,
//! `ParsingError` by the page parsers that apply selectors to a document.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Season '{0}' is not a year")]
    InvalidSeason(String),

    #[error("Invalid date: season {season}, month {month}, day {day}")]
    InvalidDate { season: String, month: u32, day: u32 },

    #[error("Unrecognised date caption '{0}'")]
    InvalidDateCaption(String),

    #[error("Attribute '{attribute}' is not a number: '{value}'")]
    InvalidCoordinate { attribute: String, value: String },
}

#[derive(Error, Debug, Clone)]
pub enum ParsingError {
    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Required field '{field}' not found in HTML")]
    RequiredFieldMissing {
        field: String,
        context: Option<String>,
    },

    #[error("Invalid link '{href}': {reason}")]
    InvalidUrl { href: String, reason: String },

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}

impl ParsingError {
    /// Create a required field missing error with context
    pub fn required_field_missing(field: &str, context: Option<&str>) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            context: context.map(|s| s.to_string()),
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
