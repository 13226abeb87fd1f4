use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::entities::movie;

/// Raw create/update body, as sent by the client in JSON or form encoding.
/// Every field is optional here so that missing ones can be reported by name.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[schema(as = MovieInput)]
pub struct MoviePayload {
    #[serde(default)]
    pub title: Option<String>,
    /// Minutes, as an integer or a numeric string.
    #[serde(default, deserialize_with = "text_or_number")]
    #[schema(value_type = Option<i32>)]
    pub running_time: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    /// `YYYY-MM-DD`; a `YYYY-MM-DDTHH:MM:SS` datetime is truncated to its date.
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub cast_detail: Option<String>,
}

/// A validated set of movie fields, ready to be written by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMovie {
    pub title: String,
    pub running_time: i32,
    pub language: String,
    pub genre: String,
    pub release_date: NaiveDate,
    pub cast_detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError { field, message: message.into() });
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            f.write_str(&err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl MoviePayload {
    /// Checks fields in declaration order and collects every failure.
    pub fn validate(self) -> Result<NewMovie, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = required(&mut errors, "title", self.title);
        let running_time = required(&mut errors, "running_time", self.running_time).and_then(
            |raw| match raw.trim().parse::<i32>() {
                Ok(minutes) => Some(minutes),
                Err(_) => {
                    errors.push("running_time", "running_time must be an integer");
                    None
                }
            },
        );
        let language = required(&mut errors, "language", self.language);
        let genre = required(&mut errors, "genre", self.genre);
        let release_date = required(&mut errors, "release_date", self.release_date).and_then(
            |raw| match parse_release_date(raw.trim()) {
                Some(date) => Some(date),
                None => {
                    errors.push("release_date", "release_date must be a date (YYYY-MM-DD)");
                    None
                }
            },
        );
        let cast_detail = required(&mut errors, "cast_detail", self.cast_detail);

        match (title, running_time, language, genre, release_date, cast_detail) {
            (
                Some(title),
                Some(running_time),
                Some(language),
                Some(genre),
                Some(release_date),
                Some(cast_detail),
            ) => Ok(NewMovie { title, running_time, language, genre, release_date, cast_detail }),
            _ => Err(errors),
        }
    }
}

fn required(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<String>,
) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v),
        _ => {
            errors.push(field, format!("{field} is required"));
            None
        }
    }
}

/// Accepts `YYYY-MM-DD`, or a `YYYY-MM-DDTHH:MM:SS` datetime whose time part is dropped.
fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|dt| dt.date()))
}

/// Form bodies carry every value as text while JSON bodies may send numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Loose>::deserialize(deserializer)?.map(|v| match v {
        Loose::Text(s) => s,
        Loose::Int(n) => n.to_string(),
        Loose::Float(n) => n.to_string(),
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedMovie {
    pub message: String,
    #[serde(flatten)]
    pub movie: movie::Model,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}
