//! Multipart form decoding for create endpoints that accept uploads.
//!
//! # Invariants
//! - Blank text fields read as absent.
//! - List fields accept a JSON array, repeated fields or a comma-separated
//!   string.
//! - Booleans are `true` only for `true` or `1`.

use std::collections::HashMap;

use axum::extract::Multipart;
use chrono::{DateTime, NaiveDate};
use log::warn;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::integrations::MediaUpload;

/// File part received before it is assigned a destination folder.
#[derive(Debug, Clone)]
pub struct FormFile {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FormFile {
    pub fn into_upload(self, folder: &str) -> MediaUpload {
        MediaUpload {
            file_name: self.file_name,
            content_type: self.content_type,
            bytes: self.bytes,
            folder: folder.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: Vec<FormFile>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await?.to_vec();
                    if bytes.is_empty() {
                        continue;
                    }
                    form.files.push(FormFile {
                        field: name,
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                None => {
                    let value = field.text().await?;
                    form.fields.entry(name).or_default().push(value);
                }
            }
        }
        Ok(form)
    }

    /// Builds a form from plain text fields.
    pub fn from_fields<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut form = Self::default();
        for (key, value) in pairs {
            form.fields
                .entry(key.to_string())
                .or_default()
                .push(value.to_string());
        }
        form
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(|values| values.first())
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.text(key).map(str::to_string)
    }

    pub fn list(&self, key: &str) -> Vec<String> {
        match self.fields.get(key) {
            None => Vec::new(),
            Some(values) if values.len() > 1 => values
                .iter()
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .collect(),
            Some(_) => self.text(key).map(parse_list).unwrap_or_default(),
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        self.text(key).is_some_and(parse_bool)
    }

    pub fn number(&self, key: &'static str) -> ApiResult<Option<f64>> {
        self.text(key)
            .map(|raw| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| ApiError::BadRequest(format!("{key} must be a number")))
            })
            .transpose()
    }

    pub fn integer(&self, key: &'static str) -> ApiResult<Option<i64>> {
        self.text(key)
            .map(|raw| {
                raw.parse::<i64>()
                    .map_err(|_| ApiError::BadRequest(format!("{key} must be a whole number")))
            })
            .transpose()
    }

    pub fn uuid(&self, key: &'static str) -> ApiResult<Option<Uuid>> {
        self.text(key)
            .map(|raw| {
                Uuid::parse_str(raw)
                    .map_err(|_| ApiError::BadRequest(format!("{key} must be a valid id")))
            })
            .transpose()
    }

    pub fn timestamp(&self, key: &'static str) -> ApiResult<Option<i64>> {
        self.text(key)
            .map(|raw| {
                parse_timestamp(raw)
                    .ok_or_else(|| ApiError::BadRequest(format!("{key} must be a date")))
            })
            .transpose()
    }

    /// JSON object field; malformed input is logged and ignored.
    pub fn json_object(&self, key: &str) -> Map<String, Value> {
        let Some(raw) = self.text(key) else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            _ => {
                warn!("event=form_parse module=http status=warn field={key} reason=not_json_object");
                Map::new()
            }
        }
    }

    /// Removes and returns every file sent under `field`, in arrival order.
    pub fn take_files(&mut self, field: &str, folder: &str) -> Vec<MediaUpload> {
        let (taken, rest): (Vec<FormFile>, Vec<FormFile>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|file| file.field == field);
        self.files = rest;
        taken
            .into_iter()
            .map(|file| file.into_upload(folder))
            .collect()
    }

    pub fn take_file(&mut self, field: &str, folder: &str) -> Option<MediaUpload> {
        let mut files = self.take_files(field, folder);
        if files.is_empty() {
            None
        } else {
            Some(files.swap_remove(0))
        }
    }
}

/// Parses a JSON string array, falling back to comma separation.
pub fn parse_list(raw: &str) -> Vec<String> {
    let values = match serde_json::from_str::<Vec<Value>>(raw) {
        Ok(values) => values
            .into_iter()
            .map(|value| match value {
                Value::String(text) => text,
                other => other.to_string(),
            })
            .collect(),
        Err(_) => raw.split(',').map(str::to_string).collect::<Vec<_>>(),
    };
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

pub fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim(), "true" | "1")
}

/// Epoch milliseconds from an integer, an RFC 3339 instant or a calendar date.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<i64>() {
        return Some(millis);
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.timestamp_millis());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_accept_json_or_comma_separated() {
        assert_eq!(parse_list(r#"["red", " blue ", ""]"#), vec!["red", "blue"]);
        assert_eq!(parse_list("s, m ,,l"), vec!["s", "m", "l"]);
        assert_eq!(parse_list("[broken"), vec!["[broken"]);
    }

    #[test]
    fn repeated_fields_form_a_list() {
        let form = FormData::from_fields([("tags", "audio"), ("tags", " sale "), ("tags", "")]);
        assert_eq!(form.list("tags"), vec!["audio", "sale"]);
    }

    #[test]
    fn booleans_accept_true_or_one_only() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("yes"));
        assert!(!parse_bool("TRUE"));
    }

    #[test]
    fn blank_fields_read_as_absent() {
        let form = FormData::from_fields([("title", "  "), ("originalPrice", "12.5")]);
        assert_eq!(form.text("title"), None);
        assert_eq!(form.number("originalPrice").unwrap(), Some(12.5));
        assert!(form.number("title").unwrap().is_none());
    }

    #[test]
    fn malformed_numbers_and_ids_are_rejected() {
        let form = FormData::from_fields([("originalPrice", "cheap"), ("createdBy", "42")]);
        assert!(form.number("originalPrice").is_err());
        assert!(form.uuid("createdBy").is_err());
    }

    #[test]
    fn timestamps_accept_several_formats() {
        assert_eq!(parse_timestamp("1700000000000"), Some(1_700_000_000_000));
        assert_eq!(parse_timestamp("1970-01-02"), Some(86_400_000));
        assert_eq!(parse_timestamp("1970-01-01T00:00:01Z"), Some(1_000));
        assert_eq!(parse_timestamp("next tuesday"), None);
    }

    #[test]
    fn invalid_specifications_are_ignored() {
        let form = FormData::from_fields([("specifications", "[1,2]"), ("other", r#"{"a":1}"#)]);
        assert!(form.json_object("specifications").is_empty());
        assert_eq!(form.json_object("other").get("a"), Some(&Value::from(1)));
    }
}
