//! Request and response payloads for the HTTP surface
//!
//! Bodies are validated by hand from `serde_json::Value` so that every shape
//! problem becomes a 400 with a readable message instead of an extractor
//! rejection.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{RelayError, Result};

/// Minimum number of frames for the analysis endpoint.
pub const MIN_FRAMES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRequest {
    pub title: String,
    pub outcomes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextFrameRequest {
    pub title: String,
    pub current_frame: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeFramesRequest {
    pub title: String,
    pub frames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeResult {
    pub index: usize,
    pub outcome: String,
    pub result: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionResponse {
    pub title: String,
    pub results: Vec<OutcomeResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NextFrameResponse {
    pub title: String,
    pub current_frame: String,
    pub result: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeFramesResponse {
    pub title: String,
    pub frames: Vec<String>,
    pub result: String,
}

/// Parse a raw body into a JSON object.
pub fn parse_object(body: &[u8]) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| RelayError::invalid("request body must be valid JSON"))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(RelayError::invalid("request body must be a JSON object")),
    }
}

fn required_text(obj: &Map<String, Value>, field: &str) -> Result<String> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(RelayError::invalid(format!("'{field}' must not be empty"))),
        Some(_) => Err(RelayError::invalid(format!("'{field}' must be a string"))),
        None => Err(RelayError::invalid(format!("'{field}' is required"))),
    }
}

fn required_text_list(obj: &Map<String, Value>, field: &str) -> Result<Vec<String>> {
    let items = match obj.get(field) {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(RelayError::invalid(format!("'{field}' must be a list"))),
        None => return Err(RelayError::invalid(format!("'{field}' is required"))),
    };
    if items.is_empty() {
        return Err(RelayError::invalid(format!("'{field}' must not be empty")));
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
            _ => Err(RelayError::invalid(format!(
                "'{field}' entry {} must be a non-empty string",
                i + 1
            ))),
        })
        .collect()
}

impl DecisionRequest {
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let obj = parse_object(body)?;
        Ok(Self {
            title: required_text(&obj, "title")?,
            outcomes: required_text_list(&obj, "outcomes")?,
        })
    }
}

impl NextFrameRequest {
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let obj = parse_object(body)?;
        Ok(Self {
            title: required_text(&obj, "title")?,
            current_frame: required_text(&obj, "current_frame")?,
        })
    }
}

impl AnalyzeFramesRequest {
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let obj = parse_object(body)?;
        let title = required_text(&obj, "title")?;
        let frames = required_text_list(&obj, "frames")?;
        if frames.len() < MIN_FRAMES {
            return Err(RelayError::invalid(format!(
                "'frames' needs at least {MIN_FRAMES} entries, got {}",
                frames.len()
            )));
        }
        Ok(Self { title, frames })
    }
}
