//! The analyze request contract and its validation.

use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

use crate::{
    error::{DetectError, Result},
    io::fetch::{is_video_link, Source},
};

/// Accepted field names, current first.
const KEY_FIELDS: [&str; 2] = ["key_verified", "key_verity"];
const KIND_FIELDS: [&str; 2] = ["source_kind", "data_type"];
const LOCATOR_FIELDS: [&str; 2] = ["locator", "file_path"];
const CONTENT_FIELDS: [&str; 2] = ["inline_content", "file_content"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    ObjectStore,
    Link,
    Inline,
}

impl SourceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "object_store" | "aws" => Some(Self::ObjectStore),
            "link" | "youtube" => Some(Self::Link),
            "inline" | "admin_test" => Some(Self::Inline),
            _ => None,
        }
    }
}

/// A validated analyze request from an authorized key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeRequest {
    pub source: Source,
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|n| obj.get(*n))
}

fn invalid(msg: impl Into<String>) -> DetectError {
    DetectError::Validation(msg.into())
}

impl AnalyzeRequest {
    /// Validates a raw request body. Checks run in a fixed order and the
    /// first failure is reported.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(invalid("No information has been received."));
        }

        let value: Value =
            serde_json::from_slice(body).map_err(|_| invalid("Invalid JSON in request body"))?;
        let obj = value
            .as_object()
            .ok_or_else(|| invalid("Invalid JSON in request body"))?;

        let missing = |names: &[&str]| invalid(format!("Missing required key: {}", names[0]));
        let key = field(obj, &KEY_FIELDS).ok_or_else(|| missing(&KEY_FIELDS))?;
        let kind = field(obj, &KIND_FIELDS).ok_or_else(|| missing(&KIND_FIELDS))?;
        let locator = field(obj, &LOCATOR_FIELDS).ok_or_else(|| missing(&LOCATOR_FIELDS))?;

        let key_verified = key
            .as_bool()
            .ok_or_else(|| invalid("Invalid value for key_verified."))?;
        if !key_verified {
            return Err(DetectError::Unauthorized(
                "This API key is not authorized.".into(),
            ));
        }
        let kind = kind
            .as_str()
            .and_then(SourceKind::parse)
            .ok_or_else(|| invalid("Invalid value for source_kind."))?;
        let locator = locator
            .as_str()
            .ok_or_else(|| invalid("Invalid value for locator."))?;

        let decoded = || percent_decode_str(locator).decode_utf8_lossy().into_owned();

        let source = match kind {
            // Requested exactly as received; the key is decoded only when
            // naming the local file.
            SourceKind::ObjectStore => Source::ObjectStore(locator.to_string()),
            SourceKind::Link => {
                let link = decoded();
                if !is_video_link(&link) {
                    return Err(invalid("Invalid YouTube link."));
                }
                Source::Link(link)
            }
            SourceKind::Inline => {
                let content = field(obj, &CONTENT_FIELDS)
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("Invalid value for inline_content."))?;
                Source::Inline {
                    name: decoded(),
                    content: content.to_string(),
                }
            }
        };

        Ok(Self { source })
    }
}
