//! Core data model shared by the parser and the execution harness.
//!
//! - `SourceUnit`: the immutable program text everything else borrows from.
//! - `FunctionRecord`: byte-offset 5-tuple describing one function and its context.
//! - `Outcome`: the fixed classification of one execution attempt.
//! - `ProgramInput`: a program as handed to the harness, resolved once at the boundary.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One program's primary entry-point code.
///
/// The buffer is never mutated after construction; parsers and the sandbox only
/// borrow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    text: String,
}

impl SourceUnit {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl From<&str> for SourceUnit {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Byte offsets of one top-level function and its surrounding comment context.
///
/// Ordering invariant:
/// `start_comment <= start_header <= end_header <= end_docstring <= end_function`.
/// Without a leading comment `start_comment == start_header`; without an in-body
/// leading comment `end_docstring == end_header`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[usize; 5]", into = "[usize; 5]")]
pub struct FunctionRecord {
    pub start_comment: usize,
    pub start_header: usize,
    pub end_header: usize,
    pub end_docstring: usize,
    pub end_function: usize,
}

impl FunctionRecord {
    pub fn as_array(&self) -> [usize; 5] {
        [
            self.start_comment,
            self.start_header,
            self.end_header,
            self.end_docstring,
            self.end_function,
        ]
    }

    /// True when the offsets are ordered and all fall inside a buffer of `len` bytes.
    pub fn is_well_formed(&self, len: usize) -> bool {
        self.as_array().windows(2).all(|w| w[0] <= w[1]) && self.end_function <= len
    }

    pub fn has_comment(&self) -> bool {
        self.start_comment < self.start_header
    }

    pub fn has_docstring(&self) -> bool {
        self.end_docstring > self.end_header
    }

    /// Slice `source` into comment, header, docstring and body.
    ///
    /// Returns `None` if the record does not belong to `source` (out of range or
    /// not on character boundaries).
    pub fn parts<'s>(&self, source: &'s str) -> Option<FunctionParts<'s>> {
        if !self.is_well_formed(source.len()) {
            return None;
        }
        Some(FunctionParts {
            comment: source.get(self.start_comment..self.start_header)?,
            header: source.get(self.start_header..self.end_header)?,
            docstring: source.get(self.end_header..self.end_docstring)?,
            body: source.get(self.end_docstring..self.end_function)?,
        })
    }
}

impl From<[usize; 5]> for FunctionRecord {
    fn from(v: [usize; 5]) -> Self {
        Self {
            start_comment: v[0],
            start_header: v[1],
            end_header: v[2],
            end_docstring: v[3],
            end_function: v[4],
        }
    }
}

impl From<FunctionRecord> for [usize; 5] {
    fn from(r: FunctionRecord) -> Self {
        r.as_array()
    }
}

/// Materialized substrings of a function, borrowed from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionParts<'s> {
    pub comment: &'s str,
    pub header: &'s str,
    pub docstring: &'s str,
    pub body: &'s str,
}

/// Classification of one execution attempt. Mutually exclusive, recorded once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum Outcome {
    Ok,
    Incomplete,
    Error,
    Timeout,
    Crash,
}

impl Outcome {
    /// Token used for tabular storage. `Crash` keeps its historical name `panic`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Incomplete => "incomplete",
            Outcome::Error => "error",
            Outcome::Timeout => "timeout",
            Outcome::Crash => "panic",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid outcome '{0}'. Allowed: ok, incomplete, error, timeout, panic")]
pub struct ParseOutcomeError(pub String);

impl FromStr for Outcome {
    type Err = ParseOutcomeError;

    fn from_str(s: &str) -> Result<Self, ParseOutcomeError> {
        match s {
            "ok" => Ok(Outcome::Ok),
            "incomplete" => Ok(Outcome::Incomplete),
            "error" => Ok(Outcome::Error),
            "timeout" | "timedout" => Ok(Outcome::Timeout),
            "panic" => Ok(Outcome::Crash),
            other => Err(ParseOutcomeError(other.to_string())),
        }
    }
}

impl From<Outcome> for &'static str {
    fn from(o: Outcome) -> Self {
        o.as_str()
    }
}

impl TryFrom<String> for Outcome {
    type Error = ParseOutcomeError;

    // `Self::Error` would name the `Outcome::Error` variant here.
    fn try_from(value: String) -> Result<Self, ParseOutcomeError> {
        value.parse()
    }
}

/// A program with its auxiliary passes and inputs, as stored in a dataset row.
///
/// Only `image_code` is interpreted; every other pass and input is forwarded to
/// the renderer untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredProgram {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub image_code: String,
    /// Other `<pass>_code` columns keyed by pass (e.g. `common`, `buffer_a`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub passes: BTreeMap<String, String>,
    /// `<pass>_inputs` columns keyed by pass, opaque.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Program record has no string field 'image_code'")]
    MissingImageCode,
    #[error("Unsupported program value: expected a string or an object, found {0}")]
    Unsupported(&'static str),
}

/// A program as accepted at the harness boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgramInput {
    RawCode(SourceUnit),
    StructuredProgram(StructuredProgram),
}

impl ProgramInput {
    pub fn raw(code: impl Into<String>) -> Self {
        ProgramInput::RawCode(SourceUnit::new(code))
    }

    /// Resolve a JSON value into a program: strings are raw code, objects are
    /// dataset records carrying `image_code`.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, InputError> {
        use serde_json::Value;
        match value {
            Value::String(code) => Ok(Self::raw(code.clone())),
            Value::Object(map) => Self::from_record(map),
            Value::Null => Err(InputError::Unsupported("null")),
            Value::Bool(_) => Err(InputError::Unsupported("a boolean")),
            Value::Number(_) => Err(InputError::Unsupported("a number")),
            Value::Array(_) => Err(InputError::Unsupported("an array")),
        }
    }

    /// Build a structured program from a flattened dataset record.
    pub fn from_record(map: &serde_json::Map<String, serde_json::Value>) -> Result<Self, InputError> {
        let image_code = map
            .get("image_code")
            .and_then(|v| v.as_str())
            .ok_or(InputError::MissingImageCode)?
            .to_string();
        let id = map.get("id").and_then(|v| v.as_str()).map(str::to_string);

        let mut passes = BTreeMap::new();
        let mut inputs = BTreeMap::new();
        for (key, value) in map {
            if let Some(pass) = key.strip_suffix("_code") {
                if pass == "image" {
                    continue;
                }
                if let Some(code) = value.as_str() {
                    if !code.is_empty() {
                        passes.insert(pass.to_string(), code.to_string());
                    }
                }
            } else if let Some(pass) = key.strip_suffix("_inputs") {
                inputs.insert(pass.to_string(), value.clone());
            }
        }

        Ok(ProgramInput::StructuredProgram(StructuredProgram { id, image_code, passes, inputs }))
    }

    /// The entry-point source, regardless of variant.
    pub fn image_code(&self) -> &str {
        match self {
            ProgramInput::RawCode(unit) => unit.as_str(),
            ProgramInput::StructuredProgram(program) => &program.image_code,
        }
    }
}
