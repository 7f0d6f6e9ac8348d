//! Schema-driven form validation and payload building.
//!
//! A screen declares its fields once as a [`FormSchema`]; [`submit_form`]
//! validates the collected [`FormData`] against it and only then renders a
//! multipart or JSON body and issues the single write.

use std::fmt;

use chrono::NaiveDate;
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::{
    error::{ClientError, ValidationError},
    gateway::{ApiRequest, ApiResponse, Body, HttpGateway, Method, Part},
};

pub const MB: u64 = 1024 * 1024;

#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text { min_len: usize },
    Number { min: Option<f64>, max: Option<f64> },
    Date,
    File { max_bytes: u64, mime_prefix: Option<&'static str> },
    Select,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn text(name: &'static str, label: &'static str) -> Self {
        Self::required(name, label, FieldKind::Text { min_len: 0 })
    }

    pub fn number(name: &'static str, label: &'static str) -> Self {
        Self::required(
            name,
            label,
            FieldKind::Number {
                min: None,
                max: None,
            },
        )
    }

    pub fn date(name: &'static str, label: &'static str) -> Self {
        Self::required(name, label, FieldKind::Date)
    }

    pub fn file(name: &'static str, label: &'static str, max_bytes: u64) -> Self {
        Self::required(
            name,
            label,
            FieldKind::File {
                max_bytes,
                mime_prefix: None,
            },
        )
    }

    pub fn select(name: &'static str, label: &'static str) -> Self {
        Self::required(name, label, FieldKind::Select)
    }

    fn required(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn min_len(mut self, min_len: usize) -> Self {
        if let FieldKind::Text { min_len: current } = &mut self.kind {
            *current = min_len;
        }
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        if let FieldKind::Number {
            min: current_min,
            max: current_max,
        } = &mut self.kind
        {
            *current_min = min;
            *current_max = max;
        }
        self
    }

    pub fn accept(mut self, prefix: &'static str) -> Self {
        if let FieldKind::File { mime_prefix, .. } = &mut self.kind {
            *mime_prefix = Some(prefix);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    File(FileUpload),
    Choice(i64),
    Unset,
}

impl FieldValue {
    fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Unset => true,
            FieldValue::File(_) | FieldValue::Choice(_) => false,
        }
    }
}

/// Values collected from a form, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    values: Vec<(String, FieldValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: FieldValue) {
        match self.values.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((name.to_string(), value)),
        }
    }

    pub fn with_text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, FieldValue::Text(value.into()));
        self
    }

    pub fn with_choice(mut self, name: &str, value: Option<i64>) -> Self {
        self.set(
            name,
            value.map(FieldValue::Choice).unwrap_or(FieldValue::Unset),
        );
        self
    }

    pub fn with_file(mut self, name: &str, value: Option<FileUpload>) -> Self {
        self.set(name, value.map(FieldValue::File).unwrap_or(FieldValue::Unset));
        self
    }

    pub fn get(&self, name: &str) -> &FieldValue {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
            .unwrap_or(&FieldValue::Unset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Multipart,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSchema {
    fields: Vec<FieldSpec>,
}

impl FormSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Checks fields in declaration order and reports the first failure.
    pub fn validate(&self, form: &FormData) -> Result<(), ValidationError> {
        for spec in &self.fields {
            validate_field(spec, form.get(spec.name))?;
        }
        Ok(())
    }

    pub fn to_multipart(&self, form: &FormData) -> Vec<(String, Part)> {
        let mut parts = Vec::new();
        for spec in &self.fields {
            let part = match form.get(spec.name) {
                FieldValue::Text(text) => Part::Text(text.clone()),
                FieldValue::Choice(choice) => Part::Text(choice.to_string()),
                FieldValue::File(file) => Part::File(file.clone()),
                FieldValue::Unset => continue,
            };
            parts.push((spec.name.to_string(), part));
        }
        parts
    }

    pub fn to_json(&self, form: &FormData) -> Value {
        let mut object = Map::new();
        for spec in &self.fields {
            let value = match (form.get(spec.name), &spec.kind) {
                (FieldValue::Text(text), FieldKind::Number { .. }) => number_value(text),
                (FieldValue::Text(text), _) => Value::String(text.clone()),
                (FieldValue::Choice(choice), _) => Value::from(*choice),
                (FieldValue::File(_), _) | (FieldValue::Unset, _) => continue,
            };
            object.insert(spec.name.to_string(), value);
        }
        Value::Object(object)
    }

    pub fn render(&self, form: &FormData, encoding: Encoding) -> Body {
        match encoding {
            Encoding::Multipart => Body::Multipart(self.to_multipart(form)),
            Encoding::Json => Body::Json(self.to_json(form)),
        }
    }
}

fn number_value(text: &str) -> Value {
    let trimmed = text.trim();
    if let Ok(integer) = trimmed.parse::<i64>() {
        return Value::from(integer);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(text.to_string()))
}

fn validate_field(spec: &FieldSpec, value: &FieldValue) -> Result<(), ValidationError> {
    if value.is_blank() {
        if !spec.required {
            return Ok(());
        }
        let message = match spec.kind {
            FieldKind::Select => format!("Please select a {}", spec.label.to_lowercase()),
            FieldKind::File { .. } => format!("Please select a {} file", spec.label.to_lowercase()),
            _ => format!("{} is required", spec.label),
        };
        return Err(ValidationError::for_field(spec.name, message));
    }

    match (&spec.kind, value) {
        (FieldKind::Text { min_len }, FieldValue::Text(text)) => {
            if text.trim().chars().count() < *min_len {
                return Err(ValidationError::for_field(
                    spec.name,
                    format!("{} must be at least {min_len} characters", spec.label),
                ));
            }
        }
        (FieldKind::Number { min, max }, FieldValue::Text(text)) => {
            let parsed = text.trim().parse::<f64>().map_err(|_| {
                ValidationError::for_field(spec.name, format!("{} must be a number", spec.label))
            })?;
            if let Some(min) = min {
                if parsed < *min {
                    return Err(ValidationError::for_field(
                        spec.name,
                        format!("{} must be at least {min}", spec.label),
                    ));
                }
            }
            if let Some(max) = max {
                if parsed > *max {
                    return Err(ValidationError::for_field(
                        spec.name,
                        format!("{} must be at most {max}", spec.label),
                    ));
                }
            }
        }
        (FieldKind::Date, FieldValue::Text(text)) => {
            NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|_| {
                ValidationError::for_field(
                    spec.name,
                    format!("{} must be a date (YYYY-MM-DD)", spec.label),
                )
            })?;
        }
        (
            FieldKind::File {
                max_bytes,
                mime_prefix,
            },
            FieldValue::File(file),
        ) => check_file(spec.name, spec.label, *max_bytes, *mime_prefix, file)?,
        (FieldKind::Select, FieldValue::Choice(_)) => {}
        _ => {
            return Err(ValidationError::for_field(
                spec.name,
                format!("{} has an invalid value", spec.label),
            ));
        }
    }
    Ok(())
}

fn check_file(
    name: &str,
    label: &str,
    max_bytes: u64,
    mime_prefix: Option<&str>,
    file: &FileUpload,
) -> Result<(), ValidationError> {
    if file.size() > max_bytes {
        return Err(ValidationError::for_field(
            name,
            format!("{label} size should not exceed {}", human_size(max_bytes)),
        ));
    }
    if let Some(prefix) = mime_prefix {
        if !file.mime_type.starts_with(prefix) {
            let kind = prefix.trim_end_matches('/');
            let article = if kind.starts_with(['a', 'e', 'i', 'o', 'u']) {
                "an"
            } else {
                "a"
            };
            return Err(ValidationError::for_field(
                name,
                format!("Please select {article} {kind} file"),
            ));
        }
    }
    Ok(())
}

fn human_size(bytes: u64) -> String {
    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else {
        format!("{bytes} bytes")
    }
}

/// A file picker bound to a size ceiling and optional MIME prefix.
///
/// A rejected selection clears the input, like resetting the browser's
/// file element.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInput {
    name: &'static str,
    label: &'static str,
    max_bytes: u64,
    mime_prefix: Option<&'static str>,
    selected: Option<FileUpload>,
}

impl FileInput {
    pub fn new(name: &'static str, label: &'static str, max_bytes: u64) -> Self {
        Self {
            name,
            label,
            max_bytes,
            mime_prefix: None,
            selected: None,
        }
    }

    pub fn accept(mut self, prefix: &'static str) -> Self {
        self.mime_prefix = Some(prefix);
        self
    }

    pub fn select(&mut self, file: FileUpload) -> Result<(), ValidationError> {
        match check_file(self.name, self.label, self.max_bytes, self.mime_prefix, &file) {
            Ok(()) => {
                self.selected = Some(file);
                Ok(())
            }
            Err(err) => {
                self.selected = None;
                Err(err)
            }
        }
    }

    pub fn selected(&self) -> Option<&FileUpload> {
        self.selected.as_ref()
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }
}

/// Validates `form` against `schema` and, only if it passes, issues one write.
pub async fn submit_form(
    gateway: &dyn HttpGateway,
    method: Method,
    path: impl Into<String>,
    schema: &FormSchema,
    form: &FormData,
    encoding: Encoding,
) -> Result<ApiResponse, ClientError> {
    schema.validate(form)?;
    let request = ApiRequest::new(method, path).with_body(schema.render(form, encoding));
    debug!(
        method = ?request.method,
        path = %request.path,
        multipart = request.is_multipart(),
        "submitting form"
    );
    Ok(gateway.send(request).await?)
}

#[cfg(test)]
#[path = "tests/forms_tests.rs"]
mod tests;
