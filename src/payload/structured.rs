//! Structured payload carried in a teacher's QR code.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

const ID_KEYS: [&str; 3] = ["id", "teacherId", "teacher_id"];

/// Reasons decoded text is not a usable payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPayload {
    #[error("decoded text is empty")]
    Empty,
    #[error("decoded text is not JSON: {0}")]
    NotJson(String),
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("payload has no teacher identifier")]
    MissingId,
    #[error("payload field `{0}` must be a non-empty string")]
    BadField(&'static str),
}

/// Application data embedded in a QR code: a teacher identifier plus
/// optional descriptive fields.
///
/// Unknown fields are kept in `extra` so they reach the verifier intact.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredPayload {
    /// Teacher identifier.
    pub id: String,
    /// Display name printed on the code.
    pub name: Option<String>,
    /// Department or faculty.
    pub department: Option<String>,
    /// Any other fields.
    pub extra: BTreeMap<String, Value>,
}

impl StructuredPayload {
    /// Creates a payload with only an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            department: None,
            extra: BTreeMap::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the department.
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// Parses decoded text.
    ///
    /// The identifier may be spelled `id`, `teacherId` or `teacher_id`.
    pub fn parse(text: &str) -> Result<Self, InvalidPayload> {
        let text = text.trim();
        if text.is_empty() {
            return Err(InvalidPayload::Empty);
        }

        let value: Value =
            serde_json::from_str(text).map_err(|e| InvalidPayload::NotJson(e.to_string()))?;
        let Value::Object(mut object) = value else {
            return Err(InvalidPayload::NotAnObject);
        };

        let id_key = ID_KEYS
            .iter()
            .find(|k| object.contains_key(**k))
            .ok_or(InvalidPayload::MissingId)?;
        let id = match object.remove(*id_key) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return Err(InvalidPayload::BadField("id")),
        };

        let name = take_optional(&mut object, "name")?;
        let department = take_optional(&mut object, "department")?;

        Ok(Self {
            id,
            name,
            department,
            extra: object.into_iter().collect(),
        })
    }

    /// Encodes the payload as the JSON text printed into QR codes.
    pub fn encode(&self) -> String {
        let mut object = Map::new();
        object.insert("id".into(), Value::String(self.id.clone()));
        if let Some(name) = &self.name {
            object.insert("name".into(), Value::String(name.clone()));
        }
        if let Some(department) = &self.department {
            object.insert("department".into(), Value::String(department.clone()));
        }
        for (key, value) in &self.extra {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object).to_string()
    }
}

fn take_optional(
    object: &mut Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, InvalidPayload> {
    match object.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(InvalidPayload::BadField(field)),
    }
}
