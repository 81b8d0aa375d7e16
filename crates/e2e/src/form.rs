//! `application/x-www-form-urlencoded` request bodies

use crate::error::E2eResult;

/// A single form field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    Flag(bool),
}

impl FormValue {
    fn encoded(&self) -> String {
        match self {
            FormValue::Text(text) => text.clone(),
            FormValue::Flag(flag) => flag.to_string(),
        }
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Text(value.to_string())
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        FormValue::Text(value)
    }
}

impl From<bool> for FormValue {
    fn from(value: bool) -> Self {
        FormValue::Flag(value)
    }
}

/// Form fields with unique names, sent in insertion order
#[derive(Debug, Clone, Default)]
pub struct FormBody {
    fields: Vec<(String, FormValue)>,
}

impl FormBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing the value in place if the name already exists
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FormValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FormValue>) {
        let name = name.into();
        let value = value.into();

        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// URL-encode the fields
    pub fn encode(&self) -> E2eResult<String> {
        let pairs: Vec<(&str, String)> = self
            .fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.encoded()))
            .collect();
        Ok(serde_urlencoded::to_string(pairs)?)
    }
}
