use serde::{Deserialize, Serialize};

use crate::Map;

/// The body of `GET /api/flags`: every flag the service knows about, by name.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FlagDocument(Map);

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FlagDocumentError {
    #[error("The flag service did not report the flag '{0}'")]
    Missing(String),

    #[error("The flag '{key}' is not a boolean: {value}")]
    NotBoolean { key: String, value: serde_json::Value },
}

impl FlagDocument {
    pub fn new(flags: Map) -> Self {
        Self(flags)
    }

    pub fn enabled(&self, key: &str) -> Result<bool, FlagDocumentError> {
        let value = self
            .0
            .get(key)
            .ok_or_else(|| FlagDocumentError::Missing(key.to_string()))?;

        value
            .as_bool()
            .ok_or_else(|| FlagDocumentError::NotBoolean {
                key: key.to_string(),
                value: value.clone(),
            })
    }

    pub(crate) fn set(&mut self, key: impl Into<String>, enabled: bool) {
        self.0.insert(key.into(), enabled.into());
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for FlagDocument {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), serde_json::Value::from(v)))
                .collect(),
        )
    }
}

/// The body of `POST /api/flags`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlagUpdate {
    pub state: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Health {
    pub status: String,
}

impl Health {
    pub(crate) fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
