// Todo list reader.
// Loads a JSON file exported by a phone shortcut; either a bare list or {"items": [...]}.

use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Settings;
use crate::error::{HubError, Result};

/// Snapshot served from the `todos` cache entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TodoList {
    pub items: Vec<Value>,
    pub count: usize,
    /// Set when the file does not exist yet.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub file_missing: bool,
}

impl TodoList {
    fn new(items: Vec<Value>) -> Self {
        Self {
            count: items.len(),
            items,
            file_missing: false,
        }
    }

    fn missing() -> Self {
        Self {
            file_missing: true,
            ..Self::default()
        }
    }

    /// Accept a bare list or an object with an `items` list.
    pub fn from_json(raw: Value) -> Result<Self> {
        match raw {
            Value::Array(items) => Ok(Self::new(items)),
            Value::Object(mut fields) => match fields.remove("items") {
                Some(Value::Array(items)) => Ok(Self::new(items)),
                _ => Err(unexpected_format()),
            },
            _ => Err(unexpected_format()),
        }
    }
}

fn unexpected_format() -> HubError {
    HubError::InvalidData(
        r#"unexpected todos JSON format: expected list or {"items": [...]}"#.to_string(),
    )
}

/// Reads the todos file on every refresh.
#[derive(Debug, Clone)]
pub struct TodosReader {
    path: PathBuf,
}

impl TodosReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.todos_file_path)
    }

    /// Read and validate the file. A missing file is not an error.
    pub async fn read(&self) -> Result<TodoList> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(TodoList::missing()),
            Err(e) => return Err(e.into()),
        };
        TodoList::from_json(serde_json::from_str(&contents)?)
    }
}
