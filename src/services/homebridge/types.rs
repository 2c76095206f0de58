// Homebridge UI API types.
// Raw accessory payloads as Homebridge returns them, and the simplified shapes the hub serves.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Service types the hub treats as lights.
pub const LIGHT_SERVICE_TYPES: [&str; 3] = ["Lightbulb", "Switch", "Outlet"];

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// Body of `PUT /api/accessories/{uniqueId}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SetCharacteristic {
    pub characteristic_type: String,
    pub value: Value,
}

impl SetCharacteristic {
    pub fn on(value: bool) -> Self {
        Self {
            characteristic_type: "On".to_string(),
            value: Value::Bool(value),
        }
    }
}

/// Bridge instance an accessory belongs to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Instance {
    pub name: Option<String>,
}

/// One service entry from `GET /api/accessories`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessory {
    pub unique_id: Option<String>,
    #[serde(rename = "type", default)]
    pub service_type: String,
    pub service_name: Option<String>,
    #[serde(default)]
    pub values: Map<String, Value>,
    #[serde(default)]
    pub accessory_information: Map<String, Value>,
    #[serde(default)]
    pub instance: Instance,
}

impl Accessory {
    pub fn is_light(&self) -> bool {
        LIGHT_SERVICE_TYPES.contains(&self.service_type.as_str())
    }

    /// Service name, then the accessory's information name, then "Unknown".
    pub fn display_name(&self) -> String {
        self.service_name
            .clone()
            .or_else(|| {
                self.accessory_information
                    .get("Name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Current power state; Homebridge reports it as a bool or as 0/1.
    pub fn is_on(&self) -> bool {
        self.values.get("On").is_some_and(truthy)
    }
}

/// Simplified light served from the `lights` cache entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Light {
    pub unique_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub light_type: String,
    pub on: bool,
    pub brightness: Option<Value>,
    pub room: Option<String>,
}

impl From<&Accessory> for Light {
    fn from(accessory: &Accessory) -> Self {
        Self {
            unique_id: accessory.unique_id.clone(),
            name: accessory.display_name(),
            light_type: accessory.service_type.clone(),
            on: accessory.is_on(),
            brightness: accessory.values.get("Brightness").cloned(),
            room: accessory.instance.name.clone(),
        }
    }
}

/// Result of toggling one light.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResult {
    pub unique_id: String,
    pub name: String,
    pub on: bool,
}

/// A light that could not be switched during a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub unique_id: String,
    pub error: String,
}

/// Outcome of switching a batch of lights; partial success is normal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BatchResult {
    pub affected: usize,
    pub errors: Vec<BatchFailure>,
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}
