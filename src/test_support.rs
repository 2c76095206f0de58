// Test helpers shared across modules.
// Throwaway axum servers on ephemeral ports standing in for Homebridge and for the hub itself.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const FAKE_TOKEN: &str = "tok-1";
pub const FAKE_PASSWORD: &str = "secret";

/// State of the fake Homebridge server.
#[derive(Debug)]
pub struct FakeHomebridge {
    pub logins: AtomicUsize,
    pub puts: Mutex<Vec<(String, Value)>>,
    pub accessories: Mutex<Vec<Value>>,
}

impl Default for FakeHomebridge {
    fn default() -> Self {
        Self {
            logins: AtomicUsize::new(0),
            puts: Mutex::new(Vec::new()),
            accessories: Mutex::new(vec![
                json!({
                    "uniqueId": "lamp",
                    "type": "Lightbulb",
                    "serviceName": "Desk Lamp",
                    "values": {"On": true, "Brightness": 80},
                    "instance": {"name": "Office"}
                }),
                json!({
                    "uniqueId": "strip",
                    "type": "Lightbulb",
                    "serviceName": "LED Strip",
                    "values": {"On": 0}
                }),
                json!({
                    "uniqueId": "sensor",
                    "type": "TemperatureSensor",
                    "serviceName": "Hallway",
                    "values": {"CurrentTemperature": 20.5}
                }),
                json!({
                    "uniqueId": "plug",
                    "type": "Outlet",
                    "accessoryInformation": {"Name": "Kettle"},
                    "values": {"On": false}
                }),
            ]),
        }
    }
}

impl FakeHomebridge {
    pub fn is_on(&self, unique_id: &str) -> Option<bool> {
        self.accessories
            .lock()
            .unwrap()
            .iter()
            .find(|a| a["uniqueId"] == unique_id)
            .map(|a| a["values"]["On"] == json!(true))
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {FAKE_TOKEN}"))
}

async fn login(State(fake): State<Arc<FakeHomebridge>>, Json(body): Json<Value>) -> Response {
    if body["password"] != FAKE_PASSWORD {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    fake.logins.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "access_token": FAKE_TOKEN })).into_response()
}

async fn accessories(State(fake): State<Arc<FakeHomebridge>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let accessories = fake.accessories.lock().unwrap().clone();
    Json(Value::Array(accessories)).into_response()
}

async fn set_characteristic(
    State(fake): State<Arc<FakeHomebridge>>,
    Path(unique_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if unique_id == "broken" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }

    let mut accessories = fake.accessories.lock().unwrap();
    let Some(accessory) = accessories.iter_mut().find(|a| a["uniqueId"] == unique_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    accessory["values"]["On"] = body["value"].clone();
    let updated = accessory.clone();
    drop(accessories);

    fake.puts.lock().unwrap().push((unique_id, body));
    Json(updated).into_response()
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Start a fake Homebridge that requires login with [`FAKE_PASSWORD`].
pub async fn fake_homebridge() -> (String, Arc<FakeHomebridge>) {
    let fake = Arc::new(FakeHomebridge::default());
    let router = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/accessories", get(accessories))
        .route("/api/accessories/{unique_id}", put(set_characteristic))
        .with_state(fake.clone());
    (serve(router).await, fake)
}
