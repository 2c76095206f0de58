// Read handlers.
// Each returns the cached entry for its source as-is; reads never touch upstream services.

use axum::Json;
use axum::extract::State;

use crate::cache::CacheEntry;
use crate::config::{KEY_FITNESS, KEY_LIGHTS, KEY_NETWORK, KEY_PIHOLE, KEY_TODOS, KEY_WEATHER};

use super::AppState;

fn cached(state: &AppState, key: &str) -> Json<CacheEntry> {
    Json(state.store.get(key))
}

pub async fn lights(State(state): State<AppState>) -> Json<CacheEntry> {
    cached(&state, KEY_LIGHTS)
}

pub async fn pihole(State(state): State<AppState>) -> Json<CacheEntry> {
    cached(&state, KEY_PIHOLE)
}

pub async fn network(State(state): State<AppState>) -> Json<CacheEntry> {
    cached(&state, KEY_NETWORK)
}

pub async fn weather(State(state): State<AppState>) -> Json<CacheEntry> {
    cached(&state, KEY_WEATHER)
}

pub async fn todos(State(state): State<AppState>) -> Json<CacheEntry> {
    cached(&state, KEY_TODOS)
}

pub async fn fitness(State(state): State<AppState>) -> Json<CacheEntry> {
    cached(&state, KEY_FITNESS)
}
