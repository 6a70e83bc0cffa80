//! WASM bindings for slot-engine.
//!
//! Exposes start-slot and end-slot computation to the booking UI via
//! `wasm-bindgen`. All complex types cross the boundary as JSON strings: the
//! location snapshot in the `LocationSnapshot` shape, and a small query object
//! naming the date, party size, optional reservation being edited and the
//! current instant.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p slot-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir pkg/ \
//!   target/wasm32-unknown-unknown/release/slot_engine_wasm.wasm
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use slot_engine::{AvailabilityRequest, LocationSnapshot, TimeSlot};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Query input
// ---------------------------------------------------------------------------

/// Query passed from JavaScript alongside the snapshot.
#[derive(Deserialize)]
struct SlotQuery {
    date: NaiveDate,
    party_size: u32,
    /// Id of a reservation in the snapshot that is being edited.
    #[serde(default)]
    editing_id: Option<String>,
    /// ISO 8601 instant; naive values are read as UTC.
    now: String,
    #[serde(default)]
    lookback_hours: Option<u32>,
    /// Chosen start slot, required for end-slot queries.
    #[serde(default)]
    start: Option<TimeSlot>,
}

/// Parse an ISO 8601 datetime string into `DateTime<Utc>`.
///
/// Accepts RFC 3339 (with offset) and naive `YYYY-MM-DDTHH:MM:SS`, which is
/// interpreted as UTC.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| format!("Invalid datetime '{}': {}", s, e))
}

fn parse_inputs(
    snapshot_json: &str,
    query_json: &str,
) -> Result<(LocationSnapshot, SlotQuery, AvailabilityRequest), String> {
    let snapshot = LocationSnapshot::from_json(snapshot_json).map_err(|e| e.to_string())?;
    let query: SlotQuery =
        serde_json::from_str(query_json).map_err(|e| format!("Invalid query JSON: {}", e))?;

    let mut request =
        AvailabilityRequest::new(query.date, query.party_size, parse_datetime(&query.now)?);
    request.lookback_hours = query.lookback_hours;
    if let Some(id) = &query.editing_id {
        let reservation = snapshot
            .find_reservation(id)
            .ok_or_else(|| format!("Reservation '{}' not found in snapshot", id))?;
        request.editing = Some(reservation.clone());
    }

    Ok((snapshot, query, request))
}

fn start_slots_json(snapshot_json: &str, query_json: &str) -> Result<String, String> {
    let (snapshot, _, request) = parse_inputs(snapshot_json, query_json)?;
    let availability =
        slot_engine::compute_start_slots(&snapshot.location, &snapshot.ledger(), &request)
            .map_err(|e| e.to_string())?;
    serde_json::to_string(&availability).map_err(|e| format!("Serialization error: {}", e))
}

fn end_slots_json(snapshot_json: &str, query_json: &str) -> Result<String, String> {
    let (snapshot, query, request) = parse_inputs(snapshot_json, query_json)?;
    let start = query
        .start
        .ok_or_else(|| "End-slot query requires 'start'".to_string())?;
    let ends = slot_engine::compute_end_slots(&snapshot.location, &snapshot.ledger(), &request, start)
        .map_err(|e| e.to_string())?;
    serde_json::to_string(&ends).map_err(|e| format!("Serialization error: {}", e))
}

fn day_schedule_json(snapshot_json: &str, date: &str) -> Result<String, String> {
    let snapshot = LocationSnapshot::from_json(snapshot_json).map_err(|e| e.to_string())?;
    let date: NaiveDate = date
        .parse()
        .map_err(|e| format!("Invalid date '{}': {}", date, e))?;
    let schedule = snapshot
        .location
        .day_schedule(date)
        .map_err(|e| e.to_string())?;
    serde_json::to_string(&schedule).map_err(|e| format!("Serialization error: {}", e))
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Compute start-slot options for a date.
///
/// `snapshot_json` is a `LocationSnapshot`; `query_json` is
/// `{date, party_size, now, editing_id?, lookback_hours?}`. Returns a JSON
/// `{date, slots: [{slot, eligible, reason?}], reason?}` object.
#[wasm_bindgen(js_name = "computeStartSlots")]
pub fn compute_start_slots(snapshot_json: &str, query_json: &str) -> Result<String, JsValue> {
    start_slots_json(snapshot_json, query_json).map_err(|e| JsValue::from_str(&e))
}

/// Compute end-slot options for the `start` named in the query.
///
/// Returns a JSON `{start, slots: [{slot, eligible}]}` object; an empty
/// `slots` array means the start has no legal duration.
#[wasm_bindgen(js_name = "computeEndSlots")]
pub fn compute_end_slots(snapshot_json: &str, query_json: &str) -> Result<String, JsValue> {
    end_slots_json(snapshot_json, query_json).map_err(|e| JsValue::from_str(&e))
}

/// Resolve the schedule in force on `date` (`YYYY-MM-DD`).
#[wasm_bindgen(js_name = "resolveDaySchedule")]
pub fn resolve_day_schedule(snapshot_json: &str, date: &str) -> Result<String, JsValue> {
    day_schedule_json(snapshot_json, date).map_err(|e| JsValue::from_str(&e))
}
