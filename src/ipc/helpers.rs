use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{err, ok};
use super::types::Request;

/// Deserializes `params` into a handler's typed shape, mapping every
/// failure into a `bad_params` reply.
pub fn parse_params<T: DeserializeOwned>(req: &Request) -> Result<T, serde_json::Value> {
    serde_json::from_value(req.params.clone())
        .map_err(|e| err(&req.id, "bad_params", e.to_string(), None))
}

/// The evaluation instant: the caller's pinned `asOf` when given, the wall
/// clock otherwise. The core itself never reads a clock, so pinning `asOf`
/// makes a whole request replayable.
pub fn as_of_or_now(as_of: Option<DateTime<Utc>>) -> DateTime<Utc> {
    as_of.unwrap_or_else(Utc::now)
}

/// Serializes a computed result into the success envelope.
pub fn reply<T: Serialize>(req: &Request, result: &T) -> serde_json::Value {
    match serde_json::to_value(result) {
        Ok(value) => ok(&req.id, value),
        Err(e) => err(&req.id, "encode_failed", e.to_string(), None),
    }
}
