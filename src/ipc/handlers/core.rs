use serde_json::json;

use crate::ipc::error::ok;
use crate::ipc::types::Request;

fn handle_health(req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "version": env!("CARGO_PKG_VERSION") }))
}

pub fn try_handle(req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(req)),
        _ => None,
    }
}
