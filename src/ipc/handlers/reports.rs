use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::ipc::error::ok;
use crate::ipc::helpers::{as_of_or_now, parse_params};
use crate::ipc::types::Request;
use crate::model::Snapshot;
use crate::report::at_risk_markdown;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AtRiskParams {
    #[serde(default)]
    as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    snapshot: Snapshot,
}

fn handle_at_risk(req: &Request) -> serde_json::Value {
    let params: AtRiskParams = match parse_params(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let now = as_of_or_now(params.as_of);
    let markdown = at_risk_markdown(&params.snapshot, now);
    ok(&req.id, json!({ "markdown": markdown }))
}

pub fn try_handle(req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.atRisk" => Some(handle_at_risk(req)),
        _ => None,
    }
}
