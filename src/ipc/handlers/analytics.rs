use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::ipc::helpers::{as_of_or_now, parse_params, reply};
use crate::ipc::types::Request;
use crate::model::Snapshot;
use crate::progress::student_progress;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudentOpenParams {
    student_id: Uuid,
    #[serde(default)]
    as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    snapshot: Snapshot,
}

fn handle_student_open(req: &Request) -> serde_json::Value {
    let params: StudentOpenParams = match parse_params(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let now = as_of_or_now(params.as_of);
    let progress = student_progress(&params.snapshot, params.student_id, now);
    reply(req, &progress)
}

pub fn try_handle(req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.studentOpen" => Some(handle_student_open(req)),
        _ => None,
    }
}
