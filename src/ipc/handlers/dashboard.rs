use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::cohort::{admin_overview, mentor_overview};
use crate::ipc::helpers::{as_of_or_now, parse_params, reply};
use crate::ipc::types::Request;
use crate::model::Snapshot;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MentorOpenParams {
    mentor_id: Uuid,
    #[serde(default)]
    as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    snapshot: Snapshot,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminOpenParams {
    #[serde(default)]
    as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    snapshot: Snapshot,
}

fn handle_mentor_open(req: &Request) -> serde_json::Value {
    let params: MentorOpenParams = match parse_params(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let now = as_of_or_now(params.as_of);
    let overview = mentor_overview(&params.snapshot, params.mentor_id, now);
    reply(req, &overview)
}

fn handle_admin_open(req: &Request) -> serde_json::Value {
    let params: AdminOpenParams = match parse_params(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let now = as_of_or_now(params.as_of);
    let overview = admin_overview(&params.snapshot, now);
    reply(req, &overview)
}

pub fn try_handle(req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.mentorOpen" => Some(handle_mentor_open(req)),
        "dashboard.adminOpen" => Some(handle_admin_open(req)),
        _ => None,
    }
}
