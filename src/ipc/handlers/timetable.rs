use crate::catalog;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use crate::timetable::{self, TopicRef};
use serde_json::json;
use std::collections::HashSet;

fn string_array(req: &Request, key: &str) -> Option<Vec<String>> {
    let arr = req.params.get(key)?.as_array()?;
    let mut out = Vec::with_capacity(arr.len());
    for v in arr {
        out.push(v.as_str()?.trim().to_string());
    }
    Some(out)
}

fn handle_timetable_generate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let grade = match required_str(req, "grade") {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    if !catalog::grade_exists(&grade) {
        return err(&req.id, "not_found", format!("unknown grade: {}", grade), None);
    }
    let Some(subjects) = string_array(req, "subjects") else {
        return err(&req.id, "bad_params", "subjects must be an array of strings", None);
    };
    if subjects.is_empty() {
        return err(&req.id, "bad_params", "select at least one subject", None);
    }
    let mut canonical: Vec<&'static str> = Vec::new();
    for s in &subjects {
        let Some(c) = catalog::canonical_subject(s) else {
            return err(&req.id, "not_found", format!("unknown subject: {}", s), None);
        };
        if !canonical.contains(&c) {
            canonical.push(c);
        }
    }
    let Some(raw_days) = string_array(req, "days") else {
        return err(&req.id, "bad_params", "days must be an array of strings", None);
    };
    let days = match timetable::normalize_days(&raw_days) {
        Ok(d) => d,
        Err(e) => return err(&req.id, e.code, e.message, None),
    };
    let Some(daily_hours) = req.params.get("dailyHours").and_then(|v| v.as_f64()) else {
        return err(&req.id, "bad_params", "missing dailyHours", None);
    };
    let seed = req.params.get("seed").and_then(|v| v.as_u64());

    // Study plans skip topics the student has already finished when asked to.
    let mut completed: HashSet<String> = HashSet::new();
    if let Some(user_id) = req
        .params
        .get("excludeCompletedFor")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let conn = match db_conn(state, req) {
            Ok(c) => c,
            Err(resp) => return resp,
        };
        let rows = conn
            .prepare("SELECT topic_id FROM completed_topics WHERE user_id = ?")
            .and_then(|mut stmt| {
                stmt.query_map([user_id], |r| r.get::<_, String>(0))
                    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            });
        match rows {
            Ok(ids) => completed.extend(ids),
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }

    let topics: Vec<TopicRef> = catalog::TOPICS
        .iter()
        .filter(|t| t.grade == grade && canonical.contains(&t.subject))
        .filter(|t| !completed.contains(t.id))
        .map(|t| TopicRef {
            id: t.id.to_string(),
            subject: t.subject.to_string(),
            title: t.title.to_string(),
        })
        .collect();

    match timetable::generate(topics, &days, daily_hours, seed) {
        Ok(plans) => ok(&req.id, json!({ "days": plans })),
        Err(e) => err(&req.id, e.code, e.message, None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "timetable.generate" => Some(handle_timetable_generate(state, req)),
        _ => None,
    }
}
