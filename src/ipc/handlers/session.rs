use crate::catalog;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::db_conn;
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Map, Value};

use super::users::is_valid_role;

/// The UI's session record: selected role, onboarding flag, bookmarked topics.
/// One settings-backed provider with explicit get/update/reset replaces the
/// scattered local-storage reads this app grew up with.
const SESSION_KEY: &str = "session.state";

fn default_session() -> Value {
    json!({
        "role": null,
        "onboardingComplete": false,
        "bookmarkedTopicIds": []
    })
}

fn merge_session_patch(current: &mut Value, patch: &Map<String, Value>) -> Result<(), String> {
    let obj = current
        .as_object_mut()
        .ok_or_else(|| "internal session record must be a JSON object".to_string())?;
    for (k, v) in patch {
        match k.as_str() {
            "role" => {
                if v.is_null() {
                    obj.insert(k.clone(), Value::Null);
                    continue;
                }
                let role = v
                    .as_str()
                    .ok_or_else(|| "role must be string or null".to_string())?
                    .to_ascii_lowercase();
                if !is_valid_role(&role) {
                    return Err("role must be one of: student, teacher, admin".to_string());
                }
                obj.insert(k.clone(), Value::String(role));
            }
            "onboardingComplete" => {
                let b = v
                    .as_bool()
                    .ok_or_else(|| "onboardingComplete must be boolean".to_string())?;
                obj.insert(k.clone(), Value::Bool(b));
            }
            "bookmarkedTopicIds" => {
                let arr = v
                    .as_array()
                    .ok_or_else(|| "bookmarkedTopicIds must be an array of topic ids".to_string())?;
                let mut ids: Vec<Value> = Vec::with_capacity(arr.len());
                for item in arr {
                    let id = item
                        .as_str()
                        .ok_or_else(|| "bookmarkedTopicIds must be an array of topic ids".to_string())?;
                    if catalog::topic_by_id(id).is_none() {
                        return Err(format!("unknown topic id: {}", id));
                    }
                    if !ids.iter().any(|x| x == id) {
                        ids.push(Value::String(id.to_string()));
                    }
                }
                obj.insert(k.clone(), Value::Array(ids));
            }
            _ => return Err(format!("unknown session field: {}", k)),
        }
    }
    Ok(())
}

fn load_session(conn: &rusqlite::Connection) -> anyhow::Result<Value> {
    let mut current = default_session();
    if let Some(saved) = db::settings_get_json(conn, SESSION_KEY)? {
        if let Some(saved_obj) = saved.as_object() {
            // Best-effort apply: a malformed historical record must not brick the UI.
            let _ = merge_session_patch(&mut current, saved_obj);
        }
    }
    Ok(current)
}

fn handle_session_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match load_session(conn) {
        Ok(v) => ok(&req.id, json!({ "session": v })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_session_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_session(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_session_patch(&mut current, patch) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, SESSION_KEY, &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "session": current }))
}

fn handle_session_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let fresh = default_session();
    if let Err(e) = db::settings_set_json(conn, SESSION_KEY, &fresh) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "session": fresh }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.get" => Some(handle_session_get(state, req)),
        "session.update" => Some(handle_session_update(state, req)),
        "session.reset" => Some(handle_session_reset(state, req)),
        _ => None,
    }
}
