use crate::chat::{self, ChatConfig, UserContext};
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

const CHAT_SETTINGS_KEY: &str = "chat.config";

fn handle_chat_configure(state: &mut AppState, req: &Request) -> serde_json::Value {
    let endpoint = match required_str(req, "endpoint") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let model = match required_str(req, "model") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return err(&req.id, "bad_params", "endpoint must be an http(s) url", None);
    }
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let value = json!({ "endpoint": endpoint, "model": model });
    if let Err(e) = db::settings_set_json(conn, CHAT_SETTINGS_KEY, &value) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "endpoint": endpoint, "model": model }))
}

fn load_config(conn: &rusqlite::Connection) -> Option<ChatConfig> {
    let value = db::settings_get_json(conn, CHAT_SETTINGS_KEY).ok()??;
    let endpoint = value.get("endpoint")?.as_str()?.to_string();
    let model = value.get("model")?.as_str()?.to_string();
    Some(ChatConfig { endpoint, model })
}

fn load_user_context(
    conn: &rusqlite::Connection,
    user_id: &str,
) -> rusqlite::Result<Option<UserContext>> {
    let profile = conn
        .query_row(
            "SELECT role, display_name, grade FROM users WHERE id = ?",
            [user_id],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    let Some((role, display_name, grade)) = profile else {
        return Ok(None);
    };

    let enrolled_course_titles = conn
        .prepare(
            "SELECT c.title FROM enrollments e
             JOIN courses c ON c.id = e.course_id
             WHERE e.user_id = ? ORDER BY e.enrolled_at",
        )?
        .query_map([user_id], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    let completed_topic_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM completed_topics WHERE user_id = ?",
        [user_id],
        |r| r.get(0),
    )?;

    Ok(Some(UserContext {
        role,
        display_name,
        grade,
        enrolled_course_titles,
        completed_topic_count,
    }))
}

fn handle_chat_send(state: &mut AppState, req: &Request) -> serde_json::Value {
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let message = match required_str(req, "message") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let Some(cfg) = load_config(conn) else {
        return err(
            &req.id,
            "chat_not_configured",
            "no chat endpoint configured",
            None,
        );
    };
    let user = match load_user_context(conn, &user_id) {
        Ok(Some(u)) => u,
        Ok(None) => return err(&req.id, "not_found", "user not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let context = chat::build_context(&user, &message);
    match chat::complete(&cfg, &context) {
        Ok(reply) => ok(&req.id, json!({ "reply": reply })),
        Err(e) => {
            log::warn!("chat completion failed: {:#}", e);
            err(&req.id, "chat_failed", e.to_string(), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "chat.configure" => Some(handle_chat_configure(state, req)),
        "chat.send" => Some(handle_chat_send(state, req)),
        _ => None,
    }
}
