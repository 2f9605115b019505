use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, now_iso, required_str};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;

fn handle_promos_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let code = match required_str(req, "code") {
        Ok(v) => v.to_ascii_uppercase(),
        Err(resp) => return resp,
    };
    if code.len() < 3 || code.len() > 24 || !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return err(
            &req.id,
            "bad_params",
            "code must be 3..=24 alphanumeric characters",
            None,
        );
    }
    // Percentage is display copy only; the applied discount comes from the
    // per-tier table. Validated anyway so the UI never shows garbage.
    let percentage = match req.params.get("percentage").and_then(|v| v.as_i64()) {
        Some(p) if (1..=90).contains(&p) => p,
        Some(_) => return err(&req.id, "bad_params", "percentage must be in 1..=90", None),
        None => return err(&req.id, "bad_params", "missing percentage", None),
    };

    let exists: Option<i64> = match conn
        .query_row("SELECT 1 FROM promo_codes WHERE code = ?", [&code], |r| {
            r.get(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_some() {
        return err(&req.id, "state_conflict", "promo code already exists", None);
    }

    if let Err(e) = conn.execute(
        "INSERT INTO promo_codes(code, percentage, is_active, created_at) VALUES(?, ?, 1, ?)",
        (&code, percentage, now_iso()),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "promo_codes" })),
        );
    }

    ok(&req.id, json!({ "code": code, "percentage": percentage, "isActive": true }))
}

fn handle_promos_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let rows = conn
        .prepare(
            "SELECT
               p.code, p.percentage, p.is_active, p.created_at,
               (SELECT COUNT(*) FROM promo_redemptions r WHERE r.code = p.code) AS redeemed_count
             FROM promo_codes p
             ORDER BY p.created_at DESC",
        )
        .and_then(|mut stmt| {
            stmt.query_map([], |r| {
                Ok(json!({
                    "code": r.get::<_, String>(0)?,
                    "percentage": r.get::<_, i64>(1)?,
                    "isActive": r.get::<_, i64>(2)? != 0,
                    "createdAt": r.get::<_, String>(3)?,
                    "redeemedCount": r.get::<_, i64>(4)?,
                }))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        });
    match rows {
        Ok(promos) => ok(&req.id, json!({ "promos": promos })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_promos_set_active(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let code = match required_str(req, "code") {
        Ok(v) => v.to_ascii_uppercase(),
        Err(resp) => return resp,
    };
    let Some(active) = req.params.get("active").and_then(|v| v.as_bool()) else {
        return err(&req.id, "bad_params", "active must be boolean", None);
    };

    match conn.execute(
        "UPDATE promo_codes SET is_active = ? WHERE code = ?",
        (active as i64, &code),
    ) {
        Ok(0) => err(&req.id, "not_found", "promo code not found", None),
        Ok(_) => ok(&req.id, json!({ "code": code, "isActive": active })),
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

/// Destructive path; normal flow deactivates instead. Codes with recorded
/// redemptions refuse deletion to keep the payment trail intact.
fn handle_promos_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let code = match required_str(req, "code") {
        Ok(v) => v.to_ascii_uppercase(),
        Err(resp) => return resp,
    };

    let redeemed: i64 = match conn.query_row(
        "SELECT COUNT(*) FROM promo_redemptions WHERE code = ?",
        [&code],
        |r| r.get(0),
    ) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if redeemed > 0 {
        return err(
            &req.id,
            "state_conflict",
            "promo code has redemptions; deactivate it instead",
            None,
        );
    }

    match conn.execute("DELETE FROM promo_codes WHERE code = ?", [&code]) {
        Ok(0) => err(&req.id, "not_found", "promo code not found", None),
        Ok(_) => ok(&req.id, json!({ "code": code, "deleted": true })),
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "promos.create" => Some(handle_promos_create(state, req)),
        "promos.list" => Some(handle_promos_list(state, req)),
        "promos.setActive" => Some(handle_promos_set_active(state, req)),
        "promos.delete" => Some(handle_promos_delete(state, req)),
        _ => None,
    }
}
