use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, opt_str};
use crate::ipc::types::{AppState, Request};
use crate::pricing;
use crate::tickets::{
    is_sale_type, session_view_status, SALE_TUTORING, STATUS_ACTIVE, STATUS_COMPLETED, STATUS_PAID,
};
use serde_json::json;
use std::collections::BTreeMap;

/// Dashboard tiles: plain status counts over the whole ticket collection.
fn handle_admin_dashboard(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let rows = conn
        .prepare("SELECT status, COUNT(*) FROM tickets GROUP BY status")
        .and_then(|mut stmt| {
            stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))
                .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        });
    let rows = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    let mut total = 0i64;
    for (status, n) in rows {
        total += n;
        counts.insert(status, n);
    }
    ok(&req.id, json!({ "total": total, "byStatus": counts }))
}

/// Payments view: commission and net payout derived per collected ticket.
fn handle_admin_payments(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let rows = conn
        .prepare(
            "SELECT t.id, t.user_id, u.display_name, t.sale_type, t.final_amount,
                    t.commission_percent, t.promo_code, t.created_at
             FROM tickets t
             JOIN users u ON u.id = t.user_id
             WHERE t.status IN (?, ?, ?)
             ORDER BY t.created_at DESC",
        )
        .and_then(|mut stmt| {
            stmt.query_map([STATUS_PAID, STATUS_ACTIVE, STATUS_COMPLETED], |r| {
                let amount: i64 = r.get(4)?;
                let pct: f64 = r.get(5)?;
                let split = pricing::payment_split(amount, pct);
                Ok(json!({
                    "ticketId": r.get::<_, String>(0)?,
                    "userId": r.get::<_, String>(1)?,
                    "userName": r.get::<_, String>(2)?,
                    "saleType": r.get::<_, String>(3)?,
                    "amount": amount,
                    "commissionPercent": pct,
                    "commission": split.commission,
                    "net": split.net,
                    "promoCode": r.get::<_, Option<String>>(6)?,
                    "createdAt": r.get::<_, String>(7)?,
                }))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        });
    let payments = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let gross: i64 = payments
        .iter()
        .filter_map(|p| p.get("amount").and_then(|v| v.as_i64()))
        .sum();
    let commission: f64 = payments
        .iter()
        .filter_map(|p| p.get("commission").and_then(|v| v.as_f64()))
        .sum();
    ok(
        &req.id,
        json!({
            "payments": payments,
            "totals": {
                "gross": gross,
                "commission": commission,
                "net": (gross as f64) - commission
            }
        }),
    )
}

/// Sessions view: tutoring tickets with their status remapped for the admin
/// screen (ACTIVE shows as ONGOING, NO_SHOW cancellations get their own label).
fn handle_admin_sessions(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let rows = conn
        .prepare(
            "SELECT t.id, t.user_id, u.display_name, t.teacher_id, t.status,
                    t.cancel_reason, t.final_amount, t.created_at
             FROM tickets t
             JOIN users u ON u.id = t.user_id
             WHERE t.sale_type = ?
             ORDER BY t.created_at DESC",
        )
        .and_then(|mut stmt| {
            stmt.query_map([SALE_TUTORING], |r| {
                let status: String = r.get(4)?;
                let reason: Option<String> = r.get(5)?;
                Ok(json!({
                    "ticketId": r.get::<_, String>(0)?,
                    "studentId": r.get::<_, String>(1)?,
                    "studentName": r.get::<_, String>(2)?,
                    "teacherId": r.get::<_, Option<String>>(3)?,
                    "sessionStatus": session_view_status(&status, reason.as_deref()),
                    "ticketStatus": status,
                    "cancelReason": reason,
                    "amount": r.get::<_, i64>(6)?,
                    "createdAt": r.get::<_, String>(7)?,
                }))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        });
    match rows {
        Ok(sessions) => ok(&req.id, json!({ "sessions": sessions })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_admin_tickets(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let status = opt_str(req, "status").map(|s| s.to_ascii_uppercase());
    let sale_type = opt_str(req, "saleType").map(|s| s.to_ascii_lowercase());
    if let Some(ref st) = sale_type {
        if !is_sale_type(st) {
            return err(&req.id, "bad_params", format!("unknown saleType: {}", st), None);
        }
    }
    let search = opt_str(req, "search");

    let mut sql = String::from(
        "SELECT t.id, t.user_id, u.display_name, t.sale_type, t.course_id, t.teacher_id,
                t.status, t.base_amount, t.final_amount, t.promo_code, t.created_at
         FROM tickets t
         JOIN users u ON u.id = t.user_id
         WHERE 1=1",
    );
    let mut binds: Vec<String> = Vec::new();
    if let Some(s) = status {
        sql.push_str(" AND t.status = ?");
        binds.push(s);
    }
    if let Some(st) = sale_type {
        sql.push_str(" AND t.sale_type = ?");
        binds.push(st);
    }
    if let Some(q) = search {
        sql.push_str(" AND (t.id LIKE ? OR u.display_name LIKE ?)");
        let like = format!("%{}%", q);
        binds.push(like.clone());
        binds.push(like);
    }
    sql.push_str(" ORDER BY t.created_at DESC");

    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(rusqlite::params_from_iter(binds.iter()), |r| {
            Ok(json!({
                "ticketId": r.get::<_, String>(0)?,
                "userId": r.get::<_, String>(1)?,
                "userName": r.get::<_, String>(2)?,
                "saleType": r.get::<_, String>(3)?,
                "courseId": r.get::<_, Option<String>>(4)?,
                "teacherId": r.get::<_, Option<String>>(5)?,
                "status": r.get::<_, String>(6)?,
                "baseAmount": r.get::<_, i64>(7)?,
                "finalAmount": r.get::<_, i64>(8)?,
                "promoCode": r.get::<_, Option<String>>(9)?,
                "createdAt": r.get::<_, String>(10)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    match rows {
        Ok(tickets) => ok(&req.id, json!({ "tickets": tickets })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_admin_configure_billing(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let Some(pct) = req.params.get("commissionPercent").and_then(|v| v.as_f64()) else {
        return err(&req.id, "bad_params", "missing commissionPercent", None);
    };
    if !(0.0..=100.0).contains(&pct) {
        return err(
            &req.id,
            "bad_params",
            "commissionPercent must be in 0..=100",
            None,
        );
    }
    if let Err(e) = db::settings_set_json(conn, "billing.commissionPercent", &json!(pct)) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "commissionPercent": pct }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "admin.dashboard" => Some(handle_admin_dashboard(state, req)),
        "admin.payments" => Some(handle_admin_payments(state, req)),
        "admin.sessions" => Some(handle_admin_sessions(state, req)),
        "admin.tickets" => Some(handle_admin_tickets(state, req)),
        "admin.configureBilling" => Some(handle_admin_configure_billing(state, req)),
        _ => None,
    }
}
