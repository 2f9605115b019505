use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, now_iso, opt_str, required_str, user_role};
use crate::ipc::types::{AppState, Request};
use crate::pricing;
use crate::tickets::{
    can_transition, SALE_TUTORING, STATUS_ACTIVE, STATUS_APP_NOT_AVAILABLE, STATUS_CANCELLED,
    STATUS_COMPLETED, STATUS_INITIATED, STATUS_REFUND_PROCESSED,
};
use crate::timetable::DAY_ORDER;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use super::purchase::{commission_percent, confirm_ticket, validate_promo};

const MOBILE_PLATFORMS: &[&str] = &["android", "ios"];

fn teacher_exists(conn: &Connection, req: &Request, teacher_id: &str) -> Option<serde_json::Value> {
    match user_role(conn, teacher_id) {
        Ok(Some(role)) if role == "teacher" => None,
        Ok(Some(_)) => Some(err(&req.id, "bad_params", "user is not a teacher", None)),
        Ok(None) => Some(err(&req.id, "not_found", "teacher not found", None)),
        Err(e) => Some(err(&req.id, "db_query_failed", e.to_string(), None)),
    }
}

fn handle_availability_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let teacher_id = match required_str(req, "teacherId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Some(resp) = teacher_exists(conn, req, &teacher_id) {
        return resp;
    }
    let Some(slots) = req.params.get("slots").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "slots must be an array", None);
    };

    struct Slot {
        day: String,
        start_minute: i64,
        duration_minutes: i64,
    }
    let mut parsed: Vec<Slot> = Vec::with_capacity(slots.len());
    for (i, s) in slots.iter().enumerate() {
        let day = s
            .get("day")
            .and_then(|v| v.as_str())
            .and_then(|d| DAY_ORDER.iter().find(|x| x.eq_ignore_ascii_case(d)))
            .map(|d| d.to_string());
        let Some(day) = day else {
            return err(&req.id, "bad_params", format!("slots[{}].day is invalid", i), None);
        };
        let Some(start_minute) = s
            .get("startMinute")
            .and_then(|v| v.as_i64())
            .filter(|m| (0..1440).contains(m))
        else {
            return err(
                &req.id,
                "bad_params",
                format!("slots[{}].startMinute must be in 0..1440", i),
                None,
            );
        };
        let Some(duration_minutes) = s
            .get("durationMinutes")
            .and_then(|v| v.as_i64())
            .filter(|m| (15..=240).contains(m))
        else {
            return err(
                &req.id,
                "bad_params",
                format!("slots[{}].durationMinutes must be in 15..=240", i),
                None,
            );
        };
        if parsed
            .iter()
            .any(|p| p.day == day && p.start_minute == start_minute)
        {
            return err(
                &req.id,
                "bad_params",
                format!("slots[{}] duplicates an earlier slot", i),
                None,
            );
        }
        parsed.push(Slot {
            day,
            start_minute,
            duration_minutes,
        });
    }

    // Replace-all semantics: the teacher's weekly grid is submitted whole.
    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };
    if let Err(e) = tx.execute(
        "DELETE FROM availability_slots WHERE teacher_id = ?",
        [&teacher_id],
    ) {
        let _ = tx.rollback();
        return err(&req.id, "db_delete_failed", e.to_string(), None);
    }
    for s in &parsed {
        if let Err(e) = tx.execute(
            "INSERT INTO availability_slots(id, teacher_id, day, start_minute, duration_minutes)
             VALUES(?, ?, ?, ?, ?)",
            (
                Uuid::new_v4().to_string(),
                &teacher_id,
                &s.day,
                s.start_minute,
                s.duration_minutes,
            ),
        ) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_insert_failed",
                e.to_string(),
                Some(json!({ "table": "availability_slots" })),
            );
        }
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    ok(&req.id, json!({ "slotCount": parsed.len() }))
}

fn handle_availability_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let teacher_id = match required_str(req, "teacherId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let rows = conn
        .prepare(
            "SELECT id, day, start_minute, duration_minutes
             FROM availability_slots WHERE teacher_id = ?",
        )
        .and_then(|mut stmt| {
            stmt.query_map([&teacher_id], |r| {
                Ok(json!({
                    "id": r.get::<_, String>(0)?,
                    "day": r.get::<_, String>(1)?,
                    "startMinute": r.get::<_, i64>(2)?,
                    "durationMinutes": r.get::<_, i64>(3)?,
                }))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        });
    let mut slots = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    // Week order, then time of day.
    slots.sort_by_key(|s| {
        let day = s.get("day").and_then(|v| v.as_str()).unwrap_or("");
        let rank = DAY_ORDER.iter().position(|d| *d == day).unwrap_or(usize::MAX);
        let start = s.get("startMinute").and_then(|v| v.as_i64()).unwrap_or(0);
        (rank, start)
    });

    ok(&req.id, json!({ "slots": slots }))
}

fn handle_tutoring_book(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let teacher_id = match required_str(req, "teacherId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let platform = match required_str(req, "platform") {
        Ok(v) => v.to_ascii_lowercase(),
        Err(resp) => return resp,
    };

    match user_role(conn, &user_id) {
        Ok(Some(_)) => {}
        Ok(None) => return err(&req.id, "not_found", "user not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }
    if let Some(resp) = teacher_exists(conn, req, &teacher_id) {
        return resp;
    }

    let Some(tier_base) = req.params.get("priceTier").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing priceTier", None);
    };
    let Some(tier) = pricing::tier_for(tier_base) else {
        return err(
            &req.id,
            "bad_params",
            format!("priceTier {} is not an allowed tier", tier_base),
            None,
        );
    };

    let promo = match opt_str(req, "promoCode") {
        Some(raw) => match validate_promo(conn, &raw, &user_id) {
            Ok(code) => Some(code),
            Err(e) => return err(&req.id, e.code, e.message, None),
        },
        None => None,
    };
    let (final_amount, amount_encoded) = match promo {
        Some(_) => (tier.discounted, tier.discounted_encoded),
        None => (tier.base, tier.base_encoded),
    };

    let ticket_id = Uuid::new_v4().to_string();
    let now = now_iso();
    if let Err(e) = conn.execute(
        "INSERT INTO tickets(id, user_id, sale_type, course_id, teacher_id, status,
                             base_amount, final_amount, promo_code, commission_percent,
                             created_at, updated_at)
         VALUES(?, ?, ?, NULL, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &ticket_id,
            &user_id,
            SALE_TUTORING,
            &teacher_id,
            STATUS_INITIATED,
            tier.base,
            final_amount,
            &promo,
            commission_percent(conn),
            &now,
            &now,
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "tickets" })),
        );
    }

    if !MOBILE_PLATFORMS.contains(&platform.as_str()) {
        if let Err(e) = conn.execute(
            "UPDATE tickets SET status = ?, updated_at = ? WHERE id = ?",
            (STATUS_APP_NOT_AVAILABLE, now_iso(), &ticket_id),
        ) {
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
        return err(
            &req.id,
            "payment_app_unavailable",
            "no supported payment surface on this platform",
            Some(json!({ "ticketId": ticket_id })),
        );
    }

    let note = format!("SyllabiQ session {}", &ticket_id[..8]);
    ok(
        &req.id,
        json!({
            "ticketId": ticket_id,
            "status": STATUS_INITIATED,
            "baseAmount": tier.base,
            "finalAmount": final_amount,
            "paymentLink": pricing::payment_deep_link(amount_encoded, &note)
        }),
    )
}

fn handle_tutoring_confirm(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let ticket_id = match required_str(req, "ticketId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    confirm_ticket(conn, req, &ticket_id, SALE_TUTORING)
}

fn apply_transition(
    state: &mut AppState,
    req: &Request,
    to: &str,
    cancel_reason: Option<String>,
) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let ticket_id = match required_str(req, "ticketId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };
    let row = tx
        .query_row(
            "SELECT sale_type, status FROM tickets WHERE id = ?",
            [&ticket_id],
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
        )
        .optional();
    let (sale_type, status) = match row {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "not_found", "ticket not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if sale_type != SALE_TUTORING {
        return err(&req.id, "bad_params", "ticket is not a tutoring sale", None);
    }
    if !can_transition(&sale_type, &status, to) {
        return err(
            &req.id,
            "state_conflict",
            format!("cannot move ticket from {} to {}", status, to),
            Some(json!({ "ticketId": ticket_id, "status": status })),
        );
    }

    let result = match cancel_reason {
        Some(ref reason) => tx.execute(
            "UPDATE tickets SET status = ?, cancel_reason = ?, updated_at = ? WHERE id = ? AND status = ?",
            (to, reason, now_iso(), &ticket_id, &status),
        ),
        None => tx.execute(
            "UPDATE tickets SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
            (to, now_iso(), &ticket_id, &status),
        ),
    };
    if let Err(e) = result {
        let _ = tx.rollback();
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({ "ticketId": ticket_id, "status": to, "cancelReason": cancel_reason }),
    )
}

fn handle_tutoring_cancel(state: &mut AppState, req: &Request) -> serde_json::Value {
    let reason = match required_str(req, "reason") {
        Ok(v) => v.to_ascii_uppercase(),
        Err(resp) => return resp,
    };
    apply_transition(state, req, STATUS_CANCELLED, Some(reason))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "availability.set" => Some(handle_availability_set(state, req)),
        "availability.get" => Some(handle_availability_get(state, req)),
        "tutoring.book" => Some(handle_tutoring_book(state, req)),
        "tutoring.confirm" => Some(handle_tutoring_confirm(state, req)),
        "tutoring.activate" => Some(apply_transition(state, req, STATUS_ACTIVE, None)),
        "tutoring.complete" => Some(apply_transition(state, req, STATUS_COMPLETED, None)),
        "tutoring.cancel" => Some(handle_tutoring_cancel(state, req)),
        "tutoring.refund" => Some(apply_transition(state, req, STATUS_REFUND_PROCESSED, None)),
        _ => None,
    }
}
