use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, now_iso, opt_str, required_str, user_role};
use crate::ipc::types::{AppState, Request};
use crate::pricing;
use crate::tickets::{
    SALE_COURSE, STATUS_APP_NOT_AVAILABLE, STATUS_INITIATED, STATUS_PAID,
};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

const MOBILE_PLATFORMS: &[&str] = &["android", "ios"];

pub struct PromoError {
    pub code: &'static str,
    pub message: String,
}

/// A promo is usable when it exists, is active, and this user has never
/// redeemed it. Pure read; nothing is persisted until initiate/confirm.
pub fn validate_promo(
    conn: &Connection,
    raw_code: &str,
    user_id: &str,
) -> Result<String, PromoError> {
    let code = raw_code.trim().to_ascii_uppercase();
    let active: Option<bool> = conn
        .query_row(
            "SELECT is_active FROM promo_codes WHERE code = ?",
            [&code],
            |r| Ok(r.get::<_, i64>(0)? != 0),
        )
        .optional()
        .map_err(|e| PromoError {
            code: "db_query_failed",
            message: e.to_string(),
        })?;
    match active {
        None => {
            return Err(PromoError {
                code: "not_found",
                message: "promo code not found".to_string(),
            })
        }
        Some(false) => {
            return Err(PromoError {
                code: "promo_inactive",
                message: "promo code is no longer active".to_string(),
            })
        }
        Some(true) => {}
    }

    let used: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM promo_redemptions WHERE code = ? AND user_id = ?",
            (&code, user_id),
            |r| r.get(0),
        )
        .optional()
        .map_err(|e| PromoError {
            code: "db_query_failed",
            message: e.to_string(),
        })?;
    if used.is_some() {
        return Err(PromoError {
            code: "promo_used",
            message: "promo code already redeemed by this user".to_string(),
        });
    }
    Ok(code)
}

pub fn commission_percent(conn: &Connection) -> f64 {
    db::settings_get_json(conn, "billing.commissionPercent")
        .ok()
        .flatten()
        .and_then(|v| v.as_f64())
        .filter(|p| (0.0..=100.0).contains(p))
        .unwrap_or(pricing::DEFAULT_COMMISSION_PERCENT)
}

fn course_tier(conn: &Connection, course_id: &str) -> Result<Option<i64>, rusqlite::Error> {
    conn.query_row(
        "SELECT price_tier FROM courses WHERE id = ?",
        [course_id],
        |r| r.get(0),
    )
    .optional()
}

fn is_enrolled(conn: &Connection, user_id: &str, course_id: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT 1 FROM enrollments WHERE user_id = ? AND course_id = ?",
        (user_id, course_id),
        |r| r.get::<_, i64>(0),
    )
    .optional()
    .map(|v| v.is_some())
}

fn handle_purchase_quote(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let course_id = match required_str(req, "courseId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let tier_base = match course_tier(conn, &course_id) {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "not_found", "course not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some(tier) = pricing::tier_for(tier_base) else {
        return err(&req.id, "state_conflict", "course has an unknown price tier", None);
    };

    // Re-quoting with a code recomputes; omitting it resets to base.
    let (final_amount, applied) = match opt_str(req, "promoCode") {
        Some(raw) => match validate_promo(conn, &raw, &user_id) {
            Ok(code) => (tier.discounted, Some(code)),
            Err(e) => return err(&req.id, e.code, e.message, None),
        },
        None => (tier.base, None),
    };

    ok(
        &req.id,
        json!({
            "baseAmount": tier.base,
            "finalAmount": final_amount,
            "discount": tier.base - final_amount,
            "appliedPromoCode": applied
        }),
    )
}

fn handle_purchase_initiate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let course_id = match required_str(req, "courseId") {
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
    let tier_base = match course_tier(conn, &course_id) {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "not_found", "course not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some(tier) = pricing::tier_for(tier_base) else {
        return err(&req.id, "state_conflict", "course has an unknown price tier", None);
    };

    match is_enrolled(conn, &user_id, &course_id) {
        Ok(false) => {}
        Ok(true) => return err(&req.id, "already_enrolled", "user already owns this course", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

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
         VALUES(?, ?, ?, ?, NULL, ?, ?, ?, ?, ?, ?, ?)",
        (
            &ticket_id,
            &user_id,
            SALE_COURSE,
            &course_id,
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

    // No payment surface on this client: park the ticket and fail the flow.
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

    let note = format!("SyllabiQ course {}", &ticket_id[..8]);
    let link = pricing::payment_deep_link(amount_encoded, &note);
    ok(
        &req.id,
        json!({
            "ticketId": ticket_id,
            "status": STATUS_INITIATED,
            "baseAmount": tier.base,
            "finalAmount": final_amount,
            "appliedPromoCode": req.params.get("promoCode").and_then(|v| v.as_str()).map(|s| s.trim().to_ascii_uppercase()),
            "paymentLink": link
        }),
    )
}

/// INITIATED -> PAID inside one transaction, plus the sale-type side effects:
/// course sales gain an enrollment row, promo redemptions are recorded. Either
/// every mutation applies or none does; a ticket that left INITIATED in the
/// meantime aborts with state_conflict, which is what defeats double-confirm
/// races.
pub fn confirm_ticket(
    conn: &Connection,
    req: &Request,
    ticket_id: &str,
    expect_sale_type: &str,
) -> serde_json::Value {
    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    let row = tx
        .query_row(
            "SELECT user_id, sale_type, course_id, status, promo_code FROM tickets WHERE id = ?",
            [ticket_id],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, Option<String>>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, Option<String>>(4)?,
                ))
            },
        )
        .optional();
    let (user_id, sale_type, course_id, status, promo_code) = match row {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "not_found", "ticket not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    if sale_type != expect_sale_type {
        return err(
            &req.id,
            "bad_params",
            format!("ticket is a {} sale", sale_type),
            None,
        );
    }
    if status != STATUS_INITIATED {
        return err(
            &req.id,
            "state_conflict",
            format!("ticket is {}, expected {}", status, STATUS_INITIATED),
            Some(json!({ "ticketId": ticket_id, "status": status })),
        );
    }

    if let Err(e) = tx.execute(
        "UPDATE tickets SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        (STATUS_PAID, now_iso(), ticket_id, STATUS_INITIATED),
    ) {
        let _ = tx.rollback();
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }

    if sale_type == SALE_COURSE {
        let Some(ref cid) = course_id else {
            let _ = tx.rollback();
            return err(&req.id, "state_conflict", "course ticket without a course id", None);
        };
        if let Err(e) = tx.execute(
            "INSERT INTO enrollments(user_id, course_id, enrolled_at) VALUES(?, ?, ?)",
            (&user_id, cid, now_iso()),
        ) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "state_conflict",
                format!("enrollment already exists: {}", e),
                None,
            );
        }
    }

    if let Some(ref code) = promo_code {
        if let Err(e) = tx.execute(
            "INSERT INTO promo_redemptions(code, user_id, ticket_id, redeemed_at) VALUES(?, ?, ?, ?)",
            (code, &user_id, ticket_id, now_iso()),
        ) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "state_conflict",
                format!("promo code already redeemed: {}", e),
                None,
            );
        }
    }

    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    log::info!("ticket {} confirmed ({})", ticket_id, sale_type);
    ok(
        &req.id,
        json!({
            "ticketId": ticket_id,
            "status": STATUS_PAID,
            "courseId": course_id,
            "appliedPromoCode": promo_code
        }),
    )
}

fn handle_purchase_confirm(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let ticket_id = match required_str(req, "ticketId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    confirm_ticket(conn, req, &ticket_id, SALE_COURSE)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "purchase.quote" => Some(handle_purchase_quote(state, req)),
        "purchase.initiate" => Some(handle_purchase_initiate(state, req)),
        "purchase.confirm" => Some(handle_purchase_confirm(state, req)),
        _ => None,
    }
}
