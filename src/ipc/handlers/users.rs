use crate::catalog;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, now_iso, opt_str, required_str, user_role};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

const ROLE_STUDENT: &str = "student";
const ROLE_TEACHER: &str = "teacher";
const ROLE_ADMIN: &str = "admin";

pub fn is_valid_role(role: &str) -> bool {
    matches!(role, ROLE_STUDENT | ROLE_TEACHER | ROLE_ADMIN)
}

fn handle_users_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let display_name = match required_str(req, "displayName") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let role = match required_str(req, "role") {
        Ok(v) => v.to_ascii_lowercase(),
        Err(resp) => return resp,
    };
    // Role is fixed per account; there is no role-change method.
    if !is_valid_role(&role) {
        return err(
            &req.id,
            "bad_params",
            "role must be one of: student, teacher, admin",
            None,
        );
    }
    let grade = opt_str(req, "grade");
    if let Some(ref g) = grade {
        if !catalog::grade_exists(g) {
            return err(&req.id, "bad_params", format!("unknown grade: {}", g), None);
        }
    }

    let user_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO users(id, display_name, role, grade, created_at) VALUES(?, ?, ?, ?, ?)",
        (&user_id, &display_name, &role, &grade, now_iso()),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "users" })),
        );
    }

    ok(
        &req.id,
        json!({ "userId": user_id, "displayName": display_name, "role": role }),
    )
}

fn handle_users_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let profile = conn
        .query_row(
            "SELECT display_name, role, grade, created_at FROM users WHERE id = ?",
            [&user_id],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, Option<String>>(2)?,
                    r.get::<_, String>(3)?,
                ))
            },
        )
        .optional();
    let (display_name, role, grade, created_at) = match profile {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "not_found", "user not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let enrolled = conn
        .prepare(
            "SELECT e.course_id, c.title, e.enrolled_at
             FROM enrollments e
             JOIN courses c ON c.id = e.course_id
             WHERE e.user_id = ?
             ORDER BY e.enrolled_at",
        )
        .and_then(|mut stmt| {
            stmt.query_map([&user_id], |r| {
                Ok(json!({
                    "courseId": r.get::<_, String>(0)?,
                    "title": r.get::<_, String>(1)?,
                    "enrolledAt": r.get::<_, String>(2)?,
                }))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        });
    let enrolled = match enrolled {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let completed = conn
        .prepare(
            "SELECT topic_id FROM completed_topics WHERE user_id = ? ORDER BY completed_at",
        )
        .and_then(|mut stmt| {
            stmt.query_map([&user_id], |r| r.get::<_, String>(0))
                .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        });
    let completed = match completed {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "userId": user_id,
            "displayName": display_name,
            "role": role,
            "grade": grade,
            "createdAt": created_at,
            "enrolledCourses": enrolled,
            "completedTopics": completed
        }),
    )
}

fn handle_progress_mark_topic(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let topic_id = match required_str(req, "topicId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    if catalog::topic_by_id(&topic_id).is_none() {
        return err(&req.id, "not_found", "topic not found in catalog", None);
    }
    match user_role(conn, &user_id) {
        Ok(Some(_)) => {}
        Ok(None) => return err(&req.id, "not_found", "user not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    // Idempotent: marking a topic done twice is a no-op.
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO completed_topics(user_id, topic_id, completed_at) VALUES(?, ?, ?)",
        (&user_id, &topic_id, now_iso()),
    );
    match inserted {
        Ok(n) => ok(
            &req.id,
            json!({ "topicId": topic_id, "alreadyCompleted": n == 0 }),
        ),
        Err(e) => err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "completed_topics" })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.create" => Some(handle_users_create(state, req)),
        "users.get" => Some(handle_users_get(state, req)),
        "progress.markTopic" => Some(handle_progress_mark_topic(state, req)),
        _ => None,
    }
}
