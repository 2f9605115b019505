use crate::catalog;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, now_iso, opt_str, required_str, user_role};
use crate::ipc::types::{AppState, Request};
use crate::pricing;
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

const DIFFICULTIES: &[&str] = &["beginner", "intermediate", "advanced"];

struct LessonInput {
    title: String,
    content_url: String,
    duration_minutes: i64,
    is_preview: bool,
}

struct ModuleInput {
    title: String,
    lessons: Vec<LessonInput>,
}

struct CourseInput {
    title: String,
    description: Option<String>,
    category: String,
    difficulty: String,
    price_tier: i64,
    modules: Vec<ModuleInput>,
}

fn valid_content_url(raw: &str) -> bool {
    (raw.starts_with("https://") || raw.starts_with("http://"))
        && raw.len() > "https://".len()
        && !raw.contains(char::is_whitespace)
}

/// Parse and validate the whole authoring payload before any write: tier in
/// the fixed set, non-empty content, exactly one preview lesson overall.
fn parse_course_input(params: &serde_json::Value) -> Result<CourseInput, String> {
    let input = params
        .get("input")
        .and_then(|v| v.as_object())
        .ok_or("input must be an object")?;

    let title = input
        .get("title")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or("missing input.title")?;
    let description = input
        .get("description")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let category = input
        .get("category")
        .and_then(|v| v.as_str())
        .and_then(catalog::canonical_subject)
        .ok_or("input.category must be a catalog subject")?
        .to_string();
    let difficulty = input
        .get("difficulty")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| DIFFICULTIES.contains(&s.as_str()))
        .ok_or("input.difficulty must be one of: beginner, intermediate, advanced")?;
    let price_tier = input
        .get("priceTier")
        .and_then(|v| v.as_i64())
        .ok_or("missing input.priceTier")?;
    if !pricing::is_valid_tier(price_tier) {
        return Err(format!("priceTier {} is not an allowed tier", price_tier));
    }

    let modules_raw = input
        .get("modules")
        .and_then(|v| v.as_array())
        .ok_or("input.modules must be an array")?;
    if modules_raw.is_empty() {
        return Err("course content must not be empty".to_string());
    }

    let mut preview_count = 0usize;
    let mut modules = Vec::with_capacity(modules_raw.len());
    for (mi, m) in modules_raw.iter().enumerate() {
        let m = m
            .as_object()
            .ok_or_else(|| format!("modules[{}] must be an object", mi))?;
        let m_title = m
            .get("title")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("modules[{}].title is required", mi))?;
        let lessons_raw = m
            .get("lessons")
            .and_then(|v| v.as_array())
            .ok_or_else(|| format!("modules[{}].lessons must be an array", mi))?;
        if lessons_raw.is_empty() {
            return Err(format!("modules[{}] must contain at least one lesson", mi));
        }
        let mut lessons = Vec::with_capacity(lessons_raw.len());
        for (li, l) in lessons_raw.iter().enumerate() {
            let l = l
                .as_object()
                .ok_or_else(|| format!("modules[{}].lessons[{}] must be an object", mi, li))?;
            let l_title = l
                .get("title")
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| format!("modules[{}].lessons[{}].title is required", mi, li))?;
            let content_url = l
                .get("contentUrl")
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .ok_or_else(|| format!("modules[{}].lessons[{}].contentUrl is required", mi, li))?;
            if !valid_content_url(&content_url) {
                return Err(format!(
                    "modules[{}].lessons[{}].contentUrl is malformed",
                    mi, li
                ));
            }
            let duration_minutes = l
                .get("durationMinutes")
                .and_then(|v| v.as_i64())
                .filter(|v| (1..=600).contains(v))
                .ok_or_else(|| {
                    format!(
                        "modules[{}].lessons[{}].durationMinutes must be in 1..=600",
                        mi, li
                    )
                })?;
            let is_preview = match l.get("isPreview") {
                None => false,
                Some(v) if v.is_null() => false,
                Some(v) => v
                    .as_bool()
                    .ok_or_else(|| format!("modules[{}].lessons[{}].isPreview must be boolean", mi, li))?,
            };
            if is_preview {
                preview_count += 1;
            }
            lessons.push(LessonInput {
                title: l_title,
                content_url,
                duration_minutes,
                is_preview,
            });
        }
        modules.push(ModuleInput {
            title: m_title,
            lessons,
        });
    }

    if preview_count != 1 {
        return Err(format!(
            "exactly one lesson must be marked preview, found {}",
            preview_count
        ));
    }

    Ok(CourseInput {
        title,
        description,
        category,
        difficulty,
        price_tier,
        modules,
    })
}

fn handle_courses_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let teacher_id = match required_str(req, "teacherId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match user_role(conn, &teacher_id) {
        Ok(Some(role)) if role == "teacher" || role == "admin" => {}
        Ok(Some(_)) => {
            return err(&req.id, "permission_denied", "only teachers publish courses", None)
        }
        Ok(None) => return err(&req.id, "not_found", "teacher not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    let input = match parse_course_input(&req.params) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    // Course, modules and lessons land in one transaction: a failure anywhere
    // leaves no orphaned parent row.
    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    let course_id = Uuid::new_v4().to_string();
    let created_at = now_iso();
    if let Err(e) = tx.execute(
        "INSERT INTO courses(id, teacher_id, title, description, category, difficulty, price_tier, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &course_id,
            &teacher_id,
            &input.title,
            &input.description,
            &input.category,
            &input.difficulty,
            input.price_tier,
            &created_at,
        ),
    ) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "courses" })),
        );
    }

    let mut module_count = 0i64;
    let mut lesson_count = 0i64;
    for (mi, module) in input.modules.iter().enumerate() {
        let module_id = Uuid::new_v4().to_string();
        if let Err(e) = tx.execute(
            "INSERT INTO course_modules(id, course_id, title, sort_order) VALUES(?, ?, ?, ?)",
            (&module_id, &course_id, &module.title, mi as i64),
        ) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_insert_failed",
                e.to_string(),
                Some(json!({ "table": "course_modules" })),
            );
        }
        module_count += 1;
        for (li, lesson) in module.lessons.iter().enumerate() {
            let lesson_id = Uuid::new_v4().to_string();
            if let Err(e) = tx.execute(
                "INSERT INTO lessons(id, module_id, title, sort_order, content_url, duration_minutes, is_preview)
                 VALUES(?, ?, ?, ?, ?, ?, ?)",
                (
                    &lesson_id,
                    &module_id,
                    &lesson.title,
                    li as i64,
                    &lesson.content_url,
                    lesson.duration_minutes,
                    lesson.is_preview as i64,
                ),
            ) {
                let _ = tx.rollback();
                return err(
                    &req.id,
                    "db_insert_failed",
                    e.to_string(),
                    Some(json!({ "table": "lessons" })),
                );
            }
            lesson_count += 1;
        }
    }

    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({
            "courseId": course_id,
            "moduleCount": module_count,
            "lessonCount": lesson_count
        }),
    )
}

fn handle_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let category = opt_str(req, "category");
    let teacher_id = opt_str(req, "teacherId");

    let mut sql = String::from(
        "SELECT
           c.id, c.teacher_id, c.title, c.category, c.difficulty, c.price_tier, c.created_at,
           (SELECT COUNT(*) FROM enrollments e WHERE e.course_id = c.id) AS enrolled_count
         FROM courses c
         WHERE 1=1",
    );
    let mut binds: Vec<String> = Vec::new();
    if let Some(cat) = category {
        sql.push_str(" AND c.category = ?");
        binds.push(cat);
    }
    if let Some(tid) = teacher_id {
        sql.push_str(" AND c.teacher_id = ?");
        binds.push(tid);
    }
    sql.push_str(" ORDER BY c.created_at DESC");

    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(rusqlite::params_from_iter(binds.iter()), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "teacherId": r.get::<_, String>(1)?,
                "title": r.get::<_, String>(2)?,
                "category": r.get::<_, String>(3)?,
                "difficulty": r.get::<_, String>(4)?,
                "priceTier": r.get::<_, i64>(5)?,
                "createdAt": r.get::<_, String>(6)?,
                "enrolledCount": r.get::<_, i64>(7)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(courses) => ok(&req.id, json!({ "courses": courses })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_courses_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let course_id = match required_str(req, "courseId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let head = conn
        .query_row(
            "SELECT teacher_id, title, description, category, difficulty, price_tier, created_at
             FROM courses WHERE id = ?",
            [&course_id],
            |r| {
                Ok(json!({
                    "id": course_id,
                    "teacherId": r.get::<_, String>(0)?,
                    "title": r.get::<_, String>(1)?,
                    "description": r.get::<_, Option<String>>(2)?,
                    "category": r.get::<_, String>(3)?,
                    "difficulty": r.get::<_, String>(4)?,
                    "priceTier": r.get::<_, i64>(5)?,
                    "createdAt": r.get::<_, String>(6)?,
                }))
            },
        )
        .optional();
    let mut course = match head {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "not_found", "course not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let modules = conn
        .prepare(
            "SELECT id, title, sort_order FROM course_modules
             WHERE course_id = ? ORDER BY sort_order",
        )
        .and_then(|mut stmt| {
            stmt.query_map([&course_id], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, i64>(2)?,
                ))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        });
    let modules = match modules {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut modules_out = Vec::with_capacity(modules.len());
    for (module_id, title, sort_order) in modules {
        let lessons = conn
            .prepare(
                "SELECT id, title, sort_order, content_url, duration_minutes, is_preview
                 FROM lessons WHERE module_id = ? ORDER BY sort_order",
            )
            .and_then(|mut stmt| {
                stmt.query_map([&module_id], |r| {
                    Ok(json!({
                        "id": r.get::<_, String>(0)?,
                        "title": r.get::<_, String>(1)?,
                        "sortOrder": r.get::<_, i64>(2)?,
                        "contentUrl": r.get::<_, String>(3)?,
                        "durationMinutes": r.get::<_, i64>(4)?,
                        "isPreview": r.get::<_, i64>(5)? != 0,
                    }))
                })
                .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            });
        let lessons = match lessons {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        modules_out.push(json!({
            "id": module_id,
            "title": title,
            "sortOrder": sort_order,
            "lessons": lessons
        }));
    }

    course["modules"] = json!(modules_out);
    ok(&req.id, json!({ "course": course }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.create" => Some(handle_courses_create(state, req)),
        "courses.list" => Some(handle_courses_list(state, req)),
        "courses.get" => Some(handle_courses_get(state, req)),
        _ => None,
    }
}
