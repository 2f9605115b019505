use crate::catalog;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::opt_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_subjects(req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "subjects": catalog::SUBJECTS }))
}

fn handle_grades(req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "grades": catalog::GRADES }))
}

fn handle_topics(req: &Request) -> serde_json::Value {
    let subject = opt_str(req, "subject");
    let grade = opt_str(req, "grade");

    if let Some(ref s) = subject {
        if !catalog::subject_exists(s) {
            return err(&req.id, "not_found", format!("unknown subject: {}", s), None);
        }
    }
    if let Some(ref g) = grade {
        if !catalog::grade_exists(g) {
            return err(&req.id, "not_found", format!("unknown grade: {}", g), None);
        }
    }

    let topics = catalog::topics_filtered(subject.as_deref(), grade.as_deref());
    ok(&req.id, json!({ "topics": topics }))
}

pub fn try_handle(_state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "catalog.subjects" => Some(handle_subjects(req)),
        "catalog.grades" => Some(handle_grades(req)),
        "catalog.topics" => Some(handle_topics(req)),
        _ => None,
    }
}
