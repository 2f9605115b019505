use crate::catalog;
use anyhow::Context;
use serde_json::{json, Value};
use std::time::Duration;

/// Substituted when the model comes back with empty output.
pub const FALLBACK_REPLY: &str =
    "Sorry, I could not come up with an answer just now. Please try again.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub endpoint: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct UserContext {
    pub role: String,
    pub display_name: String,
    pub grade: Option<String>,
    pub enrolled_course_titles: Vec<String>,
    pub completed_topic_count: i64,
}

/// Flatten platform context into the single JSON object sent alongside the
/// message: who is asking, what they study, and what the catalog offers.
pub fn build_context(user: &UserContext, message: &str) -> Value {
    json!({
        "platform": "SyllabiQ",
        "user": {
            "role": user.role,
            "displayName": user.display_name,
            "grade": user.grade,
            "enrolledCourses": user.enrolled_course_titles,
            "completedTopicCount": user.completed_topic_count,
        },
        "catalog": {
            "subjects": catalog::SUBJECTS,
            "grades": catalog::GRADES,
        },
        "message": message,
    })
}

/// One request/response completion round trip. No retries; a transport or
/// decode failure surfaces to the caller as-is.
pub fn complete(cfg: &ChatConfig, context: &Value) -> anyhow::Result<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("failed to build http client")?;
    let body = json!({
        "model": cfg.model,
        "input": context,
    });
    let resp: Value = client
        .post(&cfg.endpoint)
        .json(&body)
        .send()
        .context("completion request failed")?
        .error_for_status()
        .context("completion endpoint returned an error status")?
        .json()
        .context("completion response was not json")?;
    let text = resp
        .get("output")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    Ok(reply_or_fallback(text))
}

pub fn reply_or_fallback(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        FALLBACK_REPLY.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> UserContext {
        UserContext {
            role: "student".to_string(),
            display_name: "Asha".to_string(),
            grade: Some("10".to_string()),
            enrolled_course_titles: vec!["Algebra Crash Course".to_string()],
            completed_topic_count: 3,
        }
    }

    #[test]
    fn context_carries_role_profile_and_catalog() {
        let ctx = build_context(&sample_user(), "explain quadratic equations");
        assert_eq!(ctx["user"]["role"], "student");
        assert_eq!(ctx["user"]["grade"], "10");
        assert_eq!(ctx["message"], "explain quadratic equations");
        let subjects = ctx["catalog"]["subjects"].as_array().expect("subjects");
        assert!(subjects.iter().any(|s| s == "Mathematics"));
    }

    #[test]
    fn empty_model_output_falls_back() {
        assert_eq!(reply_or_fallback("   "), FALLBACK_REPLY);
        assert_eq!(reply_or_fallback(""), FALLBACK_REPLY);
        assert_eq!(reply_or_fallback(" hi "), "hi");
    }
}
