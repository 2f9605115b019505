
use serde_json::json;
use test_support::{create_user, request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn user_creation_validates_role_and_grade() {
    let workspace = temp_dir("syllabiq-users");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "users.create",
        json!({ "displayName": "Asha", "role": "Student", "grade": "10" }),
    );
    assert_eq!(created["role"], json!("student"));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "users.create",
        json!({ "displayName": "Bad", "role": "wizard" }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "users.create",
        json!({ "displayName": "Bad", "role": "student", "grade": "13" }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "users.get",
        json!({ "userId": "nobody" }),
    );
    assert_eq!(code, "not_found");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn marking_topics_is_idempotent() {
    let workspace = temp_dir("syllabiq-progress");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let student_id = create_user(&mut stdin, &mut reader, "2", "Asha", "student", Some("10"));

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "progress.markTopic",
        json!({ "userId": student_id, "topicId": "mat-10-01" }),
    );
    assert_eq!(first["alreadyCompleted"], json!(false));

    let second = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "progress.markTopic",
        json!({ "userId": student_id, "topicId": "mat-10-01" }),
    );
    assert_eq!(second["alreadyCompleted"], json!(true));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "progress.markTopic",
        json!({ "userId": student_id, "topicId": "mat-99-99" }),
    );
    assert_eq!(code, "not_found");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "progress.markTopic",
        json!({ "userId": "nobody", "topicId": "mat-10-01" }),
    );
    assert_eq!(code, "not_found");

    let profile = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "users.get",
        json!({ "userId": student_id }),
    );
    assert_eq!(profile["completedTopics"], json!(["mat-10-01"]));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn catalog_filters_and_rejects_unknowns() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    // Catalog is static reference data; no workspace needed.
    let subjects = request_ok(&mut stdin, &mut reader, "1", "catalog.subjects", json!({}));
    let list = subjects["subjects"].as_array().expect("subjects");
    assert_eq!(list.len(), 6);

    let grades = request_ok(&mut stdin, &mut reader, "2", "catalog.grades", json!({}));
    assert_eq!(grades["grades"], json!(["9", "10", "11", "12"]));

    let topics = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "catalog.topics",
        json!({ "subject": "mathematics", "grade": "9" }),
    );
    let rows = topics["topics"].as_array().expect("topics");
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|t| t["grade"] == json!("9")));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "catalog.topics",
        json!({ "subject": "Astrology" }),
    );
    assert_eq!(code, "not_found");

    drop(stdin);
    let _ = child.wait();
}
