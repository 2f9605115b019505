
use serde_json::json;
use test_support::{create_course, create_user, request_err, request_ok, spawn_sidecar, temp_dir};

fn course_input(previews: &[bool]) -> serde_json::Value {
    let lessons: Vec<serde_json::Value> = previews
        .iter()
        .enumerate()
        .map(|(i, p)| {
            json!({
                "title": format!("Lesson {}", i + 1),
                "contentUrl": format!("https://cdn.example.com/l{}.mp4", i + 1),
                "durationMinutes": 20,
                "isPreview": p
            })
        })
        .collect();
    json!({
        "title": "Authoring Test",
        "description": "A short course",
        "category": "physics",
        "difficulty": "Intermediate",
        "priceTier": 999,
        "modules": [{ "title": "Module One", "lessons": lessons }]
    })
}

#[test]
fn publish_requires_teacher_role() {
    let workspace = temp_dir("syllabiq-author-role");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let student_id = create_user(&mut stdin, &mut reader, "2", "Asha", "student", Some("10"));
    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "courses.create",
        json!({ "teacherId": student_id, "input": course_input(&[true, false]) }),
    );
    assert_eq!(code, "permission_denied");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "courses.create",
        json!({ "teacherId": "nobody", "input": course_input(&[true, false]) }),
    );
    assert_eq!(code, "not_found");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn validation_rejects_bad_payloads_whole() {
    let workspace = temp_dir("syllabiq-author-validate");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let teacher_id = create_user(&mut stdin, &mut reader, "2", "Mr. Rao", "teacher", None);

    // Exactly one preview lesson: zero and two both fail.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "courses.create",
        json!({ "teacherId": teacher_id, "input": course_input(&[false, false]) }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "courses.create",
        json!({ "teacherId": teacher_id, "input": course_input(&[true, true]) }),
    );
    assert_eq!(code, "bad_params");

    let mut off_tier = course_input(&[true, false]);
    off_tier["priceTier"] = json!(777);
    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "courses.create",
        json!({ "teacherId": teacher_id, "input": off_tier }),
    );
    assert_eq!(code, "bad_params");

    let mut bad_url = course_input(&[true, false]);
    bad_url["modules"][0]["lessons"][1]["contentUrl"] = json!("ftp://example.com/x");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "courses.create",
        json!({ "teacherId": teacher_id, "input": bad_url }),
    );
    assert_eq!(code, "bad_params");

    let mut bad_category = course_input(&[true, false]);
    bad_category["category"] = json!("Astrology");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "courses.create",
        json!({ "teacherId": teacher_id, "input": bad_category }),
    );
    assert_eq!(code, "bad_params");

    let mut empty_modules = course_input(&[true, false]);
    empty_modules["modules"] = json!([]);
    let code = request_err(
        &mut stdin,
        &mut reader,
        "8",
        "courses.create",
        json!({ "teacherId": teacher_id, "input": empty_modules }),
    );
    assert_eq!(code, "bad_params");

    // None of the failed attempts left partial rows behind.
    let listed = request_ok(&mut stdin, &mut reader, "9", "courses.list", json!({}));
    assert_eq!(listed["courses"].as_array().expect("courses").len(), 0);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn published_course_round_trips_with_nested_content() {
    let workspace = temp_dir("syllabiq-author-roundtrip");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let teacher_id = create_user(&mut stdin, &mut reader, "2", "Mr. Rao", "teacher", None);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "courses.create",
        json!({ "teacherId": teacher_id, "input": course_input(&[true, false, false]) }),
    );
    assert_eq!(created["moduleCount"], json!(1));
    assert_eq!(created["lessonCount"], json!(3));
    let course_id = created["courseId"].as_str().expect("courseId").to_string();

    let got = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "courses.get",
        json!({ "courseId": course_id }),
    );
    let course = &got["course"];
    // Category is stored in canonical casing; difficulty lowercased.
    assert_eq!(course["category"], json!("Physics"));
    assert_eq!(course["difficulty"], json!("intermediate"));
    let modules = course["modules"].as_array().expect("modules");
    assert_eq!(modules.len(), 1);
    let lessons = modules[0]["lessons"].as_array().expect("lessons");
    assert_eq!(lessons.len(), 3);
    assert_eq!(lessons[0]["isPreview"], json!(true));
    assert_eq!(lessons[1]["isPreview"], json!(false));
    assert_eq!(lessons[0]["sortOrder"], json!(0));
    assert_eq!(lessons[2]["sortOrder"], json!(2));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn listing_filters_by_category_and_counts_enrollments() {
    let workspace = temp_dir("syllabiq-author-list");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let teacher_id = create_user(&mut stdin, &mut reader, "2", "Mr. Rao", "teacher", None);
    let student_id = create_user(&mut stdin, &mut reader, "3", "Asha", "student", Some("10"));

    let math_course = create_course(&mut stdin, &mut reader, "4", &teacher_id, "Algebra", 499);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "courses.create",
        json!({ "teacherId": teacher_id, "input": course_input(&[true, false]) }),
    );

    let initiated = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "purchase.initiate",
        json!({ "userId": student_id, "courseId": math_course, "platform": "android" }),
    );
    let ticket_id = initiated["ticketId"].as_str().expect("ticketId");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "purchase.confirm",
        json!({ "ticketId": ticket_id }),
    );

    let all = request_ok(&mut stdin, &mut reader, "8", "courses.list", json!({}));
    assert_eq!(all["courses"].as_array().expect("courses").len(), 2);

    let math_only = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "courses.list",
        json!({ "category": "Mathematics" }),
    );
    let rows = math_only["courses"].as_array().expect("courses");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!(math_course));
    assert_eq!(rows[0]["enrolledCount"], json!(1));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
