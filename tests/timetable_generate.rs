
use serde_json::json;
use test_support::{create_user, request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn plan_assigns_every_matching_topic_deterministically() {
    let workspace = temp_dir("syllabiq-timetable");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let params = json!({
        "grade": "10",
        "subjects": ["Mathematics", "physics", "Mathematics"],
        "days": ["wednesday", "Monday"],
        "dailyHours": 2.0,
        "seed": 42
    });
    let plan_a = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "timetable.generate",
        params.clone(),
    );
    let plan_b = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "timetable.generate",
        params,
    );
    assert_eq!(plan_a, plan_b);

    let days = plan_a["days"].as_array().expect("days");
    assert_eq!(days.len(), 2);
    // Requested out of order; the plan comes back Monday first.
    assert_eq!(days[0]["day"], json!("Monday"));
    assert_eq!(days[1]["day"], json!("Wednesday"));

    // Grade 10 has 3 math + 2 physics topics; nothing may be dropped.
    let total: usize = days
        .iter()
        .flat_map(|d| d["subjects"].as_array().expect("subjects"))
        .map(|b| b["entries"].as_array().expect("entries").len())
        .sum();
    assert_eq!(total, 5);

    // ceil(5/2) = 3 on the first day, 2 on the second.
    let per_day: Vec<usize> = days
        .iter()
        .map(|d| {
            d["subjects"]
                .as_array()
                .expect("subjects")
                .iter()
                .map(|b| b["entries"].as_array().expect("entries").len())
                .sum()
        })
        .collect();
    assert_eq!(per_day, vec![3, 2]);

    // 2 hours over 3 topics: 40 minutes each.
    for block in days[0]["subjects"].as_array().expect("subjects") {
        for e in block["entries"].as_array().expect("entries") {
            assert_eq!(e["minutes"], json!(40));
        }
    }

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn completed_topics_can_be_excluded() {
    let workspace = temp_dir("syllabiq-timetable-exclude");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let student_id = create_user(&mut stdin, &mut reader, "2", "Asha", "student", Some("11"));

    // English grade 11 has a single topic; finishing it empties the pool.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "progress.markTopic",
        json!({ "userId": student_id, "topicId": "eng-11-01" }),
    );
    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "timetable.generate",
        json!({
            "grade": "11",
            "subjects": ["English"],
            "days": ["Monday"],
            "dailyHours": 1.0,
            "excludeCompletedFor": student_id
        }),
    );
    assert_eq!(code, "no_topics");

    // Without the exclusion the same request still plans the topic.
    let plan = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "timetable.generate",
        json!({
            "grade": "11",
            "subjects": ["English"],
            "days": ["Monday"],
            "dailyHours": 1.0
        }),
    );
    assert_eq!(
        plan["days"][0]["subjects"][0]["entries"][0]["topicId"],
        json!("eng-11-01")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn bad_inputs_are_rejected() {
    let workspace = temp_dir("syllabiq-timetable-bad");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "timetable.generate",
        json!({ "grade": "10", "subjects": ["Mathematics"], "days": ["Funday"], "dailyHours": 2.0 }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "timetable.generate",
        json!({ "grade": "10", "subjects": ["Mathematics"], "days": [], "dailyHours": 2.0 }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "timetable.generate",
        json!({ "grade": "10", "subjects": ["Mathematics"], "days": ["Monday"], "dailyHours": 0.0 }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "timetable.generate",
        json!({ "grade": "13", "subjects": ["Mathematics"], "days": ["Monday"], "dailyHours": 2.0 }),
    );
    assert_eq!(code, "not_found");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "timetable.generate",
        json!({ "grade": "10", "subjects": ["Astrology"], "days": ["Monday"], "dailyHours": 2.0 }),
    );
    assert_eq!(code, "not_found");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
