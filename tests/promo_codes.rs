
use serde_json::json;
use test_support::{
    create_course, create_user, request_err, request_ok, spawn_sidecar, temp_dir,
};

#[test]
fn promo_crud_and_validation() {
    let workspace = temp_dir("syllabiq-promo-crud");
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
        "promos.create",
        json!({ "code": "summer30", "percentage": 30 }),
    );
    assert_eq!(created["code"], json!("SUMMER30"));
    assert_eq!(created["isActive"], json!(true));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "promos.create",
        json!({ "code": "SUMMER30", "percentage": 10 }),
    );
    assert_eq!(code, "state_conflict");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "promos.create",
        json!({ "code": "a!", "percentage": 30 }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "promos.create",
        json!({ "code": "VALIDCODE", "percentage": 95 }),
    );
    assert_eq!(code, "bad_params");

    let toggled = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "promos.setActive",
        json!({ "code": "SUMMER30", "active": false }),
    );
    assert_eq!(toggled["isActive"], json!(false));
    let code = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "promos.setActive",
        json!({ "code": "MISSING1", "active": true }),
    );
    assert_eq!(code, "not_found");

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "promos.delete",
        json!({ "code": "SUMMER30" }),
    );
    assert_eq!(deleted["deleted"], json!(true));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn redemption_is_once_per_user_and_recorded_at_confirm() {
    let workspace = temp_dir("syllabiq-promo-redeem");
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
    let other_id = create_user(&mut stdin, &mut reader, "4", "Vikram", "student", Some("10"));
    let course_a = create_course(&mut stdin, &mut reader, "5", &teacher_id, "Algebra", 499);
    let course_b = create_course(&mut stdin, &mut reader, "6", &teacher_id, "Geometry", 499);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "promos.create",
        json!({ "code": "FIRST30", "percentage": 30 }),
    );

    let initiated = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "purchase.initiate",
        json!({
            "userId": student_id,
            "courseId": course_a,
            "platform": "android",
            "promoCode": "first30"
        }),
    );
    assert_eq!(initiated["finalAmount"], json!(349));
    let ticket_id = initiated["ticketId"].as_str().expect("ticketId").to_string();

    // Nothing is burned until the payment lands.
    let promos = request_ok(&mut stdin, &mut reader, "9", "promos.list", json!({}));
    assert_eq!(promos["promos"][0]["redeemedCount"], json!(0));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "purchase.confirm",
        json!({ "ticketId": ticket_id }),
    );
    let promos = request_ok(&mut stdin, &mut reader, "11", "promos.list", json!({}));
    assert_eq!(promos["promos"][0]["redeemedCount"], json!(1));

    // Same user, second purchase: the code is spent.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "12",
        "purchase.initiate",
        json!({
            "userId": student_id,
            "courseId": course_b,
            "platform": "android",
            "promoCode": "FIRST30"
        }),
    );
    assert_eq!(code, "promo_used");

    // A different user can still redeem it.
    let other = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "purchase.quote",
        json!({ "userId": other_id, "courseId": course_b, "promoCode": "FIRST30" }),
    );
    assert_eq!(other["finalAmount"], json!(349));

    // Redeemed codes refuse deletion.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "14",
        "promos.delete",
        json!({ "code": "FIRST30" }),
    );
    assert_eq!(code, "state_conflict");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn inactive_and_unknown_codes_are_rejected() {
    let workspace = temp_dir("syllabiq-promo-reject");
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
    let course_id = create_course(&mut stdin, &mut reader, "4", &teacher_id, "Algebra", 199);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "promos.create",
        json!({ "code": "PAUSED10", "percentage": 10 }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "promos.setActive",
        json!({ "code": "PAUSED10", "active": false }),
    );

    let code = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "purchase.quote",
        json!({ "userId": student_id, "courseId": course_id, "promoCode": "PAUSED10" }),
    );
    assert_eq!(code, "promo_inactive");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "8",
        "purchase.quote",
        json!({ "userId": student_id, "courseId": course_id, "promoCode": "NEVERWAS" }),
    );
    assert_eq!(code, "not_found");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
