
use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn session_defaults_patches_and_resets() {
    let workspace = temp_dir("syllabiq-session");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let fresh = request_ok(&mut stdin, &mut reader, "2", "session.get", json!({}));
    assert_eq!(fresh["session"]["role"], json!(null));
    assert_eq!(fresh["session"]["onboardingComplete"], json!(false));
    assert_eq!(fresh["session"]["bookmarkedTopicIds"], json!([]));

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "session.update",
        json!({
            "patch": {
                "role": "Student",
                "onboardingComplete": true,
                "bookmarkedTopicIds": ["mat-10-01", "phy-10-02", "mat-10-01"]
            }
        }),
    );
    assert_eq!(updated["session"]["role"], json!("student"));
    assert_eq!(updated["session"]["onboardingComplete"], json!(true));
    // Duplicates collapse.
    assert_eq!(
        updated["session"]["bookmarkedTopicIds"],
        json!(["mat-10-01", "phy-10-02"])
    );

    // Partial patch leaves the other fields alone.
    let partial = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "session.update",
        json!({ "patch": { "role": null } }),
    );
    assert_eq!(partial["session"]["role"], json!(null));
    assert_eq!(partial["session"]["onboardingComplete"], json!(true));

    let reset = request_ok(&mut stdin, &mut reader, "5", "session.reset", json!({}));
    assert_eq!(reset["session"]["onboardingComplete"], json!(false));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn session_patch_validation() {
    let workspace = temp_dir("syllabiq-session-bad");
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
        "session.update",
        json!({ "patch": { "role": "wizard" } }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "session.update",
        json!({ "patch": { "bookmarkedTopicIds": ["not-a-topic"] } }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "session.update",
        json!({ "patch": { "favouriteColour": "green" } }),
    );
    assert_eq!(code, "bad_params");

    // A rejected patch must not half-apply.
    let current = request_ok(&mut stdin, &mut reader, "5", "session.get", json!({}));
    assert_eq!(current["session"]["bookmarkedTopicIds"], json!([]));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn session_survives_restart() {
    let workspace = temp_dir("syllabiq-session-restart");
    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "session.update",
            json!({ "patch": { "role": "teacher", "onboardingComplete": true } }),
        );
        drop(stdin);
        let _ = child.wait();
    }

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let restored = request_ok(&mut stdin, &mut reader, "2", "session.get", json!({}));
    assert_eq!(restored["session"]["role"], json!("teacher"));
    assert_eq!(restored["session"]["onboardingComplete"], json!(true));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
