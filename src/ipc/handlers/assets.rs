use crate::backup::hex_digest;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, now_iso, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::fs;
use std::path::Path;
use uuid::Uuid;

const MAX_UPLOAD_BYTES: u64 = 2 * 1024 * 1024;
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn handle_assets_upload(state: &mut AppState, req: &Request) -> serde_json::Value {
    let src_path = match required_str(req, "srcPath") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let src = Path::new(&src_path);
    let meta = match fs::metadata(src) {
        Ok(m) if m.is_file() => m,
        Ok(_) => return err(&req.id, "bad_params", "srcPath is not a file", None),
        Err(e) => return err(&req.id, "not_found", format!("cannot read srcPath: {}", e), None),
    };
    let ext = match extension_of(src) {
        Some(e) if ALLOWED_EXTENSIONS.contains(&e.as_str()) => e,
        _ => {
            return err(
                &req.id,
                "unsupported_media",
                format!("allowed extensions: {}", ALLOWED_EXTENSIONS.join(", ")),
                None,
            )
        }
    };
    if meta.len() > MAX_UPLOAD_BYTES {
        return err(
            &req.id,
            "upload_too_large",
            format!("file is {} bytes, limit is {}", meta.len(), MAX_UPLOAD_BYTES),
            Some(json!({ "maxBytes": MAX_UPLOAD_BYTES })),
        );
    }

    let bytes = match fs::read(src) {
        Ok(b) => b,
        Err(e) => return err(&req.id, "not_found", format!("cannot read srcPath: {}", e), None),
    };
    let sha256 = hex_digest(&bytes);
    let key = format!("{}.{}", Uuid::new_v4(), ext);
    let assets_dir = workspace.join("assets");
    if let Err(e) = fs::create_dir_all(&assets_dir) {
        return err(&req.id, "upload_failed", e.to_string(), None);
    }
    let dest = assets_dir.join(&key);
    if let Err(e) = fs::write(&dest, &bytes) {
        return err(&req.id, "upload_failed", e.to_string(), None);
    }

    let file_name = src
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&key)
        .to_string();
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let insert = conn.execute(
        "INSERT INTO assets(key, file_name, byte_len, sha256, created_at)
         VALUES(?, ?, ?, ?, ?)",
        (&key, &file_name, bytes.len() as i64, &sha256, now_iso()),
    );
    if let Err(e) = insert {
        let _ = fs::remove_file(&dest);
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({
            "key": key,
            "url": format!("assets/{}", key),
            "fileName": file_name,
            "byteLen": bytes.len(),
            "sha256": sha256
        }),
    )
}

fn handle_assets_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let rows = conn
        .prepare(
            "SELECT key, file_name, byte_len, sha256, created_at
             FROM assets ORDER BY created_at DESC",
        )
        .and_then(|mut stmt| {
            stmt.query_map([], |r| {
                Ok(json!({
                    "key": r.get::<_, String>(0)?,
                    "url": format!("assets/{}", r.get::<_, String>(0)?),
                    "fileName": r.get::<_, String>(1)?,
                    "byteLen": r.get::<_, i64>(2)?,
                    "sha256": r.get::<_, String>(3)?,
                    "createdAt": r.get::<_, String>(4)?,
                }))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        });
    match rows {
        Ok(assets) => ok(&req.id, json!({ "assets": assets })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assets.upload" => Some(handle_assets_upload(state, req)),
        "assets.list" => Some(handle_assets_list(state, req)),
        _ => None,
    }
}
