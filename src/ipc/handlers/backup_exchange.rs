use crate::backup;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_export_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match required_str(req, "outPath") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match backup::export_workspace_bundle(&workspace, &PathBuf::from(&out_path)) {
        Ok(summary) => {
            log::info!("exported workspace bundle to {}", out_path);
            ok(
                &req.id,
                json!({
                    "outPath": out_path,
                    "bundleFormat": summary.bundle_format,
                    "assetCount": summary.asset_count
                }),
            )
        }
        Err(e) => err(&req.id, "export_failed", format!("{:#}", e), None),
    }
}

fn handle_import_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match required_str(req, "inPath") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    // Drop the open handle before the bundle replaces the database file.
    state.db = None;
    let summary = match backup::import_workspace_bundle(&PathBuf::from(&in_path), &workspace) {
        Ok(s) => s,
        Err(e) => {
            // Reopen whatever is on disk so the sidecar stays usable.
            state.db = db::open_db(&workspace).ok();
            return err(&req.id, "import_failed", format!("{:#}", e), None);
        }
    };
    match db::open_db(&workspace) {
        Ok(conn) => state.db = Some(conn),
        Err(e) => return err(&req.id, "db_open_failed", format!("{:#}", e), None),
    }
    log::info!("imported workspace bundle from {}", in_path);
    ok(
        &req.id,
        json!({
            "bundleFormatDetected": summary.bundle_format_detected,
            "assetCount": summary.asset_count
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_export_workspace_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_import_workspace_bundle(state, req)),
        _ => None,
    }
}
