//! Router-level tests against a temporary workspace.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;

use agandock_common::DashboardConfig;
use agandock_web::router::build_router;
use agandock_web::state::AppState;

const RAW: &str = "Name,SMILES,Docking score (kcal/mol),Ligand efficiency\n\
    A,CCO,-9.5,0.3\n\
    B,CCN,-3.0,0.1\n\
    C,CCC,notanumber,0.2\n";

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let exp = dir.path().join("workspace/egfr");
    std::fs::create_dir_all(&exp).unwrap();
    std::fs::write(exp.join("output.csv"), RAW).unwrap();
    std::fs::write(exp.join("receptor.pdb"), "ATOM").unwrap();
    dir
}

fn app(dir: &Path, cli: &Path) -> Router {
    let mut config = DashboardConfig::default();
    config.pipeline.workspace_root = dir.join("workspace");
    config.pipeline.cli_path = cli.to_path_buf();
    build_router(AppState::new(config))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn lists_experiments_and_renders_dashboard() {
    let dir = workspace();
    let app = app(dir.path(), Path::new("agandock"));

    let (status, body) = get(&app, "/api/experiments").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["experiments"], serde_json::json!(["egfr"]));

    let (status, html) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("/results?experiment=egfr"));
}

#[tokio::test]
async fn filtered_view_matches_documented_scenario() {
    let dir = workspace();
    let app = app(dir.path(), Path::new("agandock"));

    let (status, body) = get(&app, "/api/results/egfr/raw?lower=-10&upper=-5").await;
    assert_eq!(status, StatusCode::OK);
    let view: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(view["status"], "ready");
    assert_eq!(view["state"], "range_filtered");
    assert_eq!(view["rows"].as_array().unwrap().len(), 1);
    assert_eq!(view["rows"][0]["Name"], "A");
    assert_eq!(view["bounds"]["lower"], -10.0);
    assert_eq!(view["bounds"]["upper"], 0.0);

    let (_, body) = get(&app, "/api/results/egfr/raw").await;
    let view: Value = serde_json::from_str(&body).unwrap();
    let counts: Vec<u64> = view["histogram"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["count"].as_u64().unwrap())
        .collect();
    assert_eq!(counts, vec![1, 0, 0, 1, 0]);
    assert_eq!(view["summary"]["scored"], 2);
}

fn names(view: &Value) -> Vec<&str> {
    view["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["Name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn rows_come_back_best_first() {
    let dir = workspace();
    let exp = dir.path().join("workspace/kras");
    std::fs::create_dir_all(&exp).unwrap();
    std::fs::write(
        exp.join("output.csv"),
        "Name,SMILES,Docking score (kcal/mol),Ligand efficiency\n\
         B,CCN,-3.0,0.1\n\
         C,CCC,notanumber,0.2\n\
         A,CCO,-9.5,0.3\n",
    )
    .unwrap();
    let app = app(dir.path(), Path::new("agandock"));

    let (_, body) = get(&app, "/api/results/kras/raw").await;
    let view: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(names(&view), vec!["A", "B", "C"]);
    assert_eq!(view["sort"]["column"], "Docking score (kcal/mol)");
    assert_eq!(view["sort"]["order"], "asc");

    let (_, body) = get(&app, "/api/results/kras/raw?order=desc").await;
    let view: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(names(&view), vec!["B", "A", "C"]);

    let (_, body) = get(&app, "/api/results/kras/raw?sort=Name&order=desc").await;
    let view: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(names(&view), vec!["C", "B", "A"]);

    let (status, csv) = get(&app, "/api/results/kras/raw/export").await;
    assert_eq!(status, StatusCode::OK);
    let exported: Vec<&str> = csv.lines().skip(1).map(|l| &l[..1]).collect();
    assert_eq!(exported, vec!["A", "B", "C"]);

    let (status, _) = get(&app, "/api/results/kras/raw?sort=Nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app, "/api/results/kras/raw?order=sideways").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ungenerated_variant_is_reported_not_available() {
    let dir = workspace();
    let app = app(dir.path(), Path::new("agandock"));

    let (status, body) = get(&app, "/api/results/egfr/passed").await;
    assert_eq!(status, StatusCode::OK);
    let view: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(view["status"], "not_available");

    let (status, _) = get(&app, "/api/results/egfr/passed/export").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn export_downloads_the_filtered_subset() {
    let dir = workspace();
    let app = app(dir.path(), Path::new("agandock"));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/results/egfr/raw/export?lower=-10&upper=-5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("egfr_docking_results.csv"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        String::from_utf8(bytes.to_vec()).unwrap(),
        "Name,SMILES,Docking score (kcal/mol),Ligand efficiency\nA,CCO,-9.5,0.3\n"
    );
}

#[tokio::test]
async fn bad_input_is_rejected() {
    let dir = workspace();
    let app = app(dir.path(), Path::new("agandock"));

    let (status, _) = get(&app, "/api/results/bad%20name/raw").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/api/results/egfr/raw?lower=-1&upper=-8").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/api/results/egfr/sdf").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/api/file?path=../secret.txt").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(
        &app,
        "/api/plip",
        serde_json::json!({ "folder_name": "egfr", "lower_range": -9.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("lower_range"));
}

#[tokio::test]
async fn workspace_queries() {
    let dir = workspace();
    let app = app(dir.path(), Path::new("agandock"));

    let (_, body) = get(&app, "/api/check-pdb/egfr").await;
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["exists"], true);

    let (_, body) = get(&app, "/api/check-pb/egfr").await;
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["exists"], false);

    let (status, body) = get(&app, "/api/file?path=egfr/receptor.pdb").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ATOM");

    let (status, _) = get(&app, "/api/plip/egfr/tables").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[cfg(unix)]
mod pipeline {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn fake_cli(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("agandock");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn successful_filter_refreshes_cached_variants() {
        let dir = workspace();
        let cli = fake_cli(
            dir.path(),
            "printf 'Name,SMILES,Docking score (kcal/mol),Ligand efficiency\\nA,CCO,-9.5,0.3\\n' > \"$2/output_with_pb.csv\"",
        );
        let app = app(dir.path(), &cli);

        let (_, body) = get(&app, "/api/results/egfr/passed").await;
        assert!(body.contains("not_available"));

        let (status, outcome) = post_json(
            &app,
            "/api/filter",
            serde_json::json!({ "folder_name": "egfr", "lower_range": -10.0, "higher_range": 0.0 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(outcome["command"].as_str().unwrap().contains("run_filter"));

        let (_, body) = get(&app, "/api/results/egfr/passed").await;
        let view: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(view["status"], "ready");
        assert_eq!(view["rows"].as_array().unwrap().len(), 1);

        // Every pose passed, so the failed table is empty rather than missing.
        let (_, body) = get(&app, "/api/results/egfr/failed").await;
        let view: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(view["status"], "ready");
        assert_eq!(view["rows"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn failed_filter_reports_stderr_and_keeps_cache() {
        let dir = workspace();
        let cli = fake_cli(dir.path(), "echo 'PoseBusters: receptor could not be parsed' >&2\nexit 1");
        let app = app(dir.path(), &cli);

        let (_, before) = get(&app, "/api/results/egfr/raw").await;

        let (status, body) = post_json(
            &app,
            "/api/filter",
            serde_json::json!({ "folder_name": "egfr", "lower_range": -10.0, "higher_range": 0.0 }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "PoseBusters: receptor could not be parsed");

        let (_, after) = get(&app, "/api/results/egfr/raw").await;
        assert_eq!(before, after);
    }
}
