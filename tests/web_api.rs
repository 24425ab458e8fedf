//! Web API integration tests.
//!
//! Exercises the full HTTP surface against a temporary storage root.

use axum::http::header::AUTHORIZATION;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::{Arc, RwLock};
use tempfile::TempDir;

use tempstore::file::FileHost;
use tempstore::web::handlers::AppState;
use tempstore::web::middleware::AdminSessions;
use tempstore::web::router::{create_health_router, create_router};
use tempstore::Config;

/// Create a test server backed by a fresh storage root.
fn create_test_server(dir: &TempDir) -> TestServer {
    let config = Config {
        upload_dir: dir.path().to_string_lossy().into_owned(),
        admin_password: "test-password".to_string(),
        ..Default::default()
    };

    let sessions = Arc::new(AdminSessions::new(config.session_timeout));
    let config = Arc::new(RwLock::new(config));
    let host = Arc::new(FileHost::new(config.clone()).expect("Failed to open storage root"));

    let app_state = Arc::new(AppState {
        host,
        config,
        sessions,
    });

    let router = create_router(app_state).merge(create_health_router());
    TestServer::new(router).expect("Failed to create test server")
}

/// Upload one file and return its file_id.
async fn upload_one(server: &TestServer, name: &str, data: &[u8]) -> String {
    let form = MultipartForm::new().add_part(
        "files",
        Part::bytes(data.to_vec()).file_name(name.to_string()),
    );
    let response = server.post("/api/upload").multipart(form).await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["data"][0]["success"], json!(true));
    body["data"][0]["file"]["file_id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Log in as admin and return the bearer token.
async fn admin_login(server: &TestServer) -> String {
    let response = server
        .post("/api/admin/login")
        .json(&json!({ "password": "test-password" }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["data"]["token"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_health_check() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn test_upload_list_download() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let file_id = upload_one(&server, "hello.txt", b"hello world").await;
    assert_eq!(file_id.len(), 8);

    // Listed
    let response = server.get("/api/files").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["meta"]["total"], json!(1));
    assert_eq!(body["data"][0]["original_name"], json!("hello.txt"));
    assert_eq!(body["data"][0]["file_size"], json!(11));
    assert_eq!(body["data"][0]["file_type"], json!("text/plain"));

    // Downloadable
    let response = server.get(&format!("/api/download/{file_id}")).await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), b"hello world");
    let disposition = response.header("content-disposition");
    assert!(disposition.to_str().unwrap().contains("hello.txt"));

    // Download counted
    let response = server.get("/api/files").await;
    let body = response.json::<Value>();
    assert_eq!(body["data"][0]["download_count"], json!(1));
}

#[tokio::test]
async fn test_upload_batch_reports_per_file_outcomes() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let form = MultipartForm::new()
        .add_part("files", Part::bytes(b"ok".to_vec()).file_name("ok.txt"))
        .add_part("files", Part::bytes(Vec::new()).file_name("empty.txt"));
    let response = server.post("/api/upload").multipart(form).await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["data"][0]["success"], json!(true));
    assert_eq!(body["data"][1]["success"], json!(false));
    assert!(body["data"][1]["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_upload_without_files_is_rejected() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let form = MultipartForm::new().add_text("expire_hours", "24");
    let response = server.post("/api/upload").multipart(form).await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_blocked_extension_is_renamed() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    upload_one(&server, "tool.exe", b"MZ").await;

    let response = server.get("/api/files").await;
    let body = response.json::<Value>();
    assert_eq!(body["data"][0]["original_name"], json!("tool.txt"));
}

#[tokio::test]
async fn test_download_unknown_id() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let response = server.get("/api/download/deadbeef").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_preview_text_file() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let text_id = upload_one(&server, "note.txt", b"line one").await;
    let response = server.get(&format!("/api/preview/{text_id}")).await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["content"], json!("line one"));

    // Binary content is refused
    let bin_id = upload_one(&server, "blob.bin", &[0u8, 1, 2, 255]).await;
    let response = server.get(&format!("/api/preview/{bin_id}")).await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_chunked_upload_flow() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    // Init
    let response = server
        .post("/api/upload/init")
        .json(&json!({
            "filename": "big.bin",
            "file_size": 2500,
            "chunk_size": 1000
        }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    let upload_id = body["data"]["upload_id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["total_chunks"], json!(3));

    // Send chunks out of order
    for (index, size) in [(2u32, 500usize), (0, 1000), (1, 1000)] {
        let form = MultipartForm::new()
            .add_text("upload_id", upload_id.clone())
            .add_text("chunk_index", index.to_string())
            .add_part(
                "chunk",
                Part::bytes(vec![index as u8 + 1; size]).file_name("chunk"),
            );
        let response = server.post("/api/upload/chunk").multipart(form).await;
        response.assert_status_ok();
    }

    // Status shows completion
    let response = server.get(&format!("/api/upload/status/{upload_id}")).await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["complete"], json!(true));
    assert_eq!(body["data"]["progress"], json!(100));

    // Complete and download
    let response = server
        .post("/api/upload/complete")
        .json(&json!({ "upload_id": upload_id }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["file_size"], json!(2500));
    let file_id = body["data"]["file_id"].as_str().unwrap();

    let response = server.get(&format!("/api/download/{file_id}")).await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().len(), 2500);
}

#[tokio::test]
async fn test_chunked_complete_reports_missing_chunks() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let response = server
        .post("/api/upload/init")
        .json(&json!({
            "filename": "partial.bin",
            "file_size": 2500,
            "chunk_size": 1000
        }))
        .await;
    let upload_id = response.json::<Value>()["data"]["upload_id"]
        .as_str()
        .unwrap()
        .to_string();

    let form = MultipartForm::new()
        .add_text("upload_id", upload_id.clone())
        .add_text("chunk_index", "1")
        .add_part("chunk", Part::bytes(vec![0u8; 1000]).file_name("chunk"));
    server
        .post("/api/upload/chunk")
        .multipart(form)
        .await
        .assert_status_ok();

    let response = server
        .post("/api/upload/complete")
        .json(&json!({ "upload_id": upload_id }))
        .await;
    response.assert_status_bad_request();
    let body = response.json::<Value>();
    assert_eq!(
        body["error"]["details"]["missing_chunks"],
        json!([0, 2])
    );
}

#[tokio::test]
async fn test_chunked_init_resumes_existing_session() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let init = json!({
        "filename": "resume.bin",
        "file_size": 2000,
        "chunk_size": 1000
    });
    let first = server.post("/api/upload/init").json(&init).await;
    let first_id = first.json::<Value>()["data"]["upload_id"]
        .as_str()
        .unwrap()
        .to_string();

    let form = MultipartForm::new()
        .add_text("upload_id", first_id.clone())
        .add_text("chunk_index", "0")
        .add_part("chunk", Part::bytes(vec![7u8; 1000]).file_name("chunk"));
    server
        .post("/api/upload/chunk")
        .multipart(form)
        .await
        .assert_status_ok();

    // Same filename and size resumes under the same session
    let second = server.post("/api/upload/init").json(&init).await;
    let body = second.json::<Value>();
    assert_eq!(body["data"]["upload_id"], json!(first_id));
    assert_eq!(body["data"]["uploaded_chunks"], json!([0]));
}

#[tokio::test]
async fn test_stats() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    upload_one(&server, "a.txt", b"aaaa").await;
    let file_id = upload_one(&server, "b.txt", b"bb").await;
    server
        .get(&format!("/api/download/{file_id}"))
        .await
        .assert_status_ok();

    let response = server.get("/api/stats").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["total_uploads"], json!(2));
    assert_eq!(body["data"]["active_files"], json!(2));
    assert_eq!(body["data"]["today_uploads"], json!(2));
    assert_eq!(body["data"]["total_downloads"], json!(1));
    assert_eq!(body["data"]["storage_used"], json!(6));
}

#[tokio::test]
async fn test_admin_login_rejects_wrong_password() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let response = server
        .post("/api/admin/login")
        .json(&json!({ "password": "wrong" }))
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let response = server
        .post("/api/admin/delete")
        .json(&json!({ "file_ids": ["deadbeef"] }))
        .await;
    response.assert_status_unauthorized();

    let response = server.post("/api/admin/clear-all").await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_admin_delete_and_logout() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let file_id = upload_one(&server, "victim.txt", b"bytes").await;
    let token = admin_login(&server).await;

    let response = server
        .post("/api/admin/delete")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "file_ids": [file_id.clone(), "unknown0".to_string()] }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["deleted"], json!([file_id.clone()]));
    assert_eq!(body["data"]["missing"], json!(["unknown0"]));

    server
        .get(&format!("/api/download/{file_id}"))
        .await
        .assert_status_not_found();

    // Logout revokes the token
    server
        .post("/api/admin/logout")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .assert_status_ok();
    server
        .post("/api/admin/clear-all")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn test_admin_clear_all() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    upload_one(&server, "a.txt", b"a").await;
    upload_one(&server, "b.txt", b"bb").await;
    let token = admin_login(&server).await;

    let response = server
        .post("/api/admin/clear-all")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["removed"], json!(2));

    let response = server.get("/api/files").await;
    assert_eq!(response.json::<Value>()["meta"]["total"], json!(0));
}

#[tokio::test]
async fn test_config_get_and_anonymous_update_clamps() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let response = server.get("/api/config").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["file_expire_hours"], json!(24));

    // Anonymous callers cannot go below the 5 hour floor
    let response = server
        .post("/api/config")
        .json(&json!({ "file_expire_hours": 1 }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["file_expire_hours"], json!(5));
}

#[tokio::test]
async fn test_config_admin_update_uses_admin_floor() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);
    let token = admin_login(&server).await;

    let response = server
        .post("/api/config")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "file_expire_hours": 1 }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["file_expire_hours"], json!(1));

    // Storage ceiling is clamped into its range
    let response = server
        .post("/api/config")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "max_storage": 1 }))
        .await;
    let body = response.json::<Value>();
    assert_eq!(body["data"]["max_storage"], json!(1024u64 * 1024 * 1024));
}

#[tokio::test]
async fn test_list_search_and_sort() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    upload_one(&server, "alpha.txt", b"aaaa").await;
    upload_one(&server, "beta.txt", b"bb").await;

    let response = server.get("/api/files?search=alp").await;
    let body = response.json::<Value>();
    assert_eq!(body["meta"]["total"], json!(1));
    assert_eq!(body["data"][0]["original_name"], json!("alpha.txt"));

    let response = server.get("/api/files?sort=size").await;
    let body = response.json::<Value>();
    assert_eq!(body["data"][0]["original_name"], json!("alpha.txt"));
    assert_eq!(body["data"][1]["original_name"], json!("beta.txt"));
}
