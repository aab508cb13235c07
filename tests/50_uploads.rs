mod common;

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};
use trainer_admin_api::auth::Role;

fn file_part(name: &str, bytes: &[u8]) -> Part {
    Part::bytes(bytes.to_vec()).file_name(name.to_string())
}

#[tokio::test]
async fn document_upload_reports_the_stored_file() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let token = server.token(3, Role::Trainer)?;

    let form = Form::new()
        .part("document", file_part("Quarterly Report.pdf", b"%PDF-1.4 test"))
        .text("filePath", "reports/q3");
    let res = server
        .client
        .post(server.url("/api/upload-doc"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["status"], true);
    assert_eq!(body["size"], 13);
    assert_eq!(body["mime_type"], "application/pdf");

    let filename = body["filename"].as_str().unwrap_or_default().to_string();
    assert!(filename.ends_with(".pdf"));
    let stored = server.upload_dir.path().join("reports/q3").join(&filename);
    assert_eq!(std::fs::read(stored)?, b"%PDF-1.4 test");

    // Served back through /view/file
    let link = STANDARD.encode(json!({"path": format!("/storage/reports/q3/{}", filename)}).to_string());
    let res = server.client.get(server.url(&format!("/view/file/{}", link))).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.bytes().await?.as_ref(), b"%PDF-1.4 test");
    Ok(())
}

#[tokio::test]
async fn image_upload_returns_a_sealed_link() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let token = server.token(3, Role::Trainer)?;

    let form = Form::new().part("image", file_part("avatar.PNG", b"\x89PNG fake"));
    let res = server
        .client
        .post(server.url("/api/upload-image"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    let data = server.open(&body["data"]);
    let filename = data["filename"].as_str().unwrap_or_default().to_string();
    assert!(filename.ends_with(".png"));
    assert_eq!(data["name"], filename);
    assert_eq!(data["path"], format!("http://files.test/storage/images/{}", filename));

    let res = server.client.get(server.url(&format!("/images/{}", filename))).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn image_with_wrong_extension_is_unprocessable() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let token = server.token(3, Role::Trainer)?;

    let form = Form::new().part("image", file_part("payload.exe", b"MZ"));
    let res = server
        .client
        .post(server.url("/api/upload-image"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn upload_without_file_is_unprocessable() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let token = server.token(3, Role::Trainer)?;

    let form = Form::new().text("filePath", "images");
    let res = server
        .client
        .post(server.url("/api/upload-image"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn view_file_refuses_to_leave_the_upload_root() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let link = STANDARD.encode(json!({"path": "/storage/../../etc/passwd"}).to_string());
    let res = server.client.get(server.url(&format!("/view/file/{}", link))).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server.client.get(server.url("/view/file/not-base64!")).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn view_file_for_missing_file_is_404() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let link = STANDARD.encode(json!({"path": "/storage/documents/nope.pdf"}).to_string());
    let res = server.client.get(server.url(&format!("/view/file/{}", link))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
