mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};
use trainer_admin_api::auth::Role;

#[tokio::test]
async fn table_outside_allow_list_is_forbidden() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let token = server.token(1, Role::Admin)?;

    let res = server.client.get(server.url("/api/data/payroll")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Table 'payroll' is not allowed");
    Ok(())
}

#[tokio::test]
async fn forbidden_table_stays_forbidden_even_when_allowed() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let token = server.token(1, Role::Admin)?;

    let res = server
        .client
        .get(server.url("/api/data/two_factor_auth/info"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn allowed_but_missing_table_is_404() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let token = server.token(1, Role::Admin)?;

    let res = server
        .client
        .get(server.url("/api/data/ghost_table/info"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn table_info_lists_columns() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let token = server.token(1, Role::Admin)?;

    let res = server
        .client
        .get(server.url("/api/data/courses/info"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["status"], true);
    assert_eq!(body["table"], "courses");
    assert_eq!(body["total_columns"], 3);
    assert_eq!(body["columns"][2], json!({"name": "hours", "type": "decimal"}));
    Ok(())
}

#[tokio::test]
async fn data_routes_require_a_token() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server.client.get(server.url("/api/data/courses")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn unknown_procedure_is_rejected() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let token = server.token(1, Role::Admin)?;
    let sealed = server.seal(&json!({"procName": "sp_drop_everything", "dataParams": []}));

    let res = server
        .client
        .post(server.url("/api/call/procedure"))
        .bearer_auth(&token)
        .json(&sealed)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Invalid procedure name");
    Ok(())
}

#[tokio::test]
async fn procedure_params_must_be_a_sequence() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let token = server.token(1, Role::Admin)?;
    let sealed = server.seal(&json!({"procName": "sp_trainer_report", "dataParams": "7"}));

    let res = server
        .client
        .post(server.url("/api/call/procedure"))
        .bearer_auth(&token)
        .json(&sealed)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Invalid data params");
    Ok(())
}

#[tokio::test]
async fn upsert_into_unlisted_table_is_forbidden() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let token = server.token(1, Role::Admin)?;
    let sealed = server.seal(&json!({"ID": 1, "name": "20240101_init"}));

    let res = server
        .client
        .post(server.url("/api/data/migrations/upsert"))
        .bearer_auth(&token)
        .json(&sealed)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}
