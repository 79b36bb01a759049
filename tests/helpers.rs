/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use vkapi::v5::{ApiConfig, Client, Creds};
use wiremock::{MockServer, ResponseTemplate};

#[allow(dead_code)]
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Client whose method calls go to the mock server
#[allow(dead_code)]
pub(crate) fn mock_client(server: &MockServer, token: &str) -> Client {
    Client::with_config(
        Creds::from_token(token),
        ApiConfig {
            origin: format!("{}/method/", server.uri()),
            retry_delay: Duration::from_millis(5),
            ..ApiConfig::default()
        },
    )
}

#[allow(dead_code)]
pub(crate) fn method_path(method: &str) -> String {
    format!("/method/{method}")
}

#[allow(dead_code)]
pub(crate) fn vk_response(response: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "response": response }))
}

#[allow(dead_code)]
pub(crate) fn vk_error(code: u32, msg: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "error": { "error_code": code, "error_msg": msg, "request_params": [] }
    }))
}

// Destination reply pointing the upload at `/upload/<slot>` of the mock server
#[allow(dead_code)]
pub(crate) fn upload_server(server: &MockServer, slot: &str) -> ResponseTemplate {
    vk_response(json!({
        "upload_url": format!("{}/upload/{slot}", server.uri()),
        "album_id": -14,
        "user_id": 100
    }))
}

// Number of file parts in a multipart body
#[allow(dead_code)]
pub(crate) fn file_parts(body: &[u8]) -> usize {
    String::from_utf8_lossy(body).matches("filename=").count()
}

// Writes small files named after `names` into `dir`
#[allow(dead_code)]
pub(crate) fn write_files(dir: &TempDir, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("contents of {name}")).unwrap();
            path
        })
        .collect()
}

#[allow(dead_code)]
pub(crate) fn get_live_creds() -> anyhow::Result<Creds> {
    let token = std::env::var("VK_ACCESS_TOKEN")?;
    let creds = Creds::from_token(&token);
    Ok(match std::env::var("VK_APP_SECRET") {
        Ok(secret) => creds.with_secret(&secret),
        Err(_) => creds,
    })
}
