/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */

use crate::v5::errors::VkError;
use crate::v5::{ApiClient, ApiConfig, Creds};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Handle for a single access token (a user or a community).
///
/// Cloning is cheap and every clone shares the same connection pool and captcha answer.
///
/// ```rust,no_run
/// use vkapi::v5::{Client, Creds, UploadTarget};
///
/// async fn wall_photos() -> Result<String, vkapi::v5::VkError> {
///     let client = Client::new(Creds::from_token("user access token"));
///     let report = client
///         .upload_all(&UploadTarget::WallPhoto { group_id: None }, &["a.jpg", "b.jpg"], &[])
///         .await;
///     let (refs, err) = report.into_parts();
///     if let Some(err) = err {
///         return Err(err);
///     }
///     Ok(refs.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(","))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    api_client: Arc<ApiClient>,
}

impl Client {
    pub fn new(creds: Creds) -> Self {
        Self {
            api_client: Arc::new(ApiClient::new(creds)),
        }
    }

    pub fn with_config(creds: Creds, config: ApiConfig) -> Self {
        Self {
            api_client: Arc::new(ApiClient::with_config(creds, config)),
        }
    }

    /// Invokes the named API method and decodes its response
    pub async fn call<T, K, V>(&self, method: &str, params: &[(K, V)]) -> Result<T, VkError>
    where
        T: DeserializeOwned,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.api_client.call(method, params).await
    }

    /// Sets the captcha answer after a [`VkError::CaptchaNeeded`]
    pub fn set_captcha(&self, sid: &str, key: &str) {
        self.api_client.set_captcha(sid, key);
    }

    pub fn clear_captcha(&self) {
        self.api_client.clear_captcha();
    }

    /// Retrieves the content behind an attachment url such as [`crate::v5::Photo::content_url`]
    pub async fn fetch_content(&self, url: &str) -> Result<Bytes, VkError> {
        self.api_client.get_bytes(url).await
    }

    pub(crate) fn api_client(&self) -> &ApiClient {
        &self.api_client
    }
}
