/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v5::errors::VkError;
use bytes::Bytes;
use log::{debug, warn};
use num_enum::{FromPrimitive, IntoPrimitive};
use reqwest::multipart::Form;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

// Root VK API
pub const API_ORIGIN: &str = "https://api.vk.com/method/";

// API version the request/response shapes are written against
pub const API_VERSION: &str = "5.53";

/// Convenience for methods that take no parameters
pub const NO_PARAMS: &[(&str, &str)] = &[];

/// Settings for how the [`ApiClient`] reaches the API
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base url the method name is joined onto. Must end with a `/`
    pub origin: String,

    /// Value sent as the `v` parameter
    pub version: String,

    /// Attempts made when the API answers with a too many requests error
    pub max_attempts: u32,

    /// Delay between those attempts
    pub retry_delay: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            origin: API_ORIGIN.into(),
            version: API_VERSION.into(),
            max_attempts: 3,
            retry_delay: Duration::from_millis(400),
        }
    }
}

/// Directly communicates with the API.
pub struct ApiClient {
    creds: Creds,
    config: ApiConfig,
    https_client: reqwest::Client,
    captcha: RwLock<Option<CaptchaAnswer>>,
}

impl ApiClient {
    /// Creates a new VK client instance from provided credentials
    pub fn new(creds: Creds) -> Self {
        Self::with_config(creds, ApiConfig::default())
    }

    /// Creates a new VK client instance with non default settings
    pub fn with_config(creds: Creds, config: ApiConfig) -> Self {
        Self {
            creds,
            config,
            https_client: reqwest::Client::new(),
            captcha: RwLock::new(None),
        }
    }

    /// Answer for the last captcha challenge. Sent along with every call until cleared.
    pub fn set_captcha(&self, sid: &str, key: &str) {
        let mut captcha = self.captcha.write().unwrap_or_else(PoisonError::into_inner);
        *captcha = Some(CaptchaAnswer {
            sid: sid.into(),
            key: key.into(),
        });
    }

    pub fn clear_captcha(&self) {
        let mut captcha = self.captcha.write().unwrap_or_else(PoisonError::into_inner);
        *captcha = None;
    }

    /// Invokes an API method and decodes the `response` member of the reply
    pub async fn call<T, K, V>(&self, method: &str, params: &[(K, V)]) -> Result<T, VkError>
    where
        T: DeserializeOwned,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let req_url = self.method_url(method, params)?;
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            debug!("vk call: {} attempt: {}", method, attempt);
            let data = self
                .https_client
                .get(req_url.clone())
                .header("Accept", "application/json")
                .send()
                .await?
                .bytes()
                .await?;
            let body = serde_json::from_slice::<ResponseBody<T>>(&data)
                .map_err(VkError::ApiResponseMalformed)?;

            match body.error {
                Some(err) if err.code != 0 => {
                    if ApiErrorCodes::from(err.code) != ApiErrorCodes::TooManyRequests {
                        return Err(err.into());
                    }
                    if attempt < attempts {
                        warn!("vk call: {} too many requests, retrying", method);
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
                _ => return body.response.ok_or(VkError::ResponseMissing()),
            }
        }
        Err(VkError::ApiResponseTooManyRequests(attempts))
    }

    /// Posts a multipart form straight to an upload server url and decodes the JSON reply
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        url: &str,
        form: Form,
    ) -> Result<T, VkError> {
        let req_url = url::Url::parse(url)?;
        debug!("vk upload to: {}", req_url.host_str().unwrap_or_default());
        let data = self
            .https_client
            .post(req_url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        serde_json::from_slice::<T>(&data).map_err(VkError::ApiResponseMalformed)
    }

    /// Downloads the content found at the provided url
    pub async fn get_bytes(&self, url: &str) -> Result<Bytes, VkError> {
        let req_url = url::Url::parse(url)?;
        Ok(self
            .https_client
            .get(req_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?)
    }

    fn method_url<K, V>(&self, method: &str, params: &[(K, V)]) -> Result<url::Url, VkError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let captcha = self
            .captcha
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut query: Vec<(&str, &str)> = vec![
            ("v", self.config.version.as_str()),
            ("https", "1"),
            ("access_token", self.creds.access_token.as_str()),
        ];
        query.extend(params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())));
        if let Some(answer) = &captcha {
            query.push(("captcha_sid", answer.sid.as_str()));
            query.push(("captcha_key", answer.key.as_str()));
        }

        let sig = self
            .creds
            .app_secret
            .as_deref()
            .map(|secret| sign(method, &query, secret));
        if let Some(sig) = &sig {
            query.push(("sig", sig.as_str()));
        }

        let base = url::Url::parse(&self.config.origin)?.join(method)?;
        Ok(url::Url::parse_with_params(base.as_str(), &query)?)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("creds", &self.creds)
            .field("config", &self.config)
            .finish()
    }
}

// Signature of a call made with a secret bound token
pub(crate) fn sign(method: &str, query: &[(&str, &str)], secret: &str) -> String {
    let joined = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{:x}", md5::compute(format!("/method/{method}?{joined}{secret}")))
}

/// Error codes per the VK API site
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum ApiErrorCodes {
    Unknown = 1,
    AppDisabled = 2,
    UnknownMethod = 3,
    IncorrectSignature = 4,
    AuthorizationFailed = 5,
    TooManyRequests = 6,
    PermissionDenied = 7,
    InvalidRequest = 8,
    FloodControl = 9,
    InternalServerError = 10,
    TestMode = 11,
    CaptchaNeeded = 14,
    AccessDenied = 15,
    HttpAuthorizationFailed = 16,
    ValidationRequired = 17,
    NonStandaloneDenied = 20,
    StandaloneOnly = 21,
    MethodDisabled = 23,
    ConfirmationRequired = 24,
    ParamMissing = 100,
    InvalidAppId = 101,
    InvalidUserId = 113,
    InvalidTimestamp = 150,
    #[num_enum(catch_all)]
    Other(u32),
}

/// Access token and optional app secret used for signing
#[derive(Default, Clone)]
pub struct Creds {
    access_token: String,
    app_secret: Option<String>,
}

impl Creds {
    pub fn from_token(access_token: &str) -> Self {
        Self {
            access_token: access_token.into(),
            app_secret: None,
        }
    }

    /// Signs every call with `sig`. Needed for tokens issued without the https-only scope.
    pub fn with_secret(mut self, app_secret: &str) -> Self {
        self.app_secret = Some(app_secret.into());
        self
    }
}

impl std::fmt::Debug for Creds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Creds")
            .field("access_token", &"xxx")
            .field("app_secret", &self.app_secret.as_ref().map(|_| "xxx"))
            .finish()
    }
}

#[derive(Clone)]
struct CaptchaAnswer {
    sid: String,
    key: String,
}

// Base expected response body to be returned from the API
#[derive(Deserialize, Debug)]
struct ResponseBody<ResponseType> {
    error: Option<ApiError>,
    response: Option<ResponseType>,
}

// Error member of the response body
#[derive(Deserialize, Debug)]
struct ApiError {
    #[serde(rename = "error_code")]
    code: u32,

    #[serde(default, rename = "error_msg")]
    message: String,

    #[serde(default)]
    captcha_sid: String,

    #[serde(default)]
    captcha_img: String,

    #[serde(default)]
    redirect_uri: String,
}

impl From<ApiError> for VkError {
    fn from(err: ApiError) -> Self {
        use ApiErrorCodes as E;
        match E::from(err.code) {
            E::CaptchaNeeded => VkError::CaptchaNeeded {
                sid: err.captcha_sid,
                img: err.captcha_img,
            },
            E::ValidationRequired => VkError::ValidationRequired(err.redirect_uri),
            _ => VkError::ApiResponse(err.code, err.message),
        }
    }
}
