/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */

use crate::v5::ApiErrorCodes;
use std::io;
use thiserror::Error;

/// Error conditions that can be returned
#[derive(Error, Debug)]
pub enum VkError {
    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error("Request network error")]
    Request(#[from] reqwest::Error),

    #[error("Deserialization error")]
    Deserialization(#[from] serde_json::Error),

    #[error("URL Parse error")]
    UrlParsing(#[from] url::ParseError),

    #[error("Expected response missing")]
    ResponseMissing(),

    #[error("API Response was error: {0}, msg: {1}")]
    ApiResponse(u32, String),

    #[error("API Response is a too many requests error. Gave up after {0} attempts")]
    ApiResponseTooManyRequests(u32),

    #[error("API Response requires a captcha answer. sid: {sid} img: {img}")]
    CaptchaNeeded { sid: String, img: String },

    #[error("API Response requires user validation at: {0}")]
    ValidationRequired(String),

    #[error("API Response is malformed: {0:?}")]
    ApiResponseMalformed(serde_json::Error),

    #[error("Upload server rejected the file(s): {0}")]
    UploadRejected(String),

    #[error("Not an attachment reference: {0}")]
    MalformedReference(String),
}

impl VkError {
    /// Remote error code if this error came from the API envelope
    pub fn api_code(&self) -> Option<u32> {
        match self {
            VkError::ApiResponse(code, _) => Some(*code),
            VkError::ApiResponseTooManyRequests(_) => Some(ApiErrorCodes::TooManyRequests.into()),
            VkError::CaptchaNeeded { .. } => Some(ApiErrorCodes::CaptchaNeeded.into()),
            VkError::ValidationRequired(_) => Some(ApiErrorCodes::ValidationRequired.into()),
            _ => None,
        }
    }
}
