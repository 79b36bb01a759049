/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */

//! # VK API
//!
//! This library was created for uploading media to VK through the API v5 method interface and
//! getting back the attachment references posts, comments and messages accept.
//!
//! For further details on the API refer to the [VK API Docs](https://dev.vk.com/reference)
//!
//! ## Features
//!
//! - Photo uploads to albums, walls and messages (up to 5 files per request, more are batched)
//! - Audio, doc and video uploads
//! - Mixed uploads of photos, video, audio and docs producing one attachment list
//!     - Wall posts and comments with a single token
//!     - Community messages using a user token plus a community token
//! - Removing uploaded assets again from their attachment references
//! - Decoding of attachment objects found on posts and messages
//! - Lower level interface for invoking any API method
//!
//! *Getting an access token (OAuth) is left up to the consumer of this library*
//!
//! *If you want to use this library for more than uploading, the [`v5::Client::call`] is a
//! way to invoke other methods in a more direct way*
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! vkapi = "0.3.0"
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vkapi::v5::{AttachmentsUploader, Client, Creds};
//! use serde_json::Value;
//!
//!async fn post_with_photos(access_token: &str, text: &str) -> anyhow::Result<()> {
//!    let client = Client::new(Creds::from_token(access_token));
//!
//!    // Upload the files, 7 photos are sent as a batch of 5 and a batch of 2
//!    let uploaded = AttachmentsUploader::new(client.clone())
//!        .add_photos(["1.jpg", "2.jpg", "3.jpg", "4.jpg", "5.jpg", "6.jpg", "7.jpg"])
//!        .add_doc("notes.txt", Some("Meeting notes.txt"))
//!        .upload()
//!        .await?;
//!
//!    // Attach them to a post on the token owner's wall
//!    let attachments = uploaded.attachment_list();
//!    let _: Value = client
//!        .call("wall.post", &[("message", text), ("attachments", attachments.as_str())])
//!        .await?;
//!    Ok(())
//!}
//! ```
//!
pub mod v5;
