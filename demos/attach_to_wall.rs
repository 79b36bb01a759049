/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */

extern crate vkapi;

use anyhow::Result;
use dotenvy::dotenv;
use serde_json::Value;
use std::path::Path;
use vkapi::v5::{AttachmentsUploader, Client, Creds};

// Sorts a file into the attachment kind by its extension
fn add_file(uploader: AttachmentsUploader, path: &str) -> AttachmentsUploader {
    let ext = Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "gif" => uploader.add_photo(path, None),
        "mp3" => uploader.add_audio(path, None),
        "mp4" | "avi" | "mov" => uploader.add_video(path, None),
        _ => uploader.add_doc(path, None),
    }
}

/// Posts the files given on the command line to the token owner's wall
#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();
    let access_token = std::env::var("VK_ACCESS_TOKEN")?;
    let message = std::env::var("VK_WALL_MESSAGE").unwrap_or_default();

    let client = Client::new(Creds::from_token(&access_token));
    let uploader = std::env::args()
        .skip(1)
        .fold(AttachmentsUploader::new(client.clone()), |uploader, path| {
            add_file(uploader, &path)
        });
    let uploaded = uploader.upload().await?;
    println!("Uploaded: {}", uploaded);

    let attachments = uploaded.attachment_list();
    let post: Value = client
        .call(
            "wall.post",
            &[
                ("message", message.as_str()),
                ("attachments", attachments.as_str()),
            ],
        )
        .await?;
    println!("Posted: {:?}", post);
    Ok(())
}
