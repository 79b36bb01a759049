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
use vkapi::v5::{AssetKind, AttachmentsUploader, Client, Creds, Unlinker};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    // The user token must belong to an admin of the community
    let user = Client::new(Creds::from_token(&std::env::var("VK_ACCESS_TOKEN")?));
    let group = Client::new(Creds::from_token(&std::env::var("VK_GROUP_TOKEN")?));
    let group_id: u64 = std::env::var("VK_GROUP_ID")?.parse()?;
    let peer_id = std::env::var("VK_PEER_ID")?;

    let mut args = std::env::args().skip(1);
    let photo = args.next().unwrap_or_else(|| "photo.jpg".into());
    let track = args.next().unwrap_or_else(|| "track.mp3".into());

    // Audio can't go into a community message and is sent as a doc instead
    let uploaded = AttachmentsUploader::community_messages(user.clone(), group.clone(), group_id)
        .add_photo(photo, None)
        .add_audio(track, None)
        .upload()
        .await?;
    let attachments = uploaded.attachment_list();
    println!("Uploaded: {}", attachments);

    let sent: Value = group
        .call(
            "messages.send",
            &[
                ("peer_id", peer_id.as_str()),
                ("attachment", attachments.as_str()),
            ],
        )
        .await?;
    println!("Sent message: {}", sent);

    // Remove the docs from the community's doc list again, the message keeps its copy
    Unlinker::with_kinds(user, &[AssetKind::Doc])
        .unlink_all(&attachments)
        .await?;
    Ok(())
}
