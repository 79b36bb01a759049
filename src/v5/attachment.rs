/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v5::parsers::{from_empty_str_to_none, from_int_bool, from_unix_time};
use crate::v5::{AssetKind, AttachmentReference, AttachmentType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, de};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Produces the reference string used to attach an already uploaded asset
pub trait AttachmentRef {
    fn reference(&self) -> AttachmentReference;
}

/// Holds information returned for a photo object.
///
/// See [VK API Docs](https://dev.vk.com/reference/objects/photo) for more
/// details on the individual fields.
#[derive(Deserialize, Debug, Clone)]
pub struct Photo {
    pub id: i64,

    #[serde(default)]
    pub album_id: i64,

    pub owner_id: i64,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub photo_75: Option<String>,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub photo_130: Option<String>,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub photo_604: Option<String>,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub photo_807: Option<String>,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub photo_1280: Option<String>,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub photo_2560: Option<String>,

    #[serde(default)]
    pub width: u32,

    #[serde(default)]
    pub height: u32,

    #[serde(default)]
    pub text: String,

    #[serde(default, deserialize_with = "from_unix_time")]
    pub date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub access_key: Option<String>,
}

impl Photo {
    /// Url of the largest size available
    pub fn content_url(&self) -> Option<String> {
        [
            &self.photo_2560,
            &self.photo_1280,
            &self.photo_807,
            &self.photo_604,
            &self.photo_130,
            &self.photo_75,
        ]
        .into_iter()
        .find_map(|v| v.as_deref())
        .map(|url| with_access_key(url, self.access_key.as_deref()))
    }
}

/// Holds information returned for a video object.
///
/// Only the preview image is reachable through the API without direct authorization.
#[derive(Deserialize, Debug, Clone)]
pub struct Video {
    pub id: i64,

    pub owner_id: i64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub duration: u32,

    #[serde(default)]
    pub description: String,

    #[serde(default, deserialize_with = "from_unix_time")]
    pub date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub views: u64,

    #[serde(default)]
    pub comments: u64,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub photo_130: Option<String>,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub photo_320: Option<String>,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub photo_800: Option<String>,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub access_key: Option<String>,

    #[serde(default, deserialize_with = "from_int_bool")]
    pub can_edit: bool,

    #[serde(default, deserialize_with = "from_int_bool")]
    pub can_add: bool,
}

impl Video {
    /// Url of the largest preview image available
    pub fn preview_url(&self) -> Option<String> {
        [&self.photo_800, &self.photo_320, &self.photo_130]
            .into_iter()
            .find_map(|v| v.as_deref())
            .map(|url| with_access_key(url, self.access_key.as_deref()))
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Audio {
    pub id: i64,

    pub owner_id: i64,

    #[serde(default)]
    pub artist: String,

    #[serde(default)]
    pub title: String,

    // In seconds
    #[serde(default)]
    pub duration: u32,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub url: Option<String>,

    #[serde(default, rename = "lyrics_id")]
    pub lyrics: i64,

    #[serde(default, rename = "album_id")]
    pub album: i64,

    #[serde(default, rename = "genre_id")]
    pub genre: i64,
}

impl Audio {
    pub fn content_url(&self) -> Option<String> {
        self.url.clone()
    }
}

/// Holds information returned for a document object.
#[derive(Deserialize, Debug, Clone)]
pub struct Doc {
    pub id: i64,

    pub owner_id: i64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub size: u64,

    #[serde(default)]
    pub ext: String,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub url: Option<String>,

    #[serde(default, deserialize_with = "from_unix_time")]
    pub date: Option<DateTime<Utc>>,

    #[serde(default, rename = "type")]
    pub doc_type: u32,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub access_key: Option<String>,
}

impl Doc {
    pub fn content_url(&self) -> Option<String> {
        self.url
            .as_deref()
            .map(|url| with_access_key(url, self.access_key.as_deref()))
    }
}

impl AttachmentRef for Photo {
    fn reference(&self) -> AttachmentReference {
        AttachmentReference::new(AssetKind::Photo, self.owner_id, self.id)
    }
}

impl AttachmentRef for Video {
    fn reference(&self) -> AttachmentReference {
        AttachmentReference::new(AssetKind::Video, self.owner_id, self.id)
    }
}

impl AttachmentRef for Audio {
    fn reference(&self) -> AttachmentReference {
        AttachmentReference::new(AssetKind::Audio, self.owner_id, self.id)
    }
}

impl AttachmentRef for Doc {
    fn reference(&self) -> AttachmentReference {
        AttachmentReference::new(AssetKind::Doc, self.owner_id, self.id)
    }
}

/// An entry of the `attachments` array found on posts, comments and messages.
///
/// The payload sits under a member named after the `type` value:
/// `{"type": "photo", "photo": {...}}`. Types without a typed model are kept as raw JSON.
#[derive(Deserialize, Debug, Clone)]
#[serde(try_from = "RawAttachment")]
pub enum Attachment {
    Photo(Photo),
    Video(Video),
    Audio(Audio),
    Doc(Doc),
    Other { kind: String, raw: Value },
}

impl Attachment {
    /// Value of the `type` member this attachment was decoded from
    pub fn kind(&self) -> &str {
        match self {
            Attachment::Photo(_) => AttachmentType::Photo.into(),
            Attachment::Video(_) => AttachmentType::Video.into(),
            Attachment::Audio(_) => AttachmentType::Audio.into(),
            Attachment::Doc(_) => AttachmentType::Doc.into(),
            Attachment::Other { kind, .. } => kind,
        }
    }

    /// Reference for attachments that were uploaded assets
    pub fn reference(&self) -> Option<AttachmentReference> {
        match self {
            Attachment::Photo(v) => Some(v.reference()),
            Attachment::Video(v) => Some(v.reference()),
            Attachment::Audio(v) => Some(v.reference()),
            Attachment::Doc(v) => Some(v.reference()),
            Attachment::Other { .. } => None,
        }
    }
}

#[derive(Deserialize)]
struct RawAttachment {
    #[serde(rename = "type")]
    kind: String,

    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl TryFrom<RawAttachment> for Attachment {
    type Error = serde_json::Error;

    fn try_from(mut raw: RawAttachment) -> Result<Self, Self::Error> {
        let payload = raw.rest.remove(&raw.kind).ok_or_else(|| {
            <serde_json::Error as de::Error>::custom(format!("missing `{}` member", raw.kind))
        })?;
        Ok(match AttachmentType::from_str(&raw.kind) {
            Ok(AttachmentType::Photo) => Attachment::Photo(serde_json::from_value(payload)?),
            Ok(AttachmentType::Video) => Attachment::Video(serde_json::from_value(payload)?),
            Ok(AttachmentType::Audio) => Attachment::Audio(serde_json::from_value(payload)?),
            Ok(AttachmentType::Doc) => Attachment::Doc(serde_json::from_value(payload)?),
            _ => Attachment::Other {
                kind: raw.kind,
                raw: payload,
            },
        })
    }
}

fn with_access_key(url: &str, access_key: Option<&str>) -> String {
    match access_key {
        Some(key) => {
            let sep = if url.contains('?') { '&' } else { '?' };
            format!("{url}{sep}access_key={key}")
        }
        None => url.to_string(),
    }
}
