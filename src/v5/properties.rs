/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use serde::Serialize;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// Kinds of assets that can be uploaded and later referenced as attachments.
///
/// The string form is the prefix used in attachment references (`photo100_5551`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum AssetKind {
    Photo,
    Video,
    Audio,
    Doc,
}

impl AssetKind {
    /// Order references are matched in when unlinking
    pub const UNLINK_ORDER: [AssetKind; 4] = [
        AssetKind::Photo,
        AssetKind::Doc,
        AssetKind::Video,
        AssetKind::Audio,
    ];

    /// Prefix used in attachment references
    pub fn prefix(self) -> &'static str {
        self.into()
    }

    /// Method that removes an asset of this kind
    pub fn delete_method(self) -> &'static str {
        match self {
            AssetKind::Photo => "photos.delete",
            AssetKind::Video => "video.delete",
            AssetKind::Audio => "audio.delete",
            AssetKind::Doc => "docs.delete",
        }
    }

    /// Name of the id parameter the delete method expects
    pub fn id_param(self) -> &'static str {
        match self {
            AssetKind::Photo => "photo_id",
            AssetKind::Video => "video_id",
            AssetKind::Audio => "audio_id",
            AssetKind::Doc => "doc_id",
        }
    }
}

/// Types found in the `type` member of an attachment object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttachmentType {
    Photo,
    PostedPhoto,
    Video,
    Audio,
    Doc,
    Graffiti,
    Url,
    Link,
    Note,
    App,
    Poll,
    Page,
}
