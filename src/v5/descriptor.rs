/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v5::errors::VkError;
use crate::v5::parsers::{from_empty_str_to_none, from_num_or_str};
use crate::v5::{AssetKind, AttachmentRef, AttachmentReference, Audio, Doc, Photo};
use async_stream::try_stream;
use bytes::Bytes;
use futures::Stream;
use reqwest::Body;
use reqwest::multipart::Part;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

// Server side limits on files per upload request
pub const MAX_PHOTOS: usize = 5;
pub const MAX_AUDIOS: usize = 1;
pub const MAX_DOCS: usize = 1;
pub const MAX_VIDEOS: usize = 1;

const FILE_FIELD: &str = "file";
const VIDEO_FIELD: &str = "video_file";

const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// How file contents are written into the multipart body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Read in chunks while the request is being sent
    Streamed,
    /// Read fully up front so the request carries a content length
    Buffered,
}

impl TransferMode {
    /// Creates the multipart part for a local file
    pub async fn file_part(self, path: &Path, file_name: String) -> Result<Part, VkError> {
        let part = match self {
            TransferMode::Streamed => {
                let file = File::open(path).await?;
                Part::stream(Body::wrap_stream(file_chunks(file)))
            }
            TransferMode::Buffered => Part::bytes(tokio::fs::read(path).await?),
        };
        Ok(part
            .file_name(file_name)
            .mime_str("application/octet-stream")?)
    }
}

fn file_chunks(mut file: File) -> impl Stream<Item = Result<Bytes, io::Error>> {
    try_stream! {
        let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            yield Bytes::copy_from_slice(&buf[..n]);
        }
    }
}

type SaveParams = fn(&UploadConfirmation, &[String]) -> Result<Vec<(&'static str, String)>, VkError>;
type Format = fn(&Registration) -> Result<Vec<AttachmentReference>, VkError>;

/// Static description of one upload protocol variant
pub struct UploadDescriptor {
    pub kind: AssetKind,

    /// Method returning the one time upload url
    pub destination_method: &'static str,

    /// Method that turns the uploaded blob into an asset. Video has none, its
    /// destination call already created the asset.
    pub registration_method: Option<&'static str>,

    pub field_name: &'static str,

    pub batch_ceiling: usize,

    pub transfer: TransferMode,

    save_params: SaveParams,

    format: Format,
}

impl UploadDescriptor {
    /// Multipart field name for the n-th written part, counting from 1
    pub fn field(&self, n: usize) -> Cow<'static, str> {
        if self.batch_ceiling <= 1 {
            Cow::Borrowed(self.field_name)
        } else {
            Cow::Owned(format!("{}{}", self.field_name, n))
        }
    }

    /// Parameters for the registration call taken from the upload server reply
    pub fn save_params(
        &self,
        confirmation: &UploadConfirmation,
        names: &[String],
    ) -> Result<Vec<(&'static str, String)>, VkError> {
        (self.save_params)(confirmation, names)
    }

    /// References for the assets a registration produced, in upload order
    pub fn format(&self, registration: &Registration) -> Result<Vec<AttachmentReference>, VkError> {
        (self.format)(registration)
    }
}

impl std::fmt::Debug for UploadDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadDescriptor")
            .field("kind", &self.kind)
            .field("destination_method", &self.destination_method)
            .field("registration_method", &self.registration_method)
            .field("field_name", &self.field_name)
            .field("batch_ceiling", &self.batch_ceiling)
            .field("transfer", &self.transfer)
            .finish()
    }
}

pub static ALBUM_PHOTO: UploadDescriptor = UploadDescriptor {
    kind: AssetKind::Photo,
    destination_method: "photos.getUploadServer",
    registration_method: Some("photos.save"),
    field_name: FILE_FIELD,
    batch_ceiling: MAX_PHOTOS,
    transfer: TransferMode::Streamed,
    save_params: album_photo_params,
    format: format_photos,
};

pub static WALL_PHOTO: UploadDescriptor = UploadDescriptor {
    kind: AssetKind::Photo,
    destination_method: "photos.getWallUploadServer",
    registration_method: Some("photos.saveWallPhoto"),
    field_name: FILE_FIELD,
    batch_ceiling: MAX_PHOTOS,
    transfer: TransferMode::Streamed,
    save_params: photo_params,
    format: format_photos,
};

pub static MESSAGE_PHOTO: UploadDescriptor = UploadDescriptor {
    kind: AssetKind::Photo,
    destination_method: "photos.getMessagesUploadServer",
    registration_method: Some("photos.saveMessagesPhoto"),
    field_name: FILE_FIELD,
    batch_ceiling: MAX_PHOTOS,
    transfer: TransferMode::Streamed,
    save_params: photo_params,
    format: format_photos,
};

pub static AUDIO: UploadDescriptor = UploadDescriptor {
    kind: AssetKind::Audio,
    destination_method: "audio.getUploadServer",
    registration_method: Some("audio.save"),
    field_name: FILE_FIELD,
    batch_ceiling: MAX_AUDIOS,
    transfer: TransferMode::Streamed,
    save_params: audio_params,
    format: format_audio,
};

pub static WALL_DOC: UploadDescriptor = UploadDescriptor {
    kind: AssetKind::Doc,
    destination_method: "docs.getWallUploadServer",
    registration_method: Some("docs.save"),
    field_name: FILE_FIELD,
    batch_ceiling: MAX_DOCS,
    transfer: TransferMode::Streamed,
    save_params: doc_params,
    format: format_docs,
};

pub static DOC: UploadDescriptor = UploadDescriptor {
    kind: AssetKind::Doc,
    destination_method: "docs.getUploadServer",
    registration_method: Some("docs.save"),
    field_name: FILE_FIELD,
    batch_ceiling: MAX_DOCS,
    transfer: TransferMode::Streamed,
    save_params: doc_params,
    format: format_docs,
};

pub static VIDEO: UploadDescriptor = UploadDescriptor {
    kind: AssetKind::Video,
    destination_method: "video.save",
    registration_method: None,
    field_name: VIDEO_FIELD,
    batch_ceiling: MAX_VIDEOS,
    transfer: TransferMode::Buffered,
    save_params: no_params,
    format: format_video,
};

/// Where an upload goes. Selects the descriptor and carries the destination parameters.
///
/// A `group_id` uploads on behalf of that community. Docs, video and wall uploads for a
/// community still need a user token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    AlbumPhoto { group_id: Option<u64>, album_id: u64 },
    WallPhoto { group_id: Option<u64> },
    MessagePhoto { group_id: Option<u64> },
    Audio { group_id: Option<u64> },
    WallDoc { group_id: Option<u64> },
    Doc { group_id: Option<u64> },
    Video { group_id: Option<u64> },
}

impl UploadTarget {
    pub fn descriptor(&self) -> &'static UploadDescriptor {
        match self {
            UploadTarget::AlbumPhoto { .. } => &ALBUM_PHOTO,
            UploadTarget::WallPhoto { .. } => &WALL_PHOTO,
            UploadTarget::MessagePhoto { .. } => &MESSAGE_PHOTO,
            UploadTarget::Audio { .. } => &AUDIO,
            UploadTarget::WallDoc { .. } => &WALL_DOC,
            UploadTarget::Doc { .. } => &DOC,
            UploadTarget::Video { .. } => &VIDEO,
        }
    }

    /// Parameters sent to both the destination and the registration call
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let group_id = match *self {
            UploadTarget::AlbumPhoto { group_id, album_id } => {
                params.push(("album_id", album_id.to_string()));
                group_id
            }
            UploadTarget::WallPhoto { group_id }
            | UploadTarget::MessagePhoto { group_id }
            | UploadTarget::Audio { group_id }
            | UploadTarget::WallDoc { group_id }
            | UploadTarget::Doc { group_id }
            | UploadTarget::Video { group_id } => group_id,
        };
        if let Some(group_id) = group_id {
            params.push(("group_id", group_id.to_string()));
        }
        params
    }
}

/// Reply of the destination call
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UploadDestination {
    pub upload_url: String,

    #[serde(default, alias = "aid")]
    pub album_id: i64,

    #[serde(default, alias = "mid")]
    pub user_id: i64,

    #[serde(default)]
    pub owner_id: i64,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub access_key: Option<String>,

    #[serde(default)]
    pub video_id: i64,
}

impl UploadDestination {
    /// Owner the uploaded asset ends up with
    pub fn acting_owner_id(&self) -> i64 {
        if self.user_id != 0 {
            self.user_id
        } else {
            self.owner_id
        }
    }
}

/// Reply of the upload server after the multipart POST. Which members are set depends on
/// the asset kind.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UploadConfirmation {
    #[serde(default, deserialize_with = "from_num_or_str")]
    pub server: Option<i64>,

    pub hash: Option<String>,

    pub photos_list: Option<String>,

    pub photo: Option<String>,

    pub audio: Option<String>,

    pub file: Option<String>,

    #[serde(default, deserialize_with = "from_num_or_str")]
    pub video_id: Option<i64>,

    pub size: Option<u64>,

    #[serde(default, deserialize_with = "from_num_or_str")]
    pub aid: Option<i64>,

    pub redirect: Option<String>,

    #[serde(default, deserialize_with = "from_empty_str_to_none")]
    pub error: Option<String>,
}

/// Everything one batch produced: the raw registration response plus the replies it was built from
#[derive(Debug, Clone)]
pub struct Registration {
    pub destination: UploadDestination,
    pub confirmation: UploadConfirmation,
    pub response: Option<Value>,
}

impl Registration {
    fn decode<T: DeserializeOwned>(&self) -> Result<T, VkError> {
        let response = self.response.as_ref().ok_or(VkError::ResponseMissing())?;
        Ok(T::deserialize(response)?)
    }
}

fn required<'a>(value: &'a Option<String>) -> Result<&'a str, VkError> {
    value.as_deref().ok_or(VkError::ResponseMissing())
}

fn server_and_hash(c: &UploadConfirmation) -> Result<[(&'static str, String); 2], VkError> {
    let server = c.server.ok_or(VkError::ResponseMissing())?;
    Ok([
        ("server", server.to_string()),
        ("hash", required(&c.hash)?.to_string()),
    ])
}

fn album_photo_params(
    c: &UploadConfirmation,
    _: &[String],
) -> Result<Vec<(&'static str, String)>, VkError> {
    let list = required(&c.photos_list)?;
    if list.is_empty() || list == "[]" {
        return Err(VkError::UploadRejected("no photos were accepted".into()));
    }
    let mut params = vec![("photos_list", list.to_string())];
    params.extend(server_and_hash(c)?);
    Ok(params)
}

fn photo_params(
    c: &UploadConfirmation,
    _: &[String],
) -> Result<Vec<(&'static str, String)>, VkError> {
    let photo = required(&c.photo)?;
    if photo.is_empty() || photo == "[]" {
        return Err(VkError::UploadRejected("no photos were accepted".into()));
    }
    let mut params = vec![("photo", photo.to_string())];
    params.extend(server_and_hash(c)?);
    Ok(params)
}

fn audio_params(
    c: &UploadConfirmation,
    _: &[String],
) -> Result<Vec<(&'static str, String)>, VkError> {
    let mut params = vec![("audio", required(&c.audio)?.to_string())];
    params.extend(server_and_hash(c)?);
    Ok(params)
}

// The first name doubles as title and tags
fn doc_params(
    c: &UploadConfirmation,
    names: &[String],
) -> Result<Vec<(&'static str, String)>, VkError> {
    let mut params = vec![("file", required(&c.file)?.to_string())];
    if let Some(name) = names.first() {
        params.push(("title", name.clone()));
        params.push(("tags", name.clone()));
    }
    Ok(params)
}

fn no_params(
    _: &UploadConfirmation,
    _: &[String],
) -> Result<Vec<(&'static str, String)>, VkError> {
    Ok(Vec::new())
}

fn format_photos(reg: &Registration) -> Result<Vec<AttachmentReference>, VkError> {
    let photos: Vec<Photo> = reg.decode()?;
    Ok(photos.iter().map(AttachmentRef::reference).collect())
}

fn format_audio(reg: &Registration) -> Result<Vec<AttachmentReference>, VkError> {
    let audio: Audio = reg.decode()?;
    Ok(vec![audio.reference()])
}

// docs.save answers with a list on older versions and a typed object on newer ones
#[derive(Deserialize)]
#[serde(untagged)]
enum SavedDocs {
    List(Vec<Doc>),
    Typed { doc: Doc },
}

fn format_docs(reg: &Registration) -> Result<Vec<AttachmentReference>, VkError> {
    Ok(match reg.decode::<SavedDocs>()? {
        SavedDocs::List(docs) => docs.iter().map(AttachmentRef::reference).collect(),
        SavedDocs::Typed { doc } => vec![doc.reference()],
    })
}

fn format_video(reg: &Registration) -> Result<Vec<AttachmentReference>, VkError> {
    let video_id = reg
        .confirmation
        .video_id
        .or((reg.destination.video_id != 0).then_some(reg.destination.video_id))
        .ok_or(VkError::ResponseMissing())?;
    Ok(vec![AttachmentReference::new(
        AssetKind::Video,
        reg.destination.acting_owner_id(),
        video_id,
    )])
}
