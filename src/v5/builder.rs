/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v5::errors::VkError;
use crate::v5::reference::join_references;
use crate::v5::uploader::base_name;
use crate::v5::{AttachmentReference, Client, UploadTarget};
use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};

/// Collects files of mixed kinds and uploads them as one attachment list.
///
/// Adding consumes and returns the uploader so calls can be chained. [`Self::upload`]
/// consumes it too, an uploader cannot be reused once its files were sent.
///
/// ```rust,no_run
/// use vkapi::v5::{AttachmentsUploader, Client, Creds};
///
/// async fn post_attachments(client: Client) -> Result<String, vkapi::v5::VkError> {
///     let uploaded = AttachmentsUploader::new(client)
///         .add_photos(["one.jpg", "two.jpg"])
///         .add_doc("report.pdf", None)
///         .upload()
///         .await?;
///     Ok(uploaded.attachment_list())
/// }
/// ```
#[derive(Debug)]
#[must_use = "nothing is uploaded until `upload` is called"]
pub struct AttachmentsUploader {
    credentials: Credentials,
    pending: PendingAttachments,
}

#[derive(Debug)]
enum Credentials {
    // Everything goes to the token owner's own sections
    Single(Client),

    // Photos go through the community message server, the rest needs the user token
    CommunityMessages {
        user: Client,
        group: Client,
        group_id: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingFile {
    path: PathBuf,
    name: String,
}

impl PendingFile {
    fn new(path: PathBuf, name: Option<&str>) -> Self {
        let name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => base_name(&path),
        };
        Self { path, name }
    }
}

#[derive(Debug, Default)]
struct PendingAttachments {
    videos: Vec<PendingFile>,
    photos: Vec<PendingFile>,
    audios: Vec<PendingFile>,
    docs: Vec<PendingFile>,
}

impl AttachmentsUploader {
    /// Uploads for wall posts and comments using a single token.
    ///
    /// Video and docs land in the token owner's own sections rather than a community's.
    pub fn new(client: Client) -> Self {
        Self {
            credentials: Credentials::Single(client),
            pending: PendingAttachments::default(),
        }
    }

    /// Uploads for messages sent by a community.
    ///
    /// Both tokens are needed: photos use the community token through the message upload
    /// server, video and docs use the user token with `group_id` since there is no message
    /// server for them. Audio cannot be attached this way and is uploaded as a doc. Docs also
    /// show up in the community's doc section, use an [`crate::v5::Unlinker`] once the message
    /// is sent.
    pub fn community_messages(user: Client, group: Client, group_id: u64) -> Self {
        Self {
            credentials: Credentials::CommunityMessages {
                user,
                group,
                group_id,
            },
            pending: PendingAttachments::default(),
        }
    }

    /// Adds a video. `name` is the file name sent to the server, `None` or empty uses the
    /// path's file name.
    pub fn add_video(mut self, path: impl Into<PathBuf>, name: Option<&str>) -> Self {
        self.pending.videos.push(PendingFile::new(path.into(), name));
        self
    }

    pub fn add_photo(mut self, path: impl Into<PathBuf>, name: Option<&str>) -> Self {
        self.pending.photos.push(PendingFile::new(path.into(), name));
        self
    }

    pub fn add_photos<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.pending
            .photos
            .extend(paths.into_iter().map(|p| PendingFile::new(p.into(), None)));
        self
    }

    pub fn add_audio(mut self, path: impl Into<PathBuf>, name: Option<&str>) -> Self {
        let file = PendingFile::new(path.into(), name);
        self.audio_list().push(file);
        self
    }

    pub fn add_audios<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files: Vec<_> = paths
            .into_iter()
            .map(|p| PendingFile::new(p.into(), None))
            .collect();
        self.audio_list().extend(files);
        self
    }

    pub fn add_doc(mut self, path: impl Into<PathBuf>, name: Option<&str>) -> Self {
        self.pending.docs.push(PendingFile::new(path.into(), name));
        self
    }

    pub fn add_docs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.pending
            .docs
            .extend(paths.into_iter().map(|p| PendingFile::new(p.into(), None)));
        self
    }

    /// Uploads every added file and returns their references.
    ///
    /// Kinds are uploaded in the order audio, video, doc, photo. The first kind with a failed
    /// batch stops the upload and its error is returned, assets already registered by earlier
    /// batches stay on the server.
    pub async fn upload(self) -> Result<UploadedAttachments, VkError> {
        let pending = &self.pending;
        let kinds: Vec<(&Client, UploadTarget, &[PendingFile])> = match &self.credentials {
            Credentials::Single(client) => vec![
                (client, UploadTarget::Audio { group_id: None }, pending.audios.as_slice()),
                (client, UploadTarget::Video { group_id: None }, pending.videos.as_slice()),
                (client, UploadTarget::WallDoc { group_id: None }, pending.docs.as_slice()),
                (client, UploadTarget::WallPhoto { group_id: None }, pending.photos.as_slice()),
            ],
            Credentials::CommunityMessages {
                user,
                group,
                group_id,
            } => {
                let group_id = Some(*group_id);
                vec![
                    (user, UploadTarget::Video { group_id }, pending.videos.as_slice()),
                    (user, UploadTarget::WallDoc { group_id }, pending.docs.as_slice()),
                    (group, UploadTarget::MessagePhoto { group_id }, pending.photos.as_slice()),
                ]
            }
        };

        let mut refs = Vec::new();
        for (client, target, files) in kinds {
            upload_kind(client, target, files, &mut refs).await?;
        }
        Ok(UploadedAttachments { references: refs })
    }

    // Community messages cannot carry audio so it is sent as a doc
    fn audio_list(&mut self) -> &mut Vec<PendingFile> {
        match self.credentials {
            Credentials::Single(_) => &mut self.pending.audios,
            Credentials::CommunityMessages { .. } => {
                debug!("audio added for a community message, uploading as doc");
                &mut self.pending.docs
            }
        }
    }
}

async fn upload_kind(
    client: &Client,
    target: UploadTarget,
    files: &[PendingFile],
    refs: &mut Vec<AttachmentReference>,
) -> Result<(), VkError> {
    if files.is_empty() {
        return Ok(());
    }
    let paths: Vec<&Path> = files.iter().map(|f| f.path.as_path()).collect();
    let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
    let (uploaded, err) = client.upload_all(&target, &paths, &names).await.into_parts();
    if let Some(err) = err {
        return Err(err);
    }
    refs.extend(uploaded);
    Ok(())
}

/// References produced by [`AttachmentsUploader::upload`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadedAttachments {
    references: Vec<AttachmentReference>,
}

impl UploadedAttachments {
    pub fn references(&self) -> &[AttachmentReference] {
        &self.references
    }

    pub fn into_references(self) -> Vec<AttachmentReference> {
        self.references
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Comma separated list for the `attachment` parameter of posts and messages
    pub fn attachment_list(&self) -> String {
        join_references(&self.references)
    }
}

impl fmt::Display for UploadedAttachments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.attachment_list())
    }
}
