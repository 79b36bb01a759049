/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v5::errors::VkError;
use crate::v5::{
    AttachmentReference, Client, Registration, UploadConfirmation, UploadDestination, UploadTarget,
};
use log::{debug, warn};
use reqwest::multipart::Form;
use serde_json::Value;
use std::path::{Path, PathBuf};

impl Client {
    /// Runs the upload protocol once: fetch an upload url, POST the files, register them.
    ///
    /// At most the descriptor's batch ceiling of `paths` are sent, empty paths are skipped.
    /// `names` are the file names shown to the server, missing ones default to the base name
    /// of the path. Any failing step fails the whole batch.
    pub async fn upload_batch<P: AsRef<Path>>(
        &self,
        target: &UploadTarget,
        paths: &[P],
        names: &[String],
    ) -> Result<Registration, VkError> {
        let descriptor = target.descriptor();
        let mut params = target.params();
        let destination: UploadDestination =
            self.call(descriptor.destination_method, &params).await?;
        let names = sync_names(paths, names);

        let mut form = Form::new();
        let mut written = 0;
        for (path, name) in paths.iter().zip(&names).take(descriptor.batch_ceiling) {
            let path = path.as_ref();
            if path.as_os_str().is_empty() {
                continue;
            }
            written += 1;
            let part = descriptor
                .transfer
                .file_part(path, upload_file_name(name))
                .await?;
            form = form.part(descriptor.field(written), part);
        }
        debug!(
            "uploading {} file(s) via {}",
            written, descriptor.destination_method
        );

        let confirmation: UploadConfirmation = self
            .api_client()
            .post_multipart(&destination.upload_url, form)
            .await?;
        if let Some(err) = &confirmation.error {
            return Err(VkError::UploadRejected(err.clone()));
        }

        let response = match descriptor.registration_method {
            Some(method) => {
                params.extend(descriptor.save_params(&confirmation, &names)?);
                Some(self.call::<Value, _, _>(method, &params).await?)
            }
            None => None,
        };

        Ok(Registration {
            destination,
            confirmation,
            response,
        })
    }

    /// Uploads any number of files, split into as many batches as the target allows.
    ///
    /// A failed batch does not stop the ones after it. The report keeps the outcome of every
    /// batch, see [`BatchReport::into_parts`] for the references plus last error form.
    pub async fn upload_all<P: AsRef<Path>>(
        &self,
        target: &UploadTarget,
        paths: &[P],
        names: &[String],
    ) -> BatchReport {
        let descriptor = target.descriptor();
        let ceiling = descriptor.batch_ceiling.max(1);
        let names = sync_names(paths, names);

        let mut chunks = Vec::with_capacity(paths.len().div_ceil(ceiling));
        let batches = paths.chunks(ceiling).zip(names.chunks(ceiling));
        for (index, (paths, names)) in batches.enumerate() {
            let result = self
                .upload_batch(target, paths, names)
                .await
                .and_then(|registration| descriptor.format(&registration));
            if let Err(err) = &result {
                warn!(
                    "batch {} via {} failed: {}",
                    index, descriptor.destination_method, err
                );
            }
            chunks.push(ChunkOutcome {
                index,
                paths: paths.iter().map(|p| p.as_ref().to_path_buf()).collect(),
                result,
            });
        }
        BatchReport { chunks }
    }
}

/// Outcome of one batch of [`Client::upload_all`]
#[derive(Debug)]
pub struct ChunkOutcome {
    pub index: usize,
    pub paths: Vec<PathBuf>,
    pub result: Result<Vec<AttachmentReference>, VkError>,
}

/// Outcomes of every batch of [`Client::upload_all`], in upload order
#[derive(Debug, Default)]
pub struct BatchReport {
    chunks: Vec<ChunkOutcome>,
}

impl BatchReport {
    pub fn chunks(&self) -> &[ChunkOutcome] {
        &self.chunks
    }

    /// References of the batches that succeeded
    pub fn references(&self) -> Vec<AttachmentReference> {
        self.chunks
            .iter()
            .filter_map(|c| c.result.as_ref().ok())
            .flatten()
            .copied()
            .collect()
    }

    /// Error of the last batch that failed
    pub fn last_error(&self) -> Option<&VkError> {
        self.chunks.iter().rev().find_map(|c| c.result.as_ref().err())
    }

    pub fn is_complete(&self) -> bool {
        self.last_error().is_none()
    }

    /// Splits into the references of the succeeded batches and the error of the last failed
    /// one. Errors of earlier failed batches are dropped.
    pub fn into_parts(self) -> (Vec<AttachmentReference>, Option<VkError>) {
        let mut refs = Vec::new();
        let mut last_err = None;
        for chunk in self.chunks {
            match chunk.result {
                Ok(r) => refs.extend(r),
                Err(err) => last_err = Some(err),
            }
        }
        (refs, last_err)
    }
}

/// Returns exactly one name per path. Extra names are dropped, missing ones are the base
/// name of the path.
pub fn sync_names<P: AsRef<Path>>(paths: &[P], names: &[String]) -> Vec<String> {
    paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            names
                .get(i)
                .cloned()
                .unwrap_or_else(|| base_name(path.as_ref()))
        })
        .collect()
}

pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// Upload servers refuse some file names without an extension
fn upload_file_name(name: &str) -> String {
    if Path::new(name).extension().is_none() {
        format!("{name}.dat")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_names_come_from_paths() {
        let paths = ["/tmp/a/one.jpg", "/tmp/b/two.png", "three.gif"];
        let names = sync_names(&paths, &["first.jpg".to_string()]);
        assert_eq!(names, ["first.jpg", "two.png", "three.gif"]);
    }

    #[test]
    fn extra_names_are_dropped() {
        let names = sync_names(
            &["x.jpg"],
            &["a.jpg".to_string(), "b.jpg".to_string(), "c.jpg".to_string()],
        );
        assert_eq!(names, ["a.jpg"]);
        assert!(sync_names::<&str>(&[], &["a".to_string()]).is_empty());
    }

    #[test]
    fn extensionless_names_get_dat() {
        assert_eq!(upload_file_name("notes"), "notes.dat");
        assert_eq!(upload_file_name("notes.txt"), "notes.txt");
        assert_eq!(upload_file_name("archive.tar.gz"), "archive.tar.gz");
    }

    #[test]
    fn report_keeps_only_last_error_when_split() {
        use crate::v5::AssetKind;
        let r = |id| AttachmentReference::new(AssetKind::Photo, 1, id);
        let report = BatchReport {
            chunks: vec![
                ChunkOutcome {
                    index: 0,
                    paths: vec![],
                    result: Err(VkError::ApiResponse(100, "first".into())),
                },
                ChunkOutcome {
                    index: 1,
                    paths: vec![],
                    result: Ok(vec![r(1), r(2)]),
                },
                ChunkOutcome {
                    index: 2,
                    paths: vec![],
                    result: Err(VkError::ApiResponse(101, "second".into())),
                },
                ChunkOutcome {
                    index: 3,
                    paths: vec![],
                    result: Ok(vec![r(3)]),
                },
            ],
        };
        assert_eq!(report.references(), [r(1), r(2), r(3)]);
        assert!(matches!(report.last_error(), Some(VkError::ApiResponse(101, _))));
        assert!(!report.is_complete());

        let (refs, err) = report.into_parts();
        assert_eq!(refs, [r(1), r(2), r(3)]);
        assert!(matches!(err, Some(VkError::ApiResponse(101, _))));
    }
}
