/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v5::errors::VkError;
use crate::v5::{AssetKind, AttachmentReference, Client};
use log::{debug, warn};
use serde_json::Value;

/// Deletes uploaded assets again given their attachment references.
///
/// Typical use is removing docs a community message upload left in the community's doc
/// section once the message went out.
#[derive(Debug, Clone)]
pub struct Unlinker {
    client: Client,
    kinds: Vec<AssetKind>,
}

impl Unlinker {
    /// Unlinks any kind, references are matched as photo, doc, video then audio
    pub fn new(client: Client) -> Self {
        Self {
            client,
            kinds: AssetKind::UNLINK_ORDER.to_vec(),
        }
    }

    /// Only unlinks the given kinds, matched in the given order. References of other kinds
    /// are ignored.
    pub fn with_kinds(client: Client, kinds: &[AssetKind]) -> Self {
        let mut unique = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if !unique.contains(kind) {
                unique.push(*kind);
            }
        }
        Self {
            client,
            kinds: unique,
        }
    }

    /// Deletes the asset behind a single reference.
    ///
    /// Returns `Ok(false)` without calling the API when the reference is not of a handled kind.
    /// References carrying an access key suffix (`photo1_2_key`) are ignored the same way.
    pub async fn unlink(&self, reference: &str) -> Result<bool, VkError> {
        let Some(parsed) = AttachmentReference::parse_with(reference, &self.kinds) else {
            debug!("ignoring unknown attachment reference: {}", reference);
            return Ok(false);
        };
        self.delete(&parsed).await?;
        Ok(true)
    }

    /// Deletes the asset behind an already parsed reference
    pub async fn delete(&self, reference: &AttachmentReference) -> Result<(), VkError> {
        let owner_id = reference.owner_id.to_string();
        let asset_id = reference.asset_id.to_string();
        let params = [
            ("owner_id", owner_id.as_str()),
            (reference.kind.id_param(), asset_id.as_str()),
        ];
        self.client
            .call::<Value, _, _>(reference.kind.delete_method(), &params)
            .await?;
        Ok(())
    }

    /// Unlinks every reference of a comma separated list, returning each outcome in order
    pub async fn unlink_each(&self, list: &str) -> Vec<(String, Result<bool, VkError>)> {
        let mut outcomes = Vec::new();
        for token in list.split(',') {
            let res = self.unlink(token).await;
            outcomes.push((token.to_string(), res));
        }
        outcomes
    }

    /// Unlinks every reference of a comma separated list.
    ///
    /// A failure does not stop the remaining references. Only the error of the last failed
    /// one is returned.
    pub async fn unlink_all(&self, list: &str) -> Result<(), VkError> {
        let mut last = Ok(());
        for (token, res) in self.unlink_each(list).await {
            if let Err(err) = res {
                warn!("unlinking {} failed: {}", token, err);
                last = Err(err);
            }
        }
        last
    }
}
