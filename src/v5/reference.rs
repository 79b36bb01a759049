/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v5::AssetKind;
use crate::v5::errors::VkError;
use std::fmt;
use std::str::FromStr;

/// Identifies an uploaded asset in the form posts and messages expect: `<kind><owner_id>_<asset_id>`.
///
/// Community owned assets have a negative owner id (`doc-42_7`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentReference {
    pub kind: AssetKind,
    pub owner_id: i64,
    pub asset_id: i64,
}

impl AttachmentReference {
    pub fn new(kind: AssetKind, owner_id: i64, asset_id: i64) -> Self {
        Self {
            kind,
            owner_id,
            asset_id,
        }
    }

    /// Parses a reference trying only the prefixes of `kinds`, in the given order.
    ///
    /// Returns `None` when no prefix matches or the ids are not numbers.
    pub fn parse_with(s: &str, kinds: &[AssetKind]) -> Option<Self> {
        let s = s.trim();
        kinds.iter().find_map(|&kind| {
            let (owner, id) = s.strip_prefix(kind.prefix())?.split_once('_')?;
            Some(Self::new(kind, owner.parse().ok()?, id.parse().ok()?))
        })
    }
}

impl fmt::Display for AttachmentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}_{}", self.kind.prefix(), self.owner_id, self.asset_id)
    }
}

impl FromStr for AttachmentReference {
    type Err = VkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with(s, &AssetKind::UNLINK_ORDER)
            .ok_or_else(|| VkError::MalformedReference(s.to_string()))
    }
}

/// Joins references into the comma separated list the `attachments` parameter takes
pub fn join_references(refs: &[AttachmentReference]) -> String {
    refs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
