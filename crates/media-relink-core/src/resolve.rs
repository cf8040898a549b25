//! Reference resolver.
//!
//! Decides whether a legacy asset has been linked to a media-library entry and,
//! if so, which library, instance and container it maps to. The outcome keeps
//! the three ways resolution can fail apart so they can be reported
//! separately:
//!
//! | Outcome | Cause |
//! |---------|-------|
//! | [`UnresolvedReason::NoMapping`] | the asset has no `media` field |
//! | [`UnresolvedReason::MalformedToken`] | `media._ref` is not a `media-library:<lib>:<id>` string |
//! | [`UnresolvedReason::RegistryLookupFailed`] | the instance or its container is missing |
//!
//! Transport failures talking to the registry are returned as `Err`.

use std::fmt;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::models::LegacyAsset;
use crate::reference::{MediaLibraryRef, Reference, TokenError};
use crate::store::MediaRegistry;

/// Identifiers of the media-library entry a legacy asset maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMedia {
    pub library_id: String,
    pub instance_id: String,
    pub container_id: String,
}

impl ResolvedMedia {
    /// Replacement for the `asset` field: the versioned instance.
    pub fn asset_reference(&self) -> Reference {
        Reference::media_library(&self.library_id, &self.instance_id)
    }

    /// Replacement for the sibling `media` field: the stable container.
    pub fn media_reference(&self) -> Reference {
        Reference::media_library(&self.library_id, &self.container_id)
    }
}

/// Which registry lookup came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingEntry {
    Instance,
    Container,
}

/// Why a legacy asset could not be mapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    NoMapping,
    MalformedToken {
        token: String,
        error: TokenError,
    },
    RegistryLookupFailed {
        library_id: String,
        instance_id: String,
        missing: MissingEntry,
    },
}

impl UnresolvedReason {
    /// Stable machine-readable code for reports.
    pub fn code(&self) -> &'static str {
        match self {
            UnresolvedReason::NoMapping => "no_mapping",
            UnresolvedReason::MalformedToken { .. } => "malformed_token",
            UnresolvedReason::RegistryLookupFailed { .. } => "registry_lookup_failed",
        }
    }
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::NoMapping => f.write_str("no media mapping"),
            UnresolvedReason::MalformedToken { token, error } => {
                write!(f, "malformed media token '{}': {}", token, error)
            }
            UnresolvedReason::RegistryLookupFailed {
                library_id,
                instance_id,
                missing,
            } => {
                let what = match missing {
                    MissingEntry::Instance => "instance",
                    MissingEntry::Container => "container",
                };
                write!(
                    f,
                    "registry lookup failed: no {} for '{}' in library '{}'",
                    what, instance_id, library_id
                )
            }
        }
    }
}

/// Result of resolving one legacy asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedMedia),
    Unresolved(UnresolvedReason),
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Parse a `media` token, wrapping failures as [`UnresolvedReason::MalformedToken`].
pub fn parse_media_token(token: &str) -> Result<MediaLibraryRef, UnresolvedReason> {
    MediaLibraryRef::parse(token).map_err(|error| UnresolvedReason::MalformedToken {
        token: token.to_string(),
        error,
    })
}

/// Resolve `asset` against the media library registry.
///
/// # Errors
///
/// Returns an error only when a registry query itself fails; every
/// "not mappable" outcome is an `Ok(Resolution::Unresolved(_))`.
pub async fn resolve_asset(registry: &dyn MediaRegistry, asset: &LegacyAsset) -> Result<Resolution> {
    let media = match &asset.media {
        Some(media) => media,
        None => return Ok(Resolution::Unresolved(UnresolvedReason::NoMapping)),
    };

    let token = match media.get("_ref").and_then(Value::as_str) {
        Some(token) => parse_media_token(token),
        None => Err(UnresolvedReason::MalformedToken {
            token: media.to_string(),
            error: TokenError::NotAString,
        }),
    };
    let token = match token {
        Ok(token) => token,
        Err(reason) => return Ok(Resolution::Unresolved(reason)),
    };

    let lookup_failed = |missing| {
        Resolution::Unresolved(UnresolvedReason::RegistryLookupFailed {
            library_id: token.library_id.clone(),
            instance_id: token.document_id.clone(),
            missing,
        })
    };

    let instance_id = match registry
        .find_instance(&token.library_id, &token.document_id)
        .await?
    {
        Some(id) => id,
        None => return Ok(lookup_failed(MissingEntry::Instance)),
    };

    let container_id = match registry
        .find_container(&token.library_id, &instance_id)
        .await?
    {
        Some(id) => id,
        None => return Ok(lookup_failed(MissingEntry::Container)),
    };

    Ok(Resolution::Resolved(ResolvedMedia {
        library_id: token.library_id.clone(),
        instance_id,
        container_id,
    }))
}
