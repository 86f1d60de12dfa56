//! Label artifacts: scannable images bound to copies, and other named blobs.
//!
//! Rendering is pluggable: a store is handed an optional [`LabelRenderer`]
//! and writes no label at all when it has none.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Turns a label payload into image bytes.
pub trait LabelRenderer: Send + Sync {
  /// MIME type of the rendered bytes, e.g. `image/png`.
  fn media_type(&self) -> &'static str;

  /// File extension used when naming the artifact.
  fn extension(&self) -> &'static str;

  fn render(&self, payload: &str) -> Result<Vec<u8>>;
}

/// A stored binary blob: a copy label, a cover image, a profile photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
  pub name:         String,
  pub media_type:   String,
  #[serde(skip)]
  pub content:      Vec<u8>,
  /// SHA-256 hex digest of `content`.
  pub content_hash: String,
  pub created_at:   DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewArtifact {
  pub name:       String,
  pub media_type: String,
  pub content:    Vec<u8>,
}
