//! Error types for the label renderer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("payload does not fit in a QR code: {0}")]
  Encode(#[from] qrcode::types::QrError),

  #[error("PNG encoding failed: {0}")]
  Image(#[from] image::ImageError),
}

impl From<Error> for shelfmark_core::Error {
  fn from(e: Error) -> Self { Self::Label(e.to_string()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
