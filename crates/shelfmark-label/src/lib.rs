//! QR-code labels for Shelfmark copies.
//!
//! [`QrLabelRenderer`] encodes a copy's label payload as a QR code and emits a
//! grayscale PNG. Pure synchronous; no storage dependencies. Hand it to a
//! store (e.g. `SqliteStore::with_renderer`) to have labels written alongside
//! every copy save.
//!
//! # Quick start
//!
//! ```no_run
//! use shelfmark_label::QrLabelRenderer;
//!
//! let png = QrLabelRenderer::new()
//!   .render_png("Document: Golestan | Registration: 5 | Library: Central")
//!   .unwrap();
//! std::fs::write("label.png", png).unwrap();
//! ```

pub mod error;

use std::io::Cursor;

use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use shelfmark_core::label::LabelRenderer;

pub use error::{Error, Result};

pub const PNG_MEDIA_TYPE: &str = "image/png";

/// Default minimum edge of a rendered label, in pixels.
pub const DEFAULT_MIN_SIZE: u32 = 200;

/// Renders label payloads as QR-code PNGs.
#[derive(Debug, Clone, Copy)]
pub struct QrLabelRenderer {
  min_size:   u32,
  ec_level:   EcLevel,
  quiet_zone: bool,
}

impl Default for QrLabelRenderer {
  fn default() -> Self {
    Self { min_size: DEFAULT_MIN_SIZE, ec_level: EcLevel::M, quiet_zone: true }
  }
}

impl QrLabelRenderer {
  pub fn new() -> Self { Self::default() }

  /// The rendered image is at least `px` pixels on each side.
  pub fn with_min_size(self, px: u32) -> Self { Self { min_size: px, ..self } }

  pub fn with_ec_level(self, ec_level: EcLevel) -> Self { Self { ec_level, ..self } }

  /// Drop the white border around the symbol.
  pub fn without_quiet_zone(self) -> Self { Self { quiet_zone: false, ..self } }

  /// Encode `payload` (UTF-8) and return the PNG bytes.
  pub fn render_png(&self, payload: &str) -> Result<Vec<u8>> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), self.ec_level)?;
    let image = code
      .render::<Luma<u8>>()
      .min_dimensions(self.min_size, self.min_size)
      .quiet_zone(self.quiet_zone)
      .build();

    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png)?;
    Ok(png.into_inner())
  }
}

impl LabelRenderer for QrLabelRenderer {
  fn media_type(&self) -> &'static str { PNG_MEDIA_TYPE }

  fn extension(&self) -> &'static str { "png" }

  fn render(&self, payload: &str) -> shelfmark_core::Result<Vec<u8>> {
    Ok(self.render_png(payload)?)
  }
}
