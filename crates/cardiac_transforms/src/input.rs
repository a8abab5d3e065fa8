//! The accepted image input forms.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::{Result, TransformError};

/// An image handed to the pipeline, in one of three forms.
///
/// Each form has its own decode strategy; all of them end as an 8-bit RGB
/// buffer regardless of the source color mode (grayscale, RGBA, palette,
/// 16-bit).
#[derive(Debug, Clone)]
pub enum ImageInput {
    /// An image file on disk.
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG, ...).
    Bytes(Vec<u8>),
    /// An image that has already been decoded.
    Decoded(DynamicImage),
}

impl ImageInput {
    /// Input read from a file path.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::Path(path.as_ref().to_path_buf())
    }

    /// Short name of the input form, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Path(_) => "path",
            Self::Bytes(_) => "bytes",
            Self::Decoded(_) => "decoded",
        }
    }

    /// Decode the input without changing its color mode.
    ///
    /// # Errors
    ///
    /// - [`TransformError::Io`] if a path cannot be read.
    /// - [`TransformError::UnsupportedInputType`] if a file is neither
    ///   recognisable by content nor by extension, or the format is not
    ///   supported by the decoder.
    /// - [`TransformError::ImageDecode`] if the data is not a valid image.
    pub fn decode(self) -> Result<DynamicImage> {
        match self {
            Self::Path(path) => {
                let bytes = std::fs::read(&path)?;
                let format = image::guess_format(&bytes)
                    .or_else(|_| ImageFormat::from_path(&path))
                    .map_err(|_| {
                        TransformError::UnsupportedInputType(format!(
                            "{} is not a recognised image file",
                            path.display()
                        ))
                    })?;
                Ok(image::load_from_memory_with_format(&bytes, format)?)
            }
            Self::Bytes(bytes) => {
                let format = image::guess_format(&bytes).map_err(|_| {
                    TransformError::ImageDecode(format!(
                        "{} bytes do not start with a known image signature",
                        bytes.len()
                    ))
                })?;
                Ok(image::load_from_memory_with_format(&bytes, format)?)
            }
            Self::Decoded(image) => Ok(image),
        }
    }

    /// Decode the input and force it to 3-channel 8-bit RGB.
    ///
    /// # Errors
    ///
    /// See [`ImageInput::decode`].
    pub fn into_rgb(self) -> Result<RgbImage> {
        match self.decode()? {
            DynamicImage::ImageRgb8(rgb) => Ok(rgb),
            other => Ok(other.to_rgb8()),
        }
    }
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ImageInput {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for ImageInput {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<DynamicImage> for ImageInput {
    fn from(image: DynamicImage) -> Self {
        Self::Decoded(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_grayscale_becomes_rgb() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 3, Luma([200])));
        let rgb = ImageInput::from(gray).into_rgb().unwrap();
        assert_eq!(rgb.dimensions(), (4, 3));
        assert_eq!(rgb.get_pixel(0, 0).0, [200, 200, 200]);
    }

    #[test]
    fn test_rgba_bytes_drop_alpha() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 0])));
        let rgb = ImageInput::from(png_bytes(&rgba)).into_rgb().unwrap();
        assert_eq!(rgb.get_pixel(1, 1).0, [10, 20, 30]);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = ImageInput::from(vec![1u8, 2, 3, 4, 5]).decode().unwrap_err();
        assert!(matches!(err, TransformError::ImageDecode(_)));
    }

    #[test]
    fn test_truncated_png_fails_to_decode() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(16, 16, Luma([7])));
        let mut bytes = png_bytes(&image);
        bytes.truncate(bytes.len() / 2);
        let err = ImageInput::from(bytes).decode().unwrap_err();
        assert!(matches!(err, TransformError::ImageDecode(_)));
    }

    #[test]
    fn test_unknown_file_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not an image").unwrap();
        let err = ImageInput::from_path(&path).decode().unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedInputType(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ImageInput::from_path("/definitely/not/here.png")
            .decode()
            .unwrap_err();
        assert!(matches!(err, TransformError::Io(_)));
    }

    #[test]
    fn test_path_input_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(5, 5, Luma([99])));
        std::fs::write(&path, png_bytes(&image)).unwrap();
        let rgb = ImageInput::from_path(&path).into_rgb().unwrap();
        assert_eq!(rgb.get_pixel(2, 2).0, [99, 99, 99]);
    }
}
