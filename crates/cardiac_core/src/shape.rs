//! Image tensor shape metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Number of color channels the network consumes.
pub const INPUT_CHANNELS: usize = 3;

/// Length of the shorter image edge after resizing.
pub const RESIZE_SIZE: u32 = 256;

/// Side of the square center crop fed to the network.
pub const CROP_SIZE: u32 = 224;

/// Shape of an image tensor in `(B, C, H, W)` order.
///
/// # Example
///
/// ```rust
/// use cardiac_core::ImageShape;
///
/// let shape = ImageShape::network_input();
/// assert_eq!(shape.as_array(), [1, 3, 224, 224]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageShape {
    batch: usize,
    channels: usize,
    height: usize,
    width: usize,
}

impl ImageShape {
    /// Create a new shape.
    #[must_use]
    pub const fn new(batch: usize, channels: usize, height: usize, width: usize) -> Self {
        Self {
            batch,
            channels,
            height,
            width,
        }
    }

    /// The canonical single-image network input, `(1, 3, 224, 224)`.
    #[must_use]
    pub const fn network_input() -> Self {
        Self::new(1, INPUT_CHANNELS, CROP_SIZE as usize, CROP_SIZE as usize)
    }

    /// Create a shape from a slice of exactly four dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidShape`] if `dims` does not have four entries.
    pub fn from_dims(dims: &[usize]) -> Result<Self> {
        match dims {
            &[b, c, h, w] => Ok(Self::new(b, c, h, w)),
            _ => Err(CoreError::InvalidShape {
                expected: "(B, C, H, W)".to_string(),
                got: format!("{dims:?}"),
            }),
        }
    }

    /// Batch size.
    #[must_use]
    pub const fn batch(&self) -> usize {
        self.batch
    }

    /// Channel count.
    #[must_use]
    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Total number of elements.
    #[must_use]
    pub const fn numel(&self) -> usize {
        self.batch * self.channels * self.height * self.width
    }

    /// Dimensions as an array, ready for tensor constructors.
    #[must_use]
    pub const fn as_array(&self) -> [usize; 4] {
        [self.batch, self.channels, self.height, self.width]
    }
}

impl fmt::Display for ImageShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.batch, self.channels, self.height, self.width
        )
    }
}
