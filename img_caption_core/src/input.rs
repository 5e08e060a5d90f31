use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::error::ClassifyError;
use crate::orientation::{ImageOrientation, OrientationTag};

/// A raster image together with the orientation it was captured in.
#[derive(Debug, Clone)]
pub struct Image {
    pixels: DynamicImage,
    orientation: ImageOrientation,
}

impl Image {
    pub fn new(pixels: DynamicImage, orientation: ImageOrientation) -> Self {
        Self {
            pixels,
            orientation,
        }
    }

    pub fn from_raw_orientation(pixels: DynamicImage, raw: u32) -> Result<Self, ClassifyError> {
        Ok(Self::new(pixels, ImageOrientation::try_from(raw)?))
    }

    pub fn open<T: AsRef<Path>>(path: T, orientation: ImageOrientation) -> anyhow::Result<Self> {
        let pixels = image::ImageReader::open(path)?.decode()?;
        Ok(Self::new(pixels, orientation))
    }

    pub fn orientation(&self) -> ImageOrientation {
        self.orientation
    }

    /// Decodes into the buffer an engine consumes, tagged with the engine-facing orientation.
    pub fn to_pixel_buffer(&self) -> Result<PixelBuffer, ClassifyError> {
        let (width, height) = (self.pixels.width(), self.pixels.height());
        if width == 0 || height == 0 {
            return Err(ClassifyError::ImageConversion(format!(
                "image has no pixels ({width}x{height})"
            )));
        }
        Ok(PixelBuffer {
            width,
            height,
            data: self.pixels.to_rgb8().into_raw(),
            orientation: self.orientation.tag(),
        })
    }
}

/// Raw RGB8 pixels, row-major, still in capture orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub orientation: OrientationTag,
}

impl PixelBuffer {
    /// Rebuilds the buffer as an image turned the right way up.
    pub fn to_upright_image(&self) -> Result<DynamicImage, ClassifyError> {
        let rgb = RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            ClassifyError::ImageConversion(format!(
                "{} bytes do not fill a {}x{} RGB buffer",
                self.data.len(),
                self.width,
                self.height
            ))
        })?;
        Ok(self.orientation.upright(DynamicImage::ImageRgb8(rgb)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_carries_tag_and_rgb_bytes() {
        let image = Image::new(DynamicImage::new_rgba8(3, 2), ImageOrientation::Left);
        let buffer = image.to_pixel_buffer().unwrap();
        assert_eq!((buffer.width, buffer.height), (3, 2));
        assert_eq!(buffer.data.len(), 3 * 2 * 3);
        assert_eq!(buffer.orientation, OrientationTag::Left);

        let upright = buffer.to_upright_image().unwrap();
        assert_eq!((upright.width(), upright.height()), (2, 3));
    }

    #[test]
    fn empty_image_fails_conversion() {
        let image = Image::new(DynamicImage::new_rgb8(0, 0), ImageOrientation::Up);
        assert!(matches!(
            image.to_pixel_buffer(),
            Err(ClassifyError::ImageConversion(_))
        ));
    }

    #[test]
    fn short_buffer_fails_to_rebuild() {
        let buffer = PixelBuffer {
            width: 2,
            height: 2,
            data: vec![0; 5],
            orientation: OrientationTag::Up,
        };
        assert!(buffer.to_upright_image().is_err());
    }

    #[test]
    fn raw_orientation_is_validated() {
        let pixels = DynamicImage::new_rgb8(1, 1);
        assert!(Image::from_raw_orientation(pixels.clone(), 3).is_ok());
        assert_eq!(
            Image::from_raw_orientation(pixels, 42).unwrap_err(),
            ClassifyError::InvalidOrientation(42)
        );
    }
}
