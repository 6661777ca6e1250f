//! Image sizing for inserted pictures
//!
//! Sizes come from the file header via the `image` crate; scaling keeps
//! integer pixels, rounding half up.

use std::path::Path;

/// Pixel dimensions of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Read the natural size of an image file without decoding its pixels
    pub fn read(path: &Path) -> Result<Self, image::ImageError> {
        let (width, height) = image::image_dimensions(path)?;
        Ok(Self { width, height })
    }
}

/// `value * num / den`, rounded half up
fn scale_round(value: u32, num: u32, den: u32) -> u32 {
    if den == 0 {
        return value;
    }
    let scaled = (2 * u64::from(value) * u64::from(num) + u64::from(den)) / (2 * u64::from(den));
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// State of the "resize image" dialog
///
/// With `keep_ratio` on, editing one side recomputes the other from the
/// original aspect ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeForm {
    pub original: ImageSize,
    pub width: u32,
    pub height: u32,
    pub keep_ratio: bool,
}

impl ResizeForm {
    pub fn new(original: ImageSize) -> Self {
        Self {
            original,
            width: original.width,
            height: original.height,
            keep_ratio: true,
        }
    }

    /// Start from a size already applied to the image
    pub fn with_current(original: ImageSize, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::new(original)
        }
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width;
        if self.keep_ratio {
            self.height = scale_round(self.original.height, width, self.original.width);
        }
    }

    pub fn set_height(&mut self, height: u32) {
        self.height = height;
        if self.keep_ratio {
            self.width = scale_round(self.original.width, height, self.original.height);
        }
    }

    /// The size to apply, `None` when a side is zero
    pub fn result(&self) -> Option<ImageSize> {
        (self.width > 0 && self.height > 0).then(|| ImageSize::new(self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_ratio_scales_height_from_width() {
        let mut form = ResizeForm::new(ImageSize::new(400, 300));
        form.set_width(200);
        assert_eq!((form.width, form.height), (200, 150));
    }

    #[test]
    fn test_keep_ratio_rounds_half_up() {
        // 3 * 5 / 2 = 7.5
        let mut form = ResizeForm::new(ImageSize::new(2, 3));
        form.set_width(5);
        assert_eq!(form.height, 8);

        // 3 * 1 / 4 = 0.75, 3 * 2 / 4 = 1.5
        let mut form = ResizeForm::new(ImageSize::new(4, 3));
        form.set_width(1);
        assert_eq!(form.height, 1);
        form.set_width(2);
        assert_eq!(form.height, 2);
    }

    #[test]
    fn test_keep_ratio_scales_width_from_height() {
        let mut form = ResizeForm::new(ImageSize::new(640, 480));
        form.set_height(240);
        assert_eq!(form.width, 320);
    }

    #[test]
    fn test_free_resize_leaves_other_side() {
        let mut form = ResizeForm::new(ImageSize::new(640, 480));
        form.keep_ratio = false;
        form.set_width(100);
        assert_eq!((form.width, form.height), (100, 480));
    }

    #[test]
    fn test_zero_side_has_no_result() {
        let mut form = ResizeForm::new(ImageSize::new(10, 10));
        form.set_width(0);
        assert!(form.result().is_none());
    }

    #[test]
    fn test_read_size_of_written_png() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dot.png");
        image::RgbImage::new(7, 3).save(&path).unwrap();

        assert_eq!(ImageSize::read(&path).unwrap(), ImageSize::new(7, 3));
    }
}
