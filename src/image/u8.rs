use crate::error::ExtractionError;
use super::traits::{ImageView, ImageViewMut};

/// Borrowed 8-bit grayscale view.
#[derive(Clone, Copy, Debug)]
pub struct ImageU8<'a> {
    pub w: usize,
    pub h: usize,
    pub stride: usize, // bytes between rows
    pub data: &'a [u8],
}

impl<'a> ImageU8<'a> {
    /// Strided view; `None` when `stride < w` or `data` cannot hold the
    /// last row.
    pub fn new(w: usize, h: usize, stride: usize, data: &'a [u8]) -> Option<Self> {
        let view = Self {
            w,
            h,
            stride,
            data,
        };
        view.is_consistent().then_some(view)
    }

    /// Tightly packed view; `None` when `data` is shorter than `w * h`.
    pub fn packed(w: usize, h: usize, data: &'a [u8]) -> Option<Self> {
        Self::new(w, h, w, data)
    }

    /// `self` when [`Self::is_consistent`], else `MalformedView`.
    pub fn checked(self) -> Result<Self, ExtractionError> {
        if self.is_consistent() {
            Ok(self)
        } else {
            Err(ExtractionError::MalformedView {
                width: self.w,
                height: self.h,
                stride: self.stride,
                len: self.data.len(),
            })
        }
    }

    /// True when every row `0..h` lies inside `data`. Views assembled from
    /// the public fields should be checked before use.
    pub fn is_consistent(&self) -> bool {
        if self.stride < self.w {
            return false;
        }
        if self.w == 0 || self.h == 0 {
            return true;
        }
        (self.h - 1)
            .checked_mul(self.stride)
            .and_then(|n| n.checked_add(self.w))
            .is_some_and(|needed| needed <= self.data.len())
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.stride + x]
    }

    /// Copy the view into an owned, tightly packed buffer.
    pub fn to_owned_image(&self) -> GrayImageU8 {
        let mut data = Vec::with_capacity(self.w * self.h);
        for row in self.rows() {
            data.extend_from_slice(row);
        }
        GrayImageU8::new(self.w, self.h, data)
    }
}

impl<'a> ImageView for ImageU8<'a> {
    type Pixel = u8;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
}

/// Owned 8-bit grayscale image (stride == width).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImageU8 {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl GrayImageU8 {
    /// Wrap raw row-major bytes; `None` unless `data` holds exactly
    /// `width * height` bytes.
    pub fn try_new(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        (width.checked_mul(height) == Some(data.len())).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap raw row-major bytes produced internally with the right length.
    ///
    /// A mismatched length is a bug: it panics in debug builds and is
    /// padded or truncated in release builds.
    pub fn new(width: usize, height: usize, mut data: Vec<u8>) -> Self {
        debug_assert_eq!(
            data.len(),
            width * height,
            "GrayImageU8::new: buffer length does not match {width}x{height}"
        );
        data.resize(width * height, 0);
        Self {
            width,
            height,
            data,
        }
    }

    /// Image filled with a single intensity.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self::new(width, height, vec![value; width * height])
    }

    /// Build an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(width, height, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.width + x] = v;
    }

    /// Borrow as a read-only [`ImageU8`] view.
    pub fn as_view(&self) -> ImageU8<'_> {
        ImageU8 {
            w: self.width,
            h: self.height,
            stride: self.width,
            data: &self.data,
        }
    }

    /// Copy a rectangular region; the rectangle is clipped to the image.
    pub fn crop(&self, x0: usize, y0: usize, w: usize, h: usize) -> Self {
        let x1 = (x0 + w).min(self.width);
        let y1 = (y0 + h).min(self.height);
        let (x0, y0) = (x0.min(x1), y0.min(y1));
        Self::from_fn(x1 - x0, y1 - y0, |x, y| self.get(x0 + x, y0 + y))
    }

    /// Left-right mirror.
    pub fn flip_horizontal(&self) -> Self {
        Self::from_fn(self.width, self.height, |x, y| {
            self.get(self.width - 1 - x, y)
        })
    }
}

impl ImageView for GrayImageU8 {
    type Pixel = u8;

    #[inline]
    fn width(&self) -> usize {
        self.width
    }
    #[inline]
    fn height(&self) -> usize {
        self.height
    }
    #[inline]
    fn stride(&self) -> usize {
        self.width
    }
    #[inline]
    fn row(&self, y: usize) -> &[u8] {
        let start = y * self.width;
        &self.data[start..start + self.width]
    }
}

impl ImageViewMut for GrayImageU8 {
    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.width;
        &mut self.data[start..start + self.width]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_is_clipped_to_bounds() {
        let img = GrayImageU8::from_fn(10, 8, |x, y| (x + 10 * y) as u8);
        let c = img.crop(6, 5, 10, 10);
        assert_eq!((c.width(), c.height()), (4, 3));
        assert_eq!(c.get(0, 0), 56);
        assert_eq!(c.get(3, 2), 79);
    }

    #[test]
    fn strided_view_copies_only_visible_columns() {
        let data: Vec<u8> = (0..12).collect();
        let view = ImageU8 {
            w: 3,
            h: 2,
            stride: 6,
            data: &data,
        };
        let owned = view.to_owned_image();
        assert_eq!(owned.data(), &[0, 1, 2, 6, 7, 8]);
    }

    #[test]
    fn checked_views_reject_short_buffers() {
        let data = [0u8; 10];
        assert!(ImageU8::new(3, 2, 6, &data).is_some());
        assert!(ImageU8::new(3, 2, 8, &data).is_none());
        assert!(ImageU8::new(4, 1, 3, &data).is_none());
        assert!(ImageU8::packed(5, 2, &data).is_some());
        assert!(ImageU8::packed(5, 3, &data).is_none());

        let forged = ImageU8 {
            w: 4,
            h: 4,
            stride: 4,
            data: &data,
        };
        assert!(!forged.is_consistent());
    }

    #[test]
    fn owned_buffer_length_must_match() {
        assert!(GrayImageU8::try_new(2, 2, vec![1, 2, 3]).is_none());
        assert!(GrayImageU8::try_new(2, 2, vec![1, 2, 3, 4, 5]).is_none());
        let img = GrayImageU8::try_new(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(img.get(1, 1), 4);
    }
}
