use crate::error::{try_filled, Result};
use crate::shell::Kind;

/// Background value of binary rasters.
pub const OBJECT_IMAGE_BACKGROUND: u8 = 126;
/// Reserved binary value for marks drawn by the caller.
pub const MARK_SHADE: u8 = 127;
/// Background value of non-binary rasters.
pub const V_OBJECT_IMAGE_BACKGROUND: u16 = 65534;
/// Largest non-binary surface value.
pub const V_MAX_SHADE: u16 = 65533;

/// How an object's raster relates to the composite frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Low resolution icon data.
    Icon,
    /// Rendered at the frame scale.
    #[default]
    OneToOne,
    /// Rendered at half scale and replicated by the compositor.
    PixelReplicate,
    /// Rendered at twice the scale and filtered down by the compositor.
    AntiAlias,
}

/// Pixel storage, by TSE kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pixels {
    /// One byte per pixel: shades 0..=125 plus the background.
    Binary(Vec<u8>),
    /// One gray value per pixel.
    Gray(Vec<u16>),
    /// Three values per pixel, RGB interleaved.
    Rgb(Vec<u16>),
}

/// Square raster with a depth buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    kind: Kind,
    size: usize,
    pixels: Pixels,
    z_buffer: Vec<i32>,
    opacity: Option<Vec<u8>>,
    likelihood: Option<Vec<u8>>,
    /// Mode of the last projection into this raster.
    pub mode: Mode,
    /// Offset of the raster's top left corner from the frame center.
    pub image_location: [i32; 2],
}

impl RasterImage {
    /// Allocates a cleared `size` x `size` raster for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::OutOfMemory` if a buffer cannot be allocated.
    pub fn try_new(kind: Kind, size: usize) -> Result<Self> {
        let n = size * size;
        let pixels = if kind.is_binary() {
            Pixels::Binary(try_filled("raster pixels", n, OBJECT_IMAGE_BACKGROUND)?)
        } else if kind.pixel_units() == 3 {
            Pixels::Rgb(try_filled("raster pixels", 3 * n, V_OBJECT_IMAGE_BACKGROUND)?)
        } else {
            Pixels::Gray(try_filled("raster pixels", n, V_OBJECT_IMAGE_BACKGROUND)?)
        };
        let (opacity, likelihood) = if kind.is_binary() {
            (None, None)
        } else {
            (
                Some(try_filled("opacity buffer", n, 0u8)?),
                Some(try_filled("likelihood buffer", n, 0u8)?),
            )
        };
        Ok(Self {
            kind,
            size,
            pixels,
            z_buffer: try_filled("z-buffer", n, 0)?,
            opacity,
            likelihood,
            mode: Mode::default(),
            image_location: [0, 0],
        })
    }

    /// Whether this raster can be reused for a projection of `kind` at `size`.
    #[must_use]
    pub fn fits(&self, kind: Kind, size: usize) -> bool {
        self.size == size
            && self.kind.is_binary() == kind.is_binary()
            && self.kind.pixel_units() == kind.pixel_units()
    }

    /// Clears a reused raster for a projection of `kind`.
    pub(crate) fn reset(&mut self, kind: Kind) {
        self.kind = kind;
        self.clear();
    }

    /// Resets every buffer to its background.
    pub fn clear(&mut self) {
        match &mut self.pixels {
            Pixels::Binary(p) => p.fill(OBJECT_IMAGE_BACKGROUND),
            Pixels::Gray(p) | Pixels::Rgb(p) => p.fill(V_OBJECT_IMAGE_BACKGROUND),
        }
        self.z_buffer.fill(0);
        for buf in [&mut self.opacity, &mut self.likelihood].into_iter().flatten() {
            buf.fill(0);
        }
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn pixels(&self) -> &Pixels {
        &self.pixels
    }

    #[must_use]
    pub fn z_buffer(&self) -> &[i32] {
        &self.z_buffer
    }

    #[must_use]
    pub fn opacity(&self) -> Option<&[u8]> {
        self.opacity.as_deref()
    }

    #[must_use]
    pub fn likelihood(&self) -> Option<&[u8]> {
        self.likelihood.as_deref()
    }

    /// True if no voxel has been written.
    #[must_use]
    pub fn is_background(&self) -> bool {
        self.z_buffer.iter().all(|&z| z == 0)
    }

    pub(crate) fn parts_mut(&mut self) -> RasterParts<'_> {
        RasterParts {
            size: self.size,
            pixels: &mut self.pixels,
            z_buffer: &mut self.z_buffer,
            opacity: self.opacity.as_deref_mut(),
            likelihood: self.likelihood.as_deref_mut(),
        }
    }
}

/// Split borrows of a raster's buffers for the voxel writers.
pub(crate) struct RasterParts<'a> {
    pub size: usize,
    pub pixels: &'a mut Pixels,
    pub z_buffer: &'a mut [i32],
    pub opacity: Option<&'a mut [u8]>,
    pub likelihood: Option<&'a mut [u8]>,
}

/// The committed raster of an object plus the buffer the next projection renders into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectImage {
    current: Option<RasterImage>,
    scratch: Option<RasterImage>,
}

impl ObjectImage {
    /// The last successfully projected raster.
    #[must_use]
    pub fn valid(&self) -> Option<&RasterImage> {
        self.current.as_ref()
    }

    /// Drops the committed raster, for example after the object moved.
    pub fn invalidate(&mut self) {
        if let Some(old) = self.current.take() {
            self.scratch.get_or_insert(old);
        }
    }

    pub(crate) fn take_scratch(&mut self) -> Option<RasterImage> {
        self.scratch.take()
    }

    /// Puts an unfinished raster back without committing it.
    pub(crate) fn return_scratch(&mut self, raster: RasterImage) {
        self.scratch = Some(raster);
    }

    /// Makes `raster` the valid image; the previous one becomes scratch.
    pub(crate) fn commit(&mut self, raster: RasterImage) {
        self.scratch = self.current.replace(raster);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn binary_raster_layout() {
        let r = RasterImage::try_new(Kind::BinaryA, 4).unwrap();
        assert!(matches!(r.pixels(), Pixels::Binary(p) if p.len() == 16 && p.iter().all(|&v| v == 126)));
        assert!(r.opacity().is_none());
        assert!(r.is_background());
    }

    #[test]
    fn percent_raster_is_rgb_with_side_buffers() {
        let r = RasterImage::try_new(Kind::Percent, 3).unwrap();
        assert!(matches!(r.pixels(), Pixels::Rgb(p) if p.len() == 27));
        assert_eq!(r.opacity().map(<[u8]>::len), Some(9));
        assert_eq!(r.likelihood().map(<[u8]>::len), Some(9));
        let g = RasterImage::try_new(Kind::Gradient, 3).unwrap();
        assert!(matches!(g.pixels(), Pixels::Gray(p) if p.len() == 9));
    }

    #[test]
    fn fits_by_layout_and_size() {
        let r = RasterImage::try_new(Kind::BinaryA, 8).unwrap();
        assert!(r.fits(Kind::BinaryB, 8));
        assert!(!r.fits(Kind::BinaryA, 10));
        assert!(!r.fits(Kind::Gradient, 8));
    }

    #[test]
    fn reset_takes_the_new_kind() {
        let mut r = RasterImage::try_new(Kind::BinaryA, 4).unwrap();
        r.parts_mut().z_buffer[3] = 5;
        r.reset(Kind::BinaryB);
        assert_eq!(r.kind(), Kind::BinaryB);
        assert_eq!(r, RasterImage::try_new(Kind::BinaryB, 4).unwrap());
    }

    #[test]
    fn clear_restores_background() {
        let mut r = RasterImage::try_new(Kind::Gradient, 2).unwrap();
        {
            let parts = r.parts_mut();
            parts.z_buffer[1] = 9;
            if let Pixels::Gray(p) = parts.pixels {
                p[1] = 7;
            }
        }
        assert!(!r.is_background());
        r.clear();
        assert_eq!(r, RasterImage::try_new(Kind::Gradient, 2).unwrap());
    }

    #[test]
    fn commit_swaps_buffers() {
        let mut image = ObjectImage::default();
        assert!(image.valid().is_none());
        image.commit(RasterImage::try_new(Kind::BinaryA, 2).unwrap());
        assert_eq!(image.valid().map(RasterImage::size), Some(2));
        image.commit(RasterImage::try_new(Kind::BinaryA, 4).unwrap());
        assert_eq!(image.valid().map(RasterImage::size), Some(4));
        assert_eq!(image.take_scratch().map(|r| r.size()), Some(2));
        image.invalidate();
        assert!(image.valid().is_none());
    }
}
