//! Quantized surface normal codes.
//!
//! A code names the cube face hit by the gradient direction plus the two
//! remaining components quantized on that face. The last code of each family
//! stands for "no direction".

use crate::math::Vector3;

/// The two normal code families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalCodec {
    /// 4 bits per component.
    G,
    /// 6 bits per component.
    Bg,
}

/// Number of G codes, including the null code.
pub const G_CODES: usize = (6 << 8) + 1;
/// Number of BG codes, including the null code.
pub const BG_CODES: usize = (6 << 12) + 1;

/// Mask applied to G codes written into shells that use small normal codes.
pub const SMALL_CODE_MASK: u16 = 0xffee;

impl NormalCodec {
    /// Codec used by a TSE layout.
    #[must_use]
    pub fn for_kind(kind: super::Kind) -> Self {
        if kind.uses_bg_codes() {
            Self::Bg
        } else {
            Self::G
        }
    }

    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            Self::G => 4,
            Self::Bg => 6,
        }
    }

    #[must_use]
    pub fn norm(self) -> u16 {
        1 << (self.bits() - 1)
    }

    /// Total number of codes; the last one is the null code.
    #[must_use]
    pub fn codes(self) -> usize {
        match self {
            Self::G => G_CODES,
            Self::Bg => BG_CODES,
        }
    }

    /// The null code, used for a zero vector.
    #[must_use]
    pub fn null_code(self) -> u16 {
        6 << (2 * self.bits())
    }

    /// Encodes the direction of `g`.
    #[must_use]
    pub fn encode(self, g: &Vector3) -> u16 {
        let (ax, ay, az) = (g.x.abs(), g.y.abs(), g.z.abs());
        let (axis, max): (u16, f64) = if ax >= ay && ax >= az {
            (0, ax)
        } else if ay >= az {
            (1, ay)
        } else {
            (2, az)
        };
        if max == 0.0 {
            return self.null_code();
        }
        let face = if g[usize::from(axis)] < 0.0 { axis } else { axis + 3 };
        let (i2, i3) = match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        let b = self.bits();
        (face << (2 * b)) | (self.quantize(-g[i2] / max) << b) | self.quantize(-g[i3] / max)
    }

    /// Decodes a code into an unnormalized direction. The null code decodes to zero.
    #[must_use]
    pub fn decode(self, code: u16) -> Vector3 {
        let b = self.bits();
        let mask = (1u16 << b) - 1;
        let face = code >> (2 * b);
        let norm = f64::from(self.norm());
        let n2 = norm - (f64::from((code >> b) & mask) + 0.5);
        let n3 = norm - (f64::from(code & mask) + 0.5);
        match face {
            0 => Vector3::new(-norm, n2, n3),
            1 => Vector3::new(n2, -norm, n3),
            2 => Vector3::new(n2, n3, -norm),
            3 => Vector3::new(norm, n2, n3),
            4 => Vector3::new(n2, norm, n3),
            5 => Vector3::new(n2, n3, norm),
            _ => Vector3::zeros(),
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn quantize(self, u: f64) -> u16 {
        let norm = f64::from(self.norm());
        let v = (u * norm + norm).max(0.0) as u16;
        v.min(2 * self.norm() - 1)
    }
}

/// Gradient direction implied by a TSE's neighbor flags.
#[must_use]
pub fn neighbor_gradient(neighbors: u16) -> Vector3 {
    use super::tse::{NX, NY, NZ, PX, PY, PZ};
    let axis = |p: u16, n: u16| {
        f64::from(u8::from(neighbors & p != 0)) - f64::from(u8::from(neighbors & n != 0))
    };
    Vector3::new(axis(PX, NX), axis(PY, NY), axis(PZ, NZ))
}
