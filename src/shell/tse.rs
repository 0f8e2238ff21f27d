//! Packed boundary voxels (TSEs) and their neighbor flags.

/// Neighbor inside at `+x`. In a row it also means the columns up to the next TSE are interior.
pub const PX: u16 = 0x8000;
/// Neighbor inside at `+y` (next row).
pub const PY: u16 = 0x4000;
/// Neighbor inside at `+z` (next slice).
pub const PZ: u16 = 0x2000;
/// Neighbor inside at `-x`.
pub const NX: u16 = 0x1000;
/// Neighbor inside at `-y`.
pub const NY: u16 = 0x0800;
/// Neighbor inside at `-z`.
pub const NZ: u16 = 0x0400;

/// Union of all six neighbor flags.
pub const ALL_NEIGHBORS: u16 = PX | PY | PZ | NX | NY | NZ;
/// Column bits of word 0.
pub const XMASK: u16 = !ALL_NEIGHBORS;

/// Layout of the TSE words, derived from the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Two words, 10-bit column, G normal code.
    BinaryA,
    /// Two words, 11-bit column split across both words, BG normal code.
    BinaryB,
    /// Thickened shell; stored like [`Kind::BinaryB`].
    TShell,
    /// Three words; gradient magnitude and likelihood in word 2.
    Gradient,
    /// Three words; material percentages in word 1 plus the gradient payload.
    Percent,
    /// Three words; density and likelihood in word 2.
    Direct,
}

impl Kind {
    /// Number of `u16` words per TSE.
    #[must_use]
    pub fn words(self) -> usize {
        match self {
            Self::BinaryA | Self::BinaryB | Self::TShell => 2,
            Self::Gradient | Self::Percent | Self::Direct => 3,
        }
    }

    /// Binary kinds render to 8-bit rasters without opacity.
    #[must_use]
    pub fn is_binary(self) -> bool {
        matches!(self, Self::BinaryA | Self::BinaryB | Self::TShell)
    }

    /// Kinds whose normals are 6-bit BG codes.
    #[must_use]
    pub fn uses_bg_codes(self) -> bool {
        matches!(self, Self::BinaryB | Self::TShell)
    }

    /// Raster units per pixel for non-binary kinds (1 gray or 3 RGB).
    #[must_use]
    pub fn pixel_units(self) -> usize {
        match self {
            Self::Percent | Self::Direct => 3,
            _ => 1,
        }
    }

    fn split_column(self) -> bool {
        self.uses_bg_codes()
    }
}

/// A single decoded boundary voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tse {
    kind: Kind,
    words: [u16; 3],
}

impl Tse {
    /// Reads one TSE from the start of `words`.
    ///
    /// `words` must hold at least `kind.words()` entries.
    #[must_use]
    pub fn from_words(kind: Kind, words: &[u16]) -> Self {
        let mut w = [0u16; 3];
        let n = kind.words();
        w[..n].copy_from_slice(&words[..n]);
        Self { kind, words: w }
    }

    /// Builds a TSE from its fields. Payload words start at zero.
    #[must_use]
    pub fn new(kind: Kind, column: u16, neighbors: u16, normal_code: u16) -> Self {
        let neighbors = neighbors & ALL_NEIGHBORS;
        let words = if kind.split_column() {
            [
                neighbors | ((column >> 1) & XMASK),
                ((column & 1) << 15) | (normal_code & 0x7fff),
                0,
            ]
        } else {
            [neighbors | (column & XMASK), normal_code & 0x07ff, 0]
        };
        Self { kind, words }
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The raw words; only the first `kind.words()` are meaningful.
    #[must_use]
    pub fn words(&self) -> &[u16] {
        &self.words[..self.kind.words()]
    }

    #[must_use]
    pub fn neighbors(&self) -> u16 {
        self.words[0] & ALL_NEIGHBORS
    }

    #[must_use]
    pub fn column(&self) -> u16 {
        if self.kind.split_column() {
            ((self.words[0] & XMASK) << 1) | (self.words[1] >> 15)
        } else {
            self.words[0] & XMASK
        }
    }

    #[must_use]
    pub fn normal_code(&self) -> u16 {
        if self.kind.split_column() {
            self.words[1] & 0x7fff
        } else {
            self.words[1] & 0x07ff
        }
    }

    /// Percent field (`Percent` kind): material in the top two bits, fraction in sevenths below.
    #[must_use]
    pub fn percent(&self) -> u8 {
        #[allow(clippy::cast_possible_truncation)]
        let p = ((self.words[1] >> 11) & 0x1f) as u8;
        p
    }

    /// High byte of word 2: gradient magnitude, or density for `Direct`.
    #[must_use]
    pub fn magnitude(&self) -> u8 {
        self.words[2].to_be_bytes()[0]
    }

    /// Low byte of word 2.
    #[must_use]
    pub fn likelihood(&self) -> u8 {
        self.words[2].to_be_bytes()[1]
    }

    /// Replaces the neighbor flags, keeping everything else.
    #[must_use]
    pub fn with_neighbors(mut self, neighbors: u16) -> Self {
        self.words[0] = (self.words[0] & XMASK) | (neighbors & ALL_NEIGHBORS);
        self
    }

    /// Sets the percent field (`Percent` kind only).
    #[must_use]
    pub fn with_percent(mut self, percent: u8) -> Self {
        self.words[1] = (self.words[1] & 0x07ff) | ((u16::from(percent) & 0x1f) << 11);
        self
    }

    /// Sets word 2 from its two bytes.
    #[must_use]
    pub fn with_payload(mut self, magnitude: u8, likelihood: u8) -> Self {
        self.words[2] = u16::from_be_bytes([magnitude, likelihood]);
        self
    }

    /// Appends the TSE's words to `out`.
    pub fn write_to(&self, out: &mut Vec<u16>) {
        out.extend_from_slice(self.words());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_masks() {
        assert_eq!(ALL_NEIGHBORS, 0xfc00);
        assert_eq!(XMASK, 0x03ff);
    }

    #[test]
    fn binary_a_fields() {
        let t = Tse::from_words(Kind::BinaryA, &[PX | NY | 17, 0x0123]);
        assert_eq!(t.column(), 17);
        assert_eq!(t.neighbors(), PX | NY);
        assert_eq!(t.normal_code(), 0x0123);
        assert_eq!(t.words().len(), 2);
    }

    #[test]
    fn binary_b_column_uses_low_bit_in_word_one() {
        let t = Tse::new(Kind::BinaryB, 1023, NZ, 0x1abc);
        assert_eq!(t.words()[0], NZ | 511);
        assert_eq!(t.words()[1], 0x8000 | 0x1abc);
        assert_eq!(t.column(), 1023);
        assert_eq!(t.normal_code(), 0x1abc);
        let tshell = Tse::new(Kind::TShell, 1500, 0, 0);
        assert_eq!(tshell.column(), 1500);
    }

    #[test]
    fn percent_and_payload() {
        let t = Tse::new(Kind::Percent, 5, PX, 0x200)
            .with_percent(0b10_101)
            .with_payload(0x40, 0xff);
        assert_eq!(t.percent(), 0b10_101);
        assert_eq!(t.normal_code(), 0x200);
        assert_eq!(t.magnitude(), 0x40);
        assert_eq!(t.likelihood(), 0xff);
        assert_eq!(t.words()[2], 0x40ff);
    }

    #[test]
    fn with_neighbors_keeps_column() {
        let t = Tse::new(Kind::Gradient, 300, ALL_NEIGHBORS, 7).with_neighbors(PY);
        assert_eq!(t.column(), 300);
        assert_eq!(t.neighbors(), PY);
        let mut out = Vec::new();
        t.write_to(&mut out);
        assert_eq!(out.len(), 3);
    }
}
