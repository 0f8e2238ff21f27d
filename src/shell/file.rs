//! The header shared by every shell loaded from, or derived from, one file.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::StoreError;

use super::tse::Kind;

/// Scene data type recorded in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    #[default]
    Shell0,
    /// Thickened shells.
    Shell2,
    /// Directly rendered images.
    Image0,
}

/// Measurement unit of the header coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    Km,
    M,
    Cm,
    #[default]
    Mm,
    Micron,
}

impl Unit {
    /// Size of one unit in millimetres.
    #[must_use]
    pub fn size_mm(self) -> f64 {
        match self {
            Self::Km => 1e6,
            Self::M => 1e3,
            Self::Cm => 10.0,
            Self::Mm => 1.0,
            Self::Micron => 1e-3,
        }
    }
}

/// Per-structure header fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructureInfo {
    pub domain: [f64; 12],
    pub min_coordinate: [f64; 3],
    pub max_coordinate: [f64; 3],
    pub smallest_y1: u16,
    pub largest_y1: u16,
    pub tse_count: usize,
    pub ntse: usize,
    pub volume: Option<f64>,
    pub surface_area: Option<f64>,
    pub parameter_vector: Vec<f64>,
}

/// File-level header.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellFile {
    pub data_type: DataType,
    pub unit: Unit,
    /// In-plane voxel size: column spacing then row spacing.
    pub xysize: [f64; 2],
    pub slice_locations: Vec<f64>,
    /// Bits per TSE.
    pub tse_bits: u32,
    /// Bit positions of the TSE fields.
    pub bit_fields: Vec<i16>,
    pub structures: Vec<StructureInfo>,
}

/// Header handle shared by reference count.
pub type SharedShellFile = Rc<RefCell<ShellFile>>;

const BINARY_FIELDS: [i16; 18] = [0, 5, 6, 15, 16, 15, 21, 23, 24, 27, 28, 31, 0, -1, 0, -1, 0, -1];

/// Bit field vector for a TSE layout.
#[must_use]
pub fn bit_fields_for(kind: Kind) -> Vec<i16> {
    let mut f = BINARY_FIELDS.to_vec();
    match kind {
        Kind::BinaryA => {}
        Kind::BinaryB | Kind::TShell => f[3] = 16,
        Kind::Gradient | Kind::Direct => {
            f[14] = 40;
            f[15] = 47;
        }
        Kind::Percent => {
            f[4] = 16;
            f[5] = 20;
            f[16] = 40;
            f[17] = 47;
        }
    }
    f
}

impl ShellFile {
    /// Creates a header for `kind` with one empty structure per entry of `structures`.
    #[must_use]
    pub fn new(kind: Kind, xysize: [f64; 2], slice_locations: Vec<f64>, structures: usize) -> Self {
        let data_type = match kind {
            Kind::TShell => DataType::Shell2,
            Kind::Direct => DataType::Image0,
            _ => DataType::Shell0,
        };
        Self {
            data_type,
            unit: Unit::Mm,
            xysize,
            slice_locations,
            tse_bits: if kind.is_binary() { 32 } else { 48 },
            bit_fields: bit_fields_for(kind),
            structures: vec![StructureInfo::default(); structures],
        }
    }

    /// Wraps the header for sharing.
    #[must_use]
    pub fn shared(self) -> SharedShellFile {
        Rc::new(RefCell::new(self))
    }

    fn field(&self, i: usize) -> i16 {
        self.bit_fields.get(i).copied().unwrap_or(-1)
    }

    /// TSE layout described by this header.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self.data_type {
            DataType::Shell2 => Kind::TShell,
            DataType::Image0 => Kind::Direct,
            DataType::Shell0 => {
                if self.field(5) > self.field(4) {
                    Kind::Percent
                } else if self.field(15) > self.field(14) {
                    Kind::Gradient
                } else if self.field(3) > 15 {
                    Kind::BinaryB
                } else {
                    Kind::BinaryA
                }
            }
        }
    }

    /// Shells written with the short normal field need their G codes masked.
    #[must_use]
    pub fn small_normal_codes(&self) -> bool {
        self.field(9) <= 26
    }

    /// Distance between consecutive slices, falling back to the column spacing.
    #[must_use]
    pub fn slice_spacing(&self) -> f64 {
        let n = self.slice_locations.len();
        if n <= 1 {
            return self.xysize[0];
        }
        #[allow(clippy::cast_precision_loss)]
        let steps = (n - 1) as f64;
        (self.slice_locations[n - 1] - self.slice_locations[0]) / steps
    }

    /// Checks that the bit layout is one this crate can decode.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidLayout` naming the first violated field.
    pub fn validate(&self) -> Result<(), StoreError> {
        let bad = |what: &str| Err(StoreError::InvalidLayout(what.into()));
        if self.field(1) != 5 || self.field(2) != 6 {
            return bad("neighbor flag fields");
        }
        if !matches!(self.field(3), 15 | 16) {
            return bad("column field");
        }
        let kind = self.kind();
        if kind == Kind::Percent
            && (self.field(4) != 16 || self.field(5) != 20 || self.field(16) != 40 || self.field(17) != 47)
        {
            return bad("percent fields");
        }
        if kind == Kind::Gradient && (self.field(14) != 40 || self.field(15) != 47) {
            return bad("gradient fields");
        }
        let bits = if kind.is_binary() { 32 } else { 48 };
        if self.tse_bits != bits {
            return bad("TSE width");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_classify_to_their_kind() {
        for kind in [
            Kind::BinaryA,
            Kind::BinaryB,
            Kind::TShell,
            Kind::Gradient,
            Kind::Percent,
            Kind::Direct,
        ] {
            let f = ShellFile::new(kind, [1.0, 1.0], vec![0.0], 1);
            assert_eq!(f.kind(), kind);
            assert!(f.validate().is_ok(), "{kind:?}");
            assert_eq!(f.kind(), f.clone().kind());
        }
    }

    #[test]
    fn validate_rejects_bad_layouts() {
        let mut f = ShellFile::new(Kind::BinaryA, [1.0, 1.0], vec![0.0], 1);
        f.tse_bits = 48;
        assert!(matches!(f.validate(), Err(StoreError::InvalidLayout(_))));

        let mut f = ShellFile::new(Kind::Gradient, [1.0, 1.0], vec![0.0], 1);
        f.bit_fields[14] = 39;
        assert!(f.validate().is_err());

        let mut f = ShellFile::new(Kind::BinaryA, [1.0, 1.0], vec![0.0], 1);
        f.bit_fields[3] = 14;
        assert!(f.validate().is_err());
    }

    #[test]
    fn slice_spacing_and_units() {
        let f = ShellFile::new(Kind::BinaryA, [0.5, 0.5], vec![10.0, 12.0, 14.0], 1);
        assert!((f.slice_spacing() - 2.0).abs() < 1e-12);
        let single = ShellFile::new(Kind::BinaryA, [0.5, 0.5], vec![3.0], 1);
        assert!((single.slice_spacing() - 0.5).abs() < 1e-12);
        assert!((Unit::Cm.size_mm() - 10.0).abs() < 1e-12);
        assert!((Unit::Micron.size_mm() - 1e-3).abs() < 1e-15);
    }

    #[test]
    fn small_codes_follow_field_nine() {
        let mut f = ShellFile::new(Kind::BinaryA, [1.0, 1.0], vec![0.0], 1);
        assert!(!f.small_normal_codes());
        f.bit_fields[9] = 26;
        assert!(f.small_normal_codes());
    }
}
