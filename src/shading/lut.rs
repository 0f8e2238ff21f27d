//! Shade lookup table indexed by the cosine of the surface angle.

/// Entries in a shade LUT: cosines -1..=1 in steps of 1/128.
pub const SHADE_LUT_SIZE: usize = 257;
/// Shade of a surface facing the viewer head on.
pub const MAX_ANGLE_SHADE: i32 = 3840;

/// Shade table of one object.
pub type ShadeLut = [i32; SHADE_LUT_SIZE];

fn stretch(c: f64, n: f64) -> f64 {
    (c.clamp(-1.0, 1.0).acos() / n).cos()
}

fn signed_pow(v: f64, e: f64) -> f64 {
    v.abs().powf(e).copysign(v)
}

/// Builds the shade table from the diffuse and specular parameters.
///
/// The divisors widen the lit cone: a divisor of 2 maps a grazing surface
/// to the shade a 45 degree one would get.
#[must_use]
pub fn compute_shade_lut(
    diffuse_exponent: f64,
    diffuse_divisor: f64,
    specular_fraction: f64,
    specular_exponent: f64,
    specular_divisor: f64,
) -> ShadeLut {
    let mut lut = [0; SHADE_LUT_SIZE];
    for (i, entry) in lut.iter_mut().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let cos = 2.0 * i as f64 / 256.0 - 1.0;
        let diffuse = signed_pow(stretch(cos, diffuse_divisor), diffuse_exponent);
        let specular = signed_pow(stretch(cos, specular_divisor), specular_exponent);
        let blend = (1.0 - specular_fraction) * diffuse + specular_fraction * specular;
        #[allow(clippy::cast_possible_truncation)]
        let j = (f64::from(MAX_ANGLE_SHADE) * blend) as i32;
        *entry = j.max(1);
    }
    lut
}

/// Shading parameters of an appearance plus their cached table.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectShading {
    diffuse_exponent: f64,
    diffuse_divisor: f64,
    specular_fraction: f64,
    specular_exponent: f64,
    specular_divisor: f64,
    lut: Option<Box<ShadeLut>>,
}

impl Default for ObjectShading {
    fn default() -> Self {
        Self {
            diffuse_exponent: 1.0,
            diffuse_divisor: 2.0,
            specular_fraction: 0.2,
            specular_exponent: 3.0,
            specular_divisor: 1.0,
            lut: None,
        }
    }
}

impl ObjectShading {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_diffuse_exponent(&mut self, v: f64) {
        self.diffuse_exponent = v;
        self.lut = None;
    }

    pub fn set_diffuse_divisor(&mut self, v: f64) {
        self.diffuse_divisor = v;
        self.lut = None;
    }

    pub fn set_specular_fraction(&mut self, v: f64) {
        self.specular_fraction = v;
        self.lut = None;
    }

    pub fn set_specular_exponent(&mut self, v: f64) {
        self.specular_exponent = v;
        self.lut = None;
    }

    pub fn set_specular_divisor(&mut self, v: f64) {
        self.specular_divisor = v;
        self.lut = None;
    }

    /// `(diffuse exponent, diffuse divisor, specular fraction, specular exponent, specular divisor)`.
    #[must_use]
    pub fn parameters(&self) -> (f64, f64, f64, f64, f64) {
        (
            self.diffuse_exponent,
            self.diffuse_divisor,
            self.specular_fraction,
            self.specular_exponent,
            self.specular_divisor,
        )
    }

    /// Whether the table is up to date with the parameters.
    #[must_use]
    pub fn is_computed(&self) -> bool {
        self.lut.is_some()
    }

    /// Returns the shade table, recomputing it only if a parameter changed.
    pub fn lut(&mut self) -> &ShadeLut {
        let (de, dn, sf, se, sn) = self.parameters();
        self.lut
            .get_or_insert_with(|| Box::new(compute_shade_lut(de, dn, sf, se, sn)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_shape() {
        let lut = ObjectShading::new().lut().to_owned();
        assert_eq!(lut[256], MAX_ANGLE_SHADE);
        // A back facing surface still gets the minimum shade.
        assert_eq!(lut[0], 1);
        assert!(lut.iter().all(|&v| v >= 1));
        assert!(lut.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn grazing_angle_with_divisor_two() {
        let lut = compute_shade_lut(1.0, 2.0, 0.0, 1.0, 1.0);
        // cos 0 stretched by 2 is cos 45 degrees.
        let expected = (3840.0 * std::f64::consts::FRAC_1_SQRT_2) as i32;
        assert_eq!(lut[128], expected);
    }

    #[test]
    fn setters_invalidate_the_cache() {
        let mut s = ObjectShading::new();
        let first = *s.lut();
        assert!(s.is_computed());
        s.set_specular_fraction(0.0);
        assert!(!s.is_computed());
        let second = *s.lut();
        assert_ne!(first, second);
        assert!(s.is_computed());
    }
}
