//! Lookup tables that turn surface values and material fractions into colors.
//!
//! The tables depend only on a handful of context fields. They are rebuilt
//! when those fields change, compared by value.

use crate::render::context::RendererContext;
use crate::render::raster::V_MAX_SHADE;

/// The context fields the mixing tables depend on.
#[derive(Debug, Clone, PartialEq)]
pub struct MixingInputs {
    pub ambient: [f64; 3],
    pub surface_factor: [f64; 3],
    pub material_opacity: [f64; 4],
    pub material_rgb: [[f64; 3]; 4],
    pub surface_strength: f64,
    pub emission_power: f64,
    pub surf_pct_power: f64,
    pub maximum_intensity_projection: bool,
}

impl MixingInputs {
    #[must_use]
    pub fn from_context(ctx: &RendererContext) -> Self {
        Self {
            ambient: ctx.ambient,
            surface_factor: ctx.surface_factor,
            material_opacity: ctx.material_opacity,
            material_rgb: ctx.material_rgb,
            surface_strength: ctx.surface_strength,
            emission_power: ctx.emission_power,
            surf_pct_power: ctx.surf_pct_power,
            maximum_intensity_projection: ctx.maximum_intensity_projection,
        }
    }
}

/// Precomputed mixing tables.
#[derive(Debug, Clone, PartialEq)]
pub struct MixingTables {
    /// `(i / 255) ^ surf_pct_power`.
    pub surf_pct: [f64; 256],
    /// Opacity of material 0 scaled by `surf_pct`.
    pub surf_opacity: [u8; 256],
    pub material_opacity: [f64; 4],
    /// Reflected color per material and channel.
    pub material_rgb: [[f64; 3]; 4],
    /// Emitted color per material and channel, in surface value units.
    pub emission: [[u16; 3]; 4],
    /// `(1 - opacity[m]) * i`.
    pub one_minus_opacity_times: [[u8; 256]; 4],
    /// Maximum intensity projection brightness per intensity.
    pub mip_lut: [u16; 256],
    pub maximum_intensity_projection: bool,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_u16(v: f64, max: u16) -> u16 {
    v.round().clamp(0.0, f64::from(max)) as u16
}

impl MixingTables {
    #[must_use]
    pub fn build(inputs: &MixingInputs) -> Self {
        let max = f64::from(V_MAX_SHADE);
        let mut surf_pct = [0.0; 256];
        let mut surf_opacity = [0u8; 256];
        let mut mip_lut = [0u16; 256];
        for i in 0..256 {
            #[allow(clippy::cast_precision_loss)]
            let frac = i as f64 / 255.0;
            surf_pct[i] = frac.powf(inputs.surf_pct_power);
            surf_opacity[i] = round_u8(255.0 * inputs.material_opacity[0] * surf_pct[i]);
            mip_lut[i] = round_u16(max * inputs.surface_strength * frac, V_MAX_SHADE);
        }

        let mut material_rgb = [[0.0; 3]; 4];
        let mut emission = [[0u16; 3]; 4];
        let mut one_minus_opacity_times = [[0u8; 256]; 4];
        for m in 0..4 {
            let opacity = inputs.material_opacity[m];
            let glow = opacity.powf(inputs.emission_power);
            for c in 0..3 {
                let rgb = inputs.material_rgb[m][c];
                material_rgb[m][c] = rgb * inputs.surface_factor[c] * inputs.surface_strength;
                emission[m][c] = round_u16(max * inputs.ambient[c] * rgb * glow, V_MAX_SHADE);
            }
            for (i, v) in one_minus_opacity_times[m].iter_mut().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let level = i as f64;
                *v = round_u8((1.0 - opacity) * level);
            }
        }

        Self {
            surf_pct,
            surf_opacity,
            material_opacity: inputs.material_opacity,
            material_rgb,
            emission,
            one_minus_opacity_times,
            mip_lut,
            maximum_intensity_projection: inputs.maximum_intensity_projection,
        }
    }

    /// Mean emission of material 0, for gray rasters.
    #[must_use]
    pub fn gray_emission(&self) -> f64 {
        self.emission[0].iter().map(|&v| f64::from(v)).sum::<f64>() / 3.0
    }

    /// Mean reflected color of material 0, for gray rasters.
    #[must_use]
    pub fn gray_surface(&self) -> f64 {
        self.material_rgb[0].iter().sum::<f64>() / 3.0
    }
}

/// Mixing tables plus the inputs they were built from.
#[derive(Debug, Clone, Default)]
pub struct MixingCache {
    built: Option<(MixingInputs, Box<MixingTables>)>,
    builds: usize,
}

impl MixingCache {
    /// Returns tables for `ctx`, rebuilding them only if the relevant fields changed.
    pub fn refresh(&mut self, ctx: &RendererContext) -> &MixingTables {
        let inputs = MixingInputs::from_context(ctx);
        if self.built.as_ref().is_some_and(|(old, _)| *old != inputs) {
            self.built = None;
        }
        let builds = &mut self.builds;
        let (_, tables) = self.built.get_or_insert_with(|| {
            *builds += 1;
            tracing::trace!(builds = *builds, "rebuilding mixing tables");
            let tables = Box::new(MixingTables::build(&inputs));
            (inputs, tables)
        });
        tables
    }

    /// How many times the tables have been built.
    #[must_use]
    pub fn builds(&self) -> usize {
        self.builds
    }

    /// Tables from the last refresh, if any.
    #[must_use]
    pub fn tables(&self) -> Option<&MixingTables> {
        self.built.as_ref().map(|(_, t)| t.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_from_defaults() {
        let ctx = RendererContext::default();
        let t = MixingTables::build(&MixingInputs::from_context(&ctx));
        assert!((t.surf_pct[255] - 1.0).abs() < 1e-12);
        assert!(t.surf_pct[0].abs() < 1e-12);
        assert_eq!(t.mip_lut[0], 0);
        assert_eq!(t.mip_lut[255], V_MAX_SHADE);
        assert_eq!(t.one_minus_opacity_times[0][200], 0);
        assert_eq!(t.surf_opacity[255], 255);
    }

    #[test]
    fn emission_and_opacity_formulas() {
        let inputs = MixingInputs {
            ambient: [0.5, 0.0, 1.0],
            surface_factor: [1.0, 0.5, 1.0],
            material_opacity: [0.5, 1.0, 0.25, 0.0],
            material_rgb: [[1.0, 1.0, 1.0]; 4],
            surface_strength: 2.0,
            emission_power: 1.0,
            surf_pct_power: 2.0,
            maximum_intensity_projection: false,
        };
        let t = MixingTables::build(&inputs);
        assert_eq!(t.emission[0], [16383, 0, 32767]);
        assert_eq!(t.emission[3], [0, 0, 0]);
        assert!((t.material_rgb[1][1] - 1.0).abs() < 1e-12);
        assert_eq!(t.one_minus_opacity_times[2][100], 75);
        assert_eq!(t.surf_opacity[255], 128);
        assert!((t.surf_pct[51] - 0.04).abs() < 1e-12);
        assert_eq!(t.mip_lut[200], V_MAX_SHADE);
    }

    #[test]
    fn cache_rebuilds_on_change_only() {
        let mut ctx = RendererContext::default();
        let mut cache = MixingCache::default();
        assert!(cache.tables().is_none());
        let first = cache.refresh(&ctx).clone();
        assert_eq!(cache.refresh(&ctx), &first);
        assert_eq!(cache.builds(), 1);

        // View and geometry fields do not feed the tables.
        ctx.glob_angle = [0.3, 1.2, 0.0];
        ctx.scale = 7.0;
        ctx.fade_edge = true;
        assert_eq!(cache.refresh(&ctx), &first);
        assert_eq!(cache.builds(), 1);

        ctx.surf_pct_power = 3.0;
        assert_ne!(cache.refresh(&ctx).surf_pct, first.surf_pct);
        assert_eq!(cache.builds(), 2);
        ctx.material_opacity[1] = 0.9;
        cache.refresh(&ctx);
        assert_eq!(cache.builds(), 3);
    }
}
