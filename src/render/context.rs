use crate::math::{axis_angles_to_matrix, Matrix3, Vector3};

use super::Z_BUFFER_LEVELS;

/// View and material settings shared by every projection of a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererContext {
    /// Side of the composite frame in pixels.
    pub image_size: usize,
    /// Frame pixels per millimetre.
    pub scale: f64,
    /// Icon pixels per millimetre, before the icon reduction.
    pub icon_scale: f64,
    /// Z-buffer levels per millimetre.
    pub depth_scale: f64,
    /// View orientation angles.
    pub glob_angle: [f64; 3],
    pub anti_alias: bool,
    /// Perspective strength, 0 (parallel) to 100.
    pub perspective: f64,
    pub ambient: [f64; 3],
    pub fade_edge: bool,
    /// Per-channel weight of reflected light.
    pub surface_factor: [f64; 3],
    pub material_opacity: [f64; 4],
    pub material_rgb: [[f64; 3]; 4],
    pub surface_strength: f64,
    pub emission_power: f64,
    pub surf_pct_power: f64,
    pub maximum_intensity_projection: bool,
    /// Unit normal of the reflecting plane, in the plan frame.
    pub plane_normal: Vector3,
    /// Distance of the reflecting plane from the origin along its normal.
    pub plane_displacement: f64,
}

impl Default for RendererContext {
    fn default() -> Self {
        Self::for_viewport(512, 1.0)
    }
}

impl RendererContext {
    /// Context for a square frame of `image_size` pixels at `scale` pixels per millimetre.
    ///
    /// The depth range is set so the frame's width in depth fills the z-buffer.
    #[must_use]
    pub fn for_viewport(image_size: usize, scale: f64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let span = image_size.max(1) as f64 / scale;
        Self {
            image_size,
            scale,
            icon_scale: scale,
            depth_scale: f64::from(Z_BUFFER_LEVELS - 2) / span,
            glob_angle: [0.0; 3],
            anti_alias: false,
            perspective: 0.0,
            ambient: [0.2; 3],
            fade_edge: false,
            surface_factor: [1.0; 3],
            material_opacity: [1.0, 0.5, 0.25, 0.1],
            material_rgb: [
                [1.0, 1.0, 1.0],
                [1.0, 0.2, 0.2],
                [0.2, 1.0, 0.2],
                [0.2, 0.2, 1.0],
            ],
            surface_strength: 1.0,
            emission_power: 1.0,
            surf_pct_power: 1.0,
            maximum_intensity_projection: false,
            plane_normal: Vector3::z(),
            plane_displacement: 0.0,
        }
    }

    #[must_use]
    pub fn with_angles(mut self, glob_angle: [f64; 3]) -> Self {
        self.glob_angle = glob_angle;
        self
    }

    #[must_use]
    pub fn with_anti_alias(mut self, on: bool) -> Self {
        self.anti_alias = on;
        self
    }

    #[must_use]
    pub fn with_perspective(mut self, perspective: f64) -> Self {
        self.perspective = perspective.clamp(0.0, 100.0);
        self
    }

    #[must_use]
    pub fn with_depth_scale(mut self, depth_scale: f64) -> Self {
        self.depth_scale = depth_scale;
        self
    }

    #[must_use]
    pub fn with_fade_edge(mut self, on: bool) -> Self {
        self.fade_edge = on;
        self
    }

    #[must_use]
    pub fn with_plane(mut self, normal: Vector3, displacement: f64) -> Self {
        self.plane_normal = normal.normalize();
        self.plane_displacement = displacement;
        self
    }

    /// The view rotation.
    #[must_use]
    pub fn view_rotation(&self) -> Matrix3 {
        axis_angles_to_matrix(self.glob_angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_depth_fills_buffer() {
        let ctx = RendererContext::for_viewport(256, 2.0);
        assert!((ctx.depth_scale * 128.0 - f64::from(Z_BUFFER_LEVELS - 2)).abs() < 1e-6);
        assert_eq!(ctx.view_rotation(), Matrix3::identity());
    }

    #[test]
    fn builders_chain() {
        let ctx = RendererContext::default()
            .with_anti_alias(true)
            .with_perspective(150.0)
            .with_plane(Vector3::new(0.0, 0.0, 2.0), 3.0);
        assert!(ctx.anti_alias);
        assert!((ctx.perspective - 100.0).abs() < f64::EPSILON);
        assert!((ctx.plane_normal.z - 1.0).abs() < 1e-12);
    }
}
