use crate::cancel::{should_stop, Interrupt, Outcome};
use crate::cut::plane::VoxelPlane;
use crate::error::{OperationError, Result, StoreError};
use crate::math::axis_angles_to_matrix;
use crate::shading::angle::angle_shades;
use crate::shell::{Appearance, Kind, NormalCodec, ShellData, ShellObjectId, ShellStore};

use super::patch::{needs_patch, Patch};
use super::raster::{Mode, RasterImage};
use super::transform::{buffer_scale, location_in_pixels, select_mode, Pose, StructureTransform};
use super::walk::{walk, WalkParams};
use super::Renderer;

/// Projects an object's main or icon data into its appearance's raster.
pub struct Project {
    object: ShellObjectId,
    icon: bool,
}

impl Project {
    /// Creates a new `Project` operation for the main data of `object`.
    #[must_use]
    pub fn new(object: ShellObjectId) -> Self {
        Self {
            object,
            icon: false,
        }
    }

    /// Projects the icon data instead of the main data.
    #[must_use]
    pub fn icon(mut self, icon: bool) -> Self {
        self.icon = icon;
        self
    }

    /// Executes the projection.
    ///
    /// On success the new raster becomes the object's valid image and the
    /// mode it was projected in is returned. If `interrupt` fires, the valid
    /// image is left as it was.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is missing, has no icon when one is
    /// requested, holds on-disk data, or a raster cannot be allocated.
    pub fn execute(
        &self,
        store: &mut ShellStore,
        renderer: &mut Renderer,
        interrupt: &mut dyn Interrupt,
    ) -> Result<Outcome<Mode>> {
        let object = store.get_mut(self.object)?;
        let data = if self.icon {
            object
                .icon
                .as_ref()
                .ok_or_else(|| OperationError::InvalidInput("object has no icon data".into()))?
        } else {
            &object.main
        };
        let job = Job {
            data,
            icon: self.icon,
            pose: Pose {
                rotation: axis_angles_to_matrix(object.angle),
                displacement: object.displacement,
            },
            diameter: object.diameter,
            clip: None,
        };
        job.run(&mut object.appearance, renderer, interrupt)
    }
}

/// One projection of one appearance.
pub(crate) struct Job<'a> {
    pub data: &'a ShellData,
    pub icon: bool,
    pub pose: Pose,
    pub diameter: f64,
    pub clip: Option<VoxelPlane>,
}

impl Job<'_> {
    pub(crate) fn run(
        &self,
        appearance: &mut Appearance,
        renderer: &mut Renderer,
        interrupt: &mut dyn Interrupt,
    ) -> Result<Outcome<Mode>> {
        if !self.data.is_in_memory() {
            return Err(StoreError::NotInMemory.into());
        }
        let kind = self.data.classify();
        if !appearance.on {
            tracing::trace!(?kind, "skipping hidden object");
            return Ok(Outcome::Done(select_mode(self.icon, appearance.opacity, &renderer.context)));
        }
        // The object's opacity stands in for the first material for this call only.
        let scoped;
        let ctx = if kind.uses_bg_codes() && (appearance.opacity - 0.5).abs() > f64::EPSILON {
            let mut c = renderer.context.clone();
            c.material_opacity[0] = appearance.opacity;
            scoped = c;
            &scoped
        } else {
            &renderer.context
        };
        let fade_edge = ctx.fade_edge && !self.icon;
        let mode = select_mode(self.icon, appearance.opacity, ctx);
        let show_back = kind.uses_bg_codes() && appearance.opacity < 1.0;
        let perspective = if mode == Mode::Icon { 0.0 } else { ctx.perspective };
        let mip = ctx.maximum_intensity_projection && !kind.is_binary();
        debug_assert!(
            !(ctx.maximum_intensity_projection && kind.is_binary()),
            "maximum intensity projection needs non-binary data"
        );

        if should_stop(interrupt) {
            return Ok(Outcome::Cancelled);
        }
        let bs = buffer_scale(mode, ctx);
        let mut xf = StructureTransform::new(self.data, &self.pose, ctx, bs);
        if should_stop(interrupt) {
            return Ok(Outcome::Cancelled);
        }

        let lut = *appearance.shading.lut();
        let patch = needs_patch(&xf.matrix).then(|| Patch::from_projection(&xf.matrix));
        let pad = kind != Kind::BinaryA && (fade_edge || patch.is_some());
        let size = xf.raster_size(self.diameter, mode, pad);

        let image = appearance.image_mut(self.icon);
        let mut raster = match image.take_scratch() {
            Some(mut r) if r.fits(kind, size) => {
                r.reset(kind);
                r
            }
            old => match RasterImage::try_new(kind, size) {
                Ok(r) => r,
                Err(e) => {
                    if let Some(old) = old {
                        image.return_scratch(old);
                    }
                    return Err(e);
                }
            },
        };
        raster.mode = mode;
        raster.image_location = xf.locate(size, mode, perspective);
        let center_loc = location_in_pixels(raster.image_location, mode);
        if should_stop(interrupt) {
            image.return_scratch(raster);
            return Ok(Outcome::Cancelled);
        }

        let rotation = ctx.view_rotation() * self.pose.rotation;
        let codec = NormalCodec::for_kind(kind);
        let shades = match angle_shades(&rotation, &lut, codec, show_back, fade_edge) {
            Ok(s) => s,
            Err(e) => {
                image.return_scratch(raster);
                return Err(e);
            }
        };
        let tables = if kind.is_binary() {
            None
        } else {
            Some(renderer.mixing.refresh(ctx))
        };

        let params = WalkParams {
            transform: &xf,
            perspective,
            center_loc,
            patch: patch.as_ref(),
            shades: &shades,
            tables,
            mip,
            clip: self.clip.as_ref(),
        };
        match walk(self.data, &params, &mut raster, interrupt) {
            Ok(true) => {}
            Ok(false) => {
                image.return_scratch(raster);
                return Ok(Outcome::Cancelled);
            }
            Err(e) => {
                image.return_scratch(raster);
                return Err(e);
            }
        }
        tracing::debug!(size, ?mode, ?kind, "projected object");
        image.commit(raster);
        Ok(Outcome::Done(mode))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::cancel::{FireOnPoll, Never};
    use crate::render::raster::{Pixels, OBJECT_IMAGE_BACKGROUND};
    use crate::render::RendererContext;
    use crate::shell::{fixtures, ShellObject};

    fn scene(kind: Kind) -> (ShellStore, ShellObjectId, Renderer) {
        let mut store = ShellStore::new();
        let id = store.add(ShellObject::new(fixtures::cube(kind, 3)));
        let ctx = RendererContext::for_viewport(64, 4.0).with_depth_scale(1000.0);
        (store, id, Renderer::new(ctx))
    }

    fn valid(store: &ShellStore, id: ShellObjectId) -> RasterImage {
        store.get(id).unwrap().appearance.image.valid().unwrap().clone()
    }

    #[test]
    fn binary_cube_projects_its_front_face() {
        fixtures::init_tracing();
        let (mut store, id, mut renderer) = scene(Kind::BinaryA);
        let out = Project::new(id).execute(&mut store, &mut renderer, &mut Never).unwrap();
        assert_eq!(out, Outcome::Done(Mode::PixelReplicate));
        let raster = valid(&store, id);
        let Pixels::Binary(p) = raster.pixels() else {
            panic!("binary raster expected");
        };
        let drawn: Vec<u8> = p.iter().copied().filter(|&v| v != OBJECT_IMAGE_BACKGROUND).collect();
        assert!(!drawn.is_empty());
        assert!(drawn.iter().all(|&v| v <= 125));
        // The center pixel sees the near face at slice 0.
        let mid = raster.size() / 2;
        assert!(raster.z_buffer()[mid * raster.size() + mid] > 0);
    }

    #[test]
    fn empty_shell_projects_to_background() {
        let mut store = ShellStore::new();
        let data = fixtures::shell_from_voxels(Kind::BinaryA, [3, 3, 3], |_, _, _| false);
        let mut object = ShellObject::new(data);
        object.diameter = 5.0;
        let id = store.add(object);
        let mut renderer = Renderer::new(RendererContext::for_viewport(64, 4.0));
        let out = Project::new(id).execute(&mut store, &mut renderer, &mut Never).unwrap();
        assert!(!out.is_cancelled());
        let raster = valid(&store, id);
        assert!(raster.is_background());
        assert!(matches!(raster.pixels(), Pixels::Binary(p) if p.iter().all(|&v| v == OBJECT_IMAGE_BACKGROUND)));
    }

    #[test]
    fn reprojection_is_identical() {
        let (mut store, id, mut renderer) = scene(Kind::Gradient);
        renderer.context.glob_angle = [0.4, 0.3, 0.5];
        Project::new(id).execute(&mut store, &mut renderer, &mut Never).unwrap();
        let first = valid(&store, id);
        Project::new(id).execute(&mut store, &mut renderer, &mut Never).unwrap();
        assert_eq!(first, valid(&store, id));
    }

    #[test]
    fn cancellation_keeps_the_valid_image() {
        let (mut store, id, mut renderer) = scene(Kind::BinaryA);
        Project::new(id).execute(&mut store, &mut renderer, &mut Never).unwrap();
        let before = valid(&store, id);
        renderer.context.glob_angle = [1.0, 0.0, 0.7];
        // Checkpoints: start, after transform, after location, then one per slice.
        for fire_at in 1..=6 {
            let mut interrupt = FireOnPoll::new(fire_at);
            let out = Project::new(id).execute(&mut store, &mut renderer, &mut interrupt).unwrap();
            assert!(out.is_cancelled(), "poll {fire_at}");
            assert_eq!(valid(&store, id), before);
        }
        let out = Project::new(id)
            .execute(&mut store, &mut renderer, &mut FireOnPoll::new(7))
            .unwrap();
        assert!(!out.is_cancelled());
        assert_ne!(valid(&store, id), before);
    }

    #[test]
    fn non_binary_kinds_fill_side_buffers() {
        for kind in [Kind::Gradient, Kind::Percent, Kind::Direct] {
            let (mut store, id, mut renderer) = scene(kind);
            Project::new(id).execute(&mut store, &mut renderer, &mut Never).unwrap();
            let raster = valid(&store, id);
            let opacity = raster.opacity().unwrap();
            assert!(opacity.iter().any(|&o| o > 0), "{kind:?}");
            let likelihood = raster.likelihood().unwrap();
            assert!(likelihood.iter().any(|&l| l == 0xff), "{kind:?}");
        }
    }

    #[test]
    fn maximum_intensity_projection_uses_mip_lut() {
        let (mut store, id, mut renderer) = scene(Kind::Gradient);
        renderer.context.maximum_intensity_projection = true;
        Project::new(id).execute(&mut store, &mut renderer, &mut Never).unwrap();
        let expected = renderer.mixing_tables().mip_lut[0x80];
        let raster = valid(&store, id);
        let Pixels::Gray(p) = raster.pixels() else {
            panic!("gray raster expected");
        };
        assert!(p.iter().any(|&v| v == expected));
        assert!(p.iter().all(|&v| v == expected || v == crate::render::raster::V_OBJECT_IMAGE_BACKGROUND));
    }

    #[test]
    fn anti_alias_and_icon_modes() {
        let (mut store, id, mut renderer) = scene(Kind::BinaryB);
        renderer.context.anti_alias = true;
        let out = Project::new(id).execute(&mut store, &mut renderer, &mut Never).unwrap();
        assert_eq!(out, Outcome::Done(Mode::AntiAlias));
        assert_eq!(valid(&store, id).size() % 2, 0);
        assert!(Project::new(id).icon(true).execute(&mut store, &mut renderer, &mut Never).is_err());
        store.get_mut(id).unwrap().icon = Some(fixtures::cube(Kind::BinaryB, 2));
        let out = Project::new(id).icon(true).execute(&mut store, &mut renderer, &mut Never).unwrap();
        assert_eq!(out, Outcome::Done(Mode::Icon));
    }

    #[test]
    fn object_opacity_does_not_leak_into_the_context() {
        let (mut store, id, mut renderer) = scene(Kind::BinaryB);
        store.get_mut(id).unwrap().appearance.opacity = 0.3;
        let before = renderer.context.clone();
        Project::new(id).execute(&mut store, &mut renderer, &mut Never).unwrap();
        assert_eq!(renderer.context, before);

        let gradient = store.add(ShellObject::new(fixtures::cube(Kind::Gradient, 3)));
        Project::new(gradient).execute(&mut store, &mut renderer, &mut Never).unwrap();
        assert_relative_eq!(renderer.mixing_tables().material_opacity[0], 1.0);
    }

    #[test]
    fn hidden_objects_are_not_drawn() {
        fixtures::init_tracing();
        let (mut store, id, mut renderer) = scene(Kind::BinaryA);
        store.get_mut(id).unwrap().appearance.on = false;
        let out = Project::new(id).execute(&mut store, &mut renderer, &mut Never).unwrap();
        assert!(!out.is_cancelled());
        assert!(store.get(id).unwrap().appearance.image.valid().is_none());

        store.get_mut(id).unwrap().appearance.on = true;
        Project::new(id).execute(&mut store, &mut renderer, &mut Never).unwrap();
        let before = valid(&store, id);
        store.get_mut(id).unwrap().appearance.on = false;
        renderer.context.glob_angle = [0.5, 0.2, 0.0];
        Project::new(id).execute(&mut store, &mut renderer, &mut Never).unwrap();
        assert_eq!(valid(&store, id), before);
    }

    #[test]
    fn icons_ignore_fade_edge() {
        let (mut store, id, mut renderer) = scene(Kind::BinaryB);
        store.get_mut(id).unwrap().icon = Some(fixtures::cube(Kind::BinaryB, 2));
        let icon = |store: &ShellStore| store.get(id).unwrap().appearance.icon_image.valid().unwrap().clone();

        Project::new(id).icon(true).execute(&mut store, &mut renderer, &mut Never).unwrap();
        let plain = icon(&store);
        renderer.context.fade_edge = true;
        Project::new(id).icon(true).execute(&mut store, &mut renderer, &mut Never).unwrap();
        assert_eq!(icon(&store), plain);
    }
}
