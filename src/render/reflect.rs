use crate::cancel::{Interrupt, Outcome};
use crate::cut::plane::VoxelPlane;
use crate::error::{OperationError, Result};
use crate::math::axis_angles_to_matrix;
use crate::shell::{ShellObject, ShellObjectId, ShellStore};

use super::project::Job;
use super::raster::Mode;
use super::transform::Pose;
use super::Renderer;

/// Projects the mirror image of an object in the scene's reflecting plane.
///
/// The raster goes to the object's reflection appearance. Voxels on the far
/// side of the plane are not drawn.
pub struct ProjectReflection {
    object: ShellObjectId,
}

impl ProjectReflection {
    /// Creates a new `ProjectReflection` operation.
    #[must_use]
    pub fn new(object: ShellObjectId) -> Self {
        Self { object }
    }

    /// Executes the projection.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Unsupported` for non-binary data,
    /// `OperationError::InvalidInput` if the object has no reflection
    /// appearance or the plane normal is zero, and the errors of [`super::Project`].
    pub fn execute(
        &self,
        store: &mut ShellStore,
        renderer: &mut Renderer,
        interrupt: &mut dyn Interrupt,
    ) -> Result<Outcome<Mode>> {
        let ShellObject {
            main,
            reflection,
            angle,
            displacement,
            diameter,
            ..
        } = store.get_mut(self.object)?;
        let kind = main.classify();
        if !kind.is_binary() {
            return Err(OperationError::Unsupported(format!("reflections of {kind:?} shells")).into());
        }
        let appearance = reflection
            .as_mut()
            .ok_or_else(|| OperationError::InvalidInput("object has no reflection appearance".into()))?;
        let normal = renderer
            .context
            .plane_normal
            .try_normalize(1e-12)
            .ok_or_else(|| OperationError::InvalidInput("zero plane normal".into()))?;
        let d = renderer.context.plane_displacement;

        let pose = Pose {
            rotation: axis_angles_to_matrix(*angle),
            displacement: *displacement,
        };
        let job = Job {
            data: main,
            icon: false,
            pose: pose.mirrored(&normal, d),
            diameter: *diameter,
            clip: Some(VoxelPlane::new(main, &pose, &normal, d)),
        };
        tracing::debug!(?kind, d, "projecting reflection");
        job.run(appearance, renderer, interrupt)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cancel::Never;
    use crate::math::Vector3;
    use crate::render::raster::RasterImage;
    use crate::render::{RendererContext, MIDDLE_DEPTH};
    use crate::shell::{fixtures, Appearance, Kind};

    fn scene(kind: Kind, d: f64) -> (ShellStore, ShellObjectId, Renderer) {
        let mut store = ShellStore::new();
        let mut object = ShellObject::new(fixtures::cube(kind, 3));
        object.reflection = Some(Appearance::default());
        let id = store.add(object);
        let ctx = RendererContext::for_viewport(64, 4.0)
            .with_depth_scale(1000.0)
            .with_plane(Vector3::z(), d);
        (store, id, Renderer::new(ctx))
    }

    fn reflection(store: &ShellStore, id: ShellObjectId) -> RasterImage {
        let object = store.get(id).unwrap();
        object.reflection.as_ref().unwrap().image.valid().unwrap().clone()
    }

    #[test]
    fn reflection_goes_to_its_own_appearance() {
        fixtures::init_tracing();
        let (mut store, id, mut renderer) = scene(Kind::BinaryA, 5.0);
        let out = ProjectReflection::new(id)
            .execute(&mut store, &mut renderer, &mut Never)
            .unwrap();
        assert_eq!(out, Outcome::Done(Mode::PixelReplicate));
        assert!(!reflection(&store, id).is_background());
        assert!(store.get(id).unwrap().appearance.image.valid().is_none());
    }

    #[test]
    fn voxels_beyond_the_plane_are_skipped() {
        let (mut store, id, mut renderer) = scene(Kind::BinaryB, -5.0);
        ProjectReflection::new(id)
            .execute(&mut store, &mut renderer, &mut Never)
            .unwrap();
        assert!(reflection(&store, id).is_background());

        // Cutting through the middle drops the top slice, which would be
        // nearest in the mirror image at one millimetre in front of the center.
        let (mut store, id, mut renderer) = scene(Kind::BinaryA, 0.0);
        ProjectReflection::new(id)
            .execute(&mut store, &mut renderer, &mut Never)
            .unwrap();
        let nearest = reflection(&store, id).z_buffer().iter().copied().max().unwrap();
        assert!((f64::from(nearest) - MIDDLE_DEPTH).abs() <= 1.0);
    }

    #[test]
    fn rejects_what_it_cannot_reflect() {
        let (mut store, id, mut renderer) = scene(Kind::Gradient, 5.0);
        assert!(ProjectReflection::new(id)
            .execute(&mut store, &mut renderer, &mut Never)
            .is_err());

        let (mut store, id, mut renderer) = scene(Kind::BinaryA, 5.0);
        store.get_mut(id).unwrap().reflection = None;
        assert!(ProjectReflection::new(id)
            .execute(&mut store, &mut renderer, &mut Never)
            .is_err());
    }
}
