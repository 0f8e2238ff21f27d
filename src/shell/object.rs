use crate::math::{Point3, Vector3};
use crate::render::raster::ObjectImage;
use crate::shading::lut::ObjectShading;

use super::compact::shell_diameter;
use super::data::ShellData;

/// Rendering settings of one object, or of its reflection.
#[derive(Debug, Clone, PartialEq)]
pub struct Appearance {
    pub on: bool,
    pub opacity: f64,
    pub rgb: [u16; 3],
    pub color_index: u8,
    pub shading: ObjectShading,
    /// Raster of the main data.
    pub image: ObjectImage,
    /// Raster of the icon data.
    pub icon_image: ObjectImage,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            on: true,
            opacity: 1.0,
            rgb: [65535, 65535, 65535],
            color_index: 0,
            shading: ObjectShading::default(),
            image: ObjectImage::default(),
            icon_image: ObjectImage::default(),
        }
    }
}

impl Appearance {
    /// Copies the settings without any rasters.
    #[must_use]
    pub fn settings(&self) -> Self {
        Self {
            image: ObjectImage::default(),
            icon_image: ObjectImage::default(),
            ..self.clone()
        }
    }

    /// The raster slot for the main or icon data.
    pub fn image_mut(&mut self, icon: bool) -> &mut ObjectImage {
        if icon {
            &mut self.icon_image
        } else {
            &mut self.image
        }
    }
}

/// A structure placed in the scene.
///
/// Angles are axis-angle triples. `angle` and `displacement` place the object
/// in the plan frame; `plan_angle` and `plan_displacement` relate it to the
/// scan frame.
#[derive(Debug, Clone)]
pub struct ShellObject {
    pub main: ShellData,
    pub icon: Option<ShellData>,
    pub angle: [f64; 3],
    pub displacement: Vector3,
    pub plan_angle: [f64; 3],
    pub plan_displacement: Vector3,
    /// Diagonal of the occupied box in millimetres.
    pub diameter: f64,
    pub mobile: bool,
    /// Set on objects that have been cut.
    pub original: bool,
    pub appearance: Appearance,
    pub reflection: Option<Appearance>,
    /// Marks in millimetres, relative to the object center.
    pub marks: Vec<Point3>,
}

impl ShellObject {
    /// Places `main` at the origin with no rotation.
    #[must_use]
    pub fn new(main: ShellData) -> Self {
        let diameter = shell_diameter(&main);
        Self {
            main,
            icon: None,
            angle: [0.0; 3],
            displacement: Vector3::zeros(),
            plan_angle: [0.0; 3],
            plan_displacement: Vector3::zeros(),
            diameter,
            mobile: false,
            original: false,
            appearance: Appearance::default(),
            reflection: None,
            marks: Vec::new(),
        }
    }

    /// A new object with `main` as data and the placement and settings of `self`.
    #[must_use]
    pub fn derive(&self, main: ShellData, marks: Vec<Point3>) -> Self {
        let mut appearance = self.appearance.settings();
        appearance.on = true;
        Self {
            main,
            icon: None,
            angle: self.angle,
            displacement: self.displacement,
            plan_angle: self.plan_angle,
            plan_displacement: self.plan_displacement,
            diameter: self.diameter,
            mobile: self.mobile,
            original: false,
            appearance,
            reflection: self.reflection.as_ref().map(Appearance::settings),
            marks,
        }
    }

    /// Data to project, main or icon.
    #[must_use]
    pub fn data(&self, icon: bool) -> Option<&ShellData> {
        if icon {
            self.icon.as_ref()
        } else {
            Some(&self.main)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shell::fixtures;
    use crate::shell::Kind;

    #[test]
    fn new_object_measures_its_data() {
        let data = fixtures::cube(Kind::BinaryA, 3);
        let object = ShellObject::new(data);
        assert!((object.diameter - 27.0_f64.sqrt()).abs() < 1e-12);
        assert!(object.appearance.on);
        assert!(object.data(true).is_none());
    }

    #[test]
    fn derived_object_copies_settings_not_images() {
        let mut object = ShellObject::new(fixtures::cube(Kind::BinaryA, 3));
        object.appearance.on = false;
        object.appearance.opacity = 0.4;
        object.mobile = true;
        object.displacement = Vector3::new(1.0, 2.0, 3.0);
        let child = object.derive(fixtures::cube(Kind::BinaryA, 2), vec![Point3::origin()]);
        assert!(child.appearance.on);
        assert!((child.appearance.opacity - 0.4).abs() < f64::EPSILON);
        assert!(child.mobile);
        assert_eq!(child.displacement, object.displacement);
        assert_eq!(child.marks.len(), 1);
        assert!(child.appearance.image.valid().is_none());
    }
}
