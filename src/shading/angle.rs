use crate::error::{try_filled, Result};
use crate::math::Matrix3;
use crate::shell::NormalCodec;

use super::lut::ShadeLut;

/// Shade per normal code for one view orientation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AngleShades {
    pub codec: NormalCodec,
    /// Indexed by normal code.
    pub shades: Vec<i32>,
    /// `255 * |cos|` per code, present when edges fade.
    pub fade: Option<Vec<u8>>,
}

impl AngleShades {
    /// Shade of a code; codes past the table get the null shade.
    #[must_use]
    pub fn shade(&self, code: u16) -> i32 {
        let i = usize::from(code).min(self.shades.len() - 1);
        self.shades[i]
    }

    /// Edge fade of a code, 255 when fading is off.
    #[must_use]
    pub fn fade(&self, code: u16) -> u8 {
        self.fade.as_ref().map_or(255, |f| {
            let i = usize::from(code).min(f.len() - 1);
            f[i]
        })
    }
}

/// Builds the shade table for every normal code of `codec` under `rotation`.
///
/// `rotation` maps object directions into view space; its last row is the
/// view axis. Back facing codes get shade `lut[0]` unless `show_back` is set,
/// in which case they are lit as if facing the viewer.
///
/// # Errors
///
/// Returns `ResourceError::OutOfMemory` if the tables cannot be allocated.
pub fn angle_shades(
    rotation: &Matrix3,
    lut: &ShadeLut,
    codec: NormalCodec,
    show_back: bool,
    fade_edge: bool,
) -> Result<AngleShades> {
    let codes = codec.codes();
    let mut shades = try_filled("angle shades", codes, 0i32)?;
    let mut fade = if fade_edge {
        Some(try_filled("edge fade", codes, 0u8)?)
    } else {
        None
    };
    let view = rotation.row(2).transpose();
    for code in 0..codes - 1 {
        #[allow(clippy::cast_possible_truncation)]
        let d = codec.decode(code as u16);
        let mut cos = d.normalize().dot(&view);
        if cos < 0.0 {
            cos = if show_back { -cos } else { 0.0 };
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let i = (((cos + 1.0) * 128.0).round() as usize).min(256);
        shades[code] = lut[i];
        if let Some(f) = fade.as_mut() {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let v = (255.0 * cos.abs()).round() as u8;
            f[code] = v;
        }
    }
    shades[codes - 1] = lut[0];
    Ok(AngleShades {
        codec,
        shades,
        fade,
    })
}
