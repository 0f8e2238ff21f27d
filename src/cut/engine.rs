use std::borrow::Cow;

use crate::cancel::{should_stop, Interrupt, Outcome};
use crate::error::{try_grow, OperationError, Result, StoreError};
use crate::math::{axis_angles_to_matrix, Point3, Vector3};
use crate::render::transform::Pose;
use crate::render::RendererContext;
use crate::shell::tse::{NY, NZ, PY, PZ};
use crate::shell::{
    compactify_object, Kind, NormalCodec, ShellData, ShellObject, ShellObjectId, ShellStore, StructureInfo, Tse,
};

use super::adjacent::{derive_secondary_row, insert_adjacent_vois, Sense, VHERE};
use super::marks::{mark_in_list, partition};
use super::merge::{merge_row, NewTseRule};
use super::plane::VoxelPlane;
use super::prism::Prism;
use super::voi::VoxelOfIntersectionList;

/// Output buffers grow by this many TSEs at a time.
pub const OUT_BLOCK_SIZE: usize = 0x800;

/// The region a primary object is cut with.
#[derive(Debug, Clone, PartialEq)]
pub enum Secondary {
    /// Points with `normal . p <= displacement` in the plan frame.
    HalfSpace { normal: Vector3, displacement: f64 },
    /// A polygon on the view swept back in depth.
    Prism(Prism),
    /// Explicit runs over the primary's voxel grid.
    VoiList(VoxelOfIntersectionList),
}

/// Objects created by a [`Cut`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutResult {
    /// Primary voxels inside the secondary region.
    pub intersection: ShellObjectId,
    /// Primary voxels outside it, when requested.
    pub complement: Option<ShellObjectId>,
}

/// Cuts an object's main data with a secondary region.
///
/// The new objects take the primary's placement and settings and are
/// compacted to their occupied boxes. The primary is switched off and
/// flagged as an original.
pub struct Cut {
    primary: ShellObjectId,
    secondary: Secondary,
    complement: bool,
}

impl Cut {
    /// Creates a new `Cut` operation producing the intersection only.
    #[must_use]
    pub fn new(primary: ShellObjectId, secondary: Secondary) -> Self {
        Self {
            primary,
            secondary,
            complement: false,
        }
    }

    /// Also produces the part of the primary outside the region.
    #[must_use]
    pub fn complement(mut self, complement: bool) -> Self {
        self.complement = complement;
        self
    }

    /// Executes the cut.
    ///
    /// The store is only changed once both passes have finished. If
    /// `interrupt` fires, nothing is added and the primary is left as it was.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Unsupported` for thickened-shell and direct
    /// primaries, `StoreError::NotInMemory` for on-disk primaries,
    /// `OperationError::InvalidInput` for a zero plane normal or a list that
    /// does not match the primary's grid, and any allocation or compaction error.
    pub fn execute(
        &self,
        store: &mut ShellStore,
        ctx: &RendererContext,
        interrupt: &mut dyn Interrupt,
    ) -> Result<Outcome<CutResult>> {
        let object = store.get(self.primary)?;
        let data = &object.main;
        let kind = data.classify();
        if matches!(kind, Kind::TShell | Kind::Direct) {
            return Err(OperationError::Unsupported(format!("cutting {kind:?} shells")).into());
        }
        if !data.is_in_memory() {
            return Err(StoreError::NotInMemory.into());
        }
        let (rows, slices) = (data.rows(), data.slices());
        let clmns = usize::from(data.structure().largest_y1) + 1;
        let pose = Pose {
            rotation: axis_angles_to_matrix(object.angle),
            displacement: object.displacement,
        };
        tracing::debug!(?kind, rows, slices, clmns, complement = self.complement, "cutting object");

        let mut plane = None;
        let list = match &self.secondary {
            Secondary::HalfSpace { normal, displacement } => {
                let n = normal
                    .try_normalize(1e-12)
                    .ok_or_else(|| OperationError::InvalidInput("zero plane normal".into()))?;
                let p = VoxelPlane::new(data, &pose, &n, *displacement);
                plane = Some(p);
                Cow::Owned(p.enumerate(rows, slices, clmns)?)
            }
            Secondary::Prism(prism) => Cow::Owned(prism.enumerate(data, &pose, ctx)?),
            Secondary::VoiList(list) => {
                if (list.rows(), list.slices()) != (rows, slices) {
                    return Err(OperationError::InvalidInput(format!(
                        "list of {} rows and {} slices for a shell of {rows} rows and {slices} slices",
                        list.rows(),
                        list.slices()
                    ))
                    .into());
                }
                Cow::Borrowed(list)
            }
        };

        let codec = NormalCodec::for_kind(kind);
        let small_codes = data.file().borrow().small_normal_codes();
        let rule = |sense: Sense| NewTseRule {
            kind,
            plane_code: plane.map(|p| match sense {
                Sense::Inside => codec.encode(&p.inward()),
                Sense::Outside => codec.encode(&-p.inward()),
            }),
            small_codes,
        };

        let complement = if self.complement {
            match run_pass(data, &list, Sense::Outside, &rule(Sense::Outside), clmns, interrupt)? {
                Outcome::Done(out) => Some(out),
                Outcome::Cancelled => return Ok(Outcome::Cancelled),
            }
        } else {
            None
        };
        let Outcome::Done(intersection) = run_pass(data, &list, Sense::Inside, &rule(Sense::Inside), clmns, interrupt)?
        else {
            return Ok(Outcome::Cancelled);
        };

        let header = {
            let f = data.file().borrow();
            let info = StructureInfo {
                volume: None,
                surface_area: None,
                ..f.structures[data.shell_number()].clone()
            };
            let mut header = f.clone();
            header.structures = vec![info; if complement.is_some() { 2 } else { 1 }];
            header.shared()
        };
        let inside_mark = |m: &Point3| match &self.secondary {
            Secondary::HalfSpace { .. } => plane.is_some_and(|p| p.contains_mark(m)),
            Secondary::Prism(prism) => prism.contains_mark(m, &pose, ctx),
            Secondary::VoiList(list) => mark_in_list(data, list, m),
        };
        let (inside_marks, outside_marks) = partition(&object.marks, inside_mark);

        let build = |number: usize, (words, offsets): (Vec<u16>, Vec<usize>), marks| -> Result<ShellObject> {
            let total = offsets.last().copied().unwrap_or(0);
            let mut piece = ShellData::in_memory(header.clone(), number, rows, slices, words, offsets)?;
            piece.record_counts(total);
            let mut derived = object.derive(piece, marks);
            compactify_object(&mut derived)?;
            Ok(derived)
        };
        let intersection = build(0, intersection, inside_marks)?;
        let complement = complement.map(|out| build(1, out, outside_marks)).transpose()?;
        tracing::debug!(
            intersection = intersection.main.tse_count(),
            complement = complement.as_ref().map(|c| c.main.tse_count()),
            "cut finished"
        );

        let primary = store.get_mut(self.primary)?;
        primary.appearance.on = false;
        primary.original = true;
        let intersection = store.add(intersection);
        let complement = complement.map(|c| store.add(c));
        Ok(Outcome::Done(CutResult {
            intersection,
            complement,
        }))
    }
}

/// Intersects every row of `data` with the region of `list` seen from `sense`.
///
/// Returns the TSE words and the cumulative row offsets of the result, laid
/// out like `data`. Polls `interrupt` once per slice.
///
/// # Errors
///
/// Returns an error if a primary row cannot be read or the output cannot grow.
pub(crate) fn run_pass(
    data: &ShellData,
    list: &VoxelOfIntersectionList,
    sense: Sense,
    rule: &NewTseRule,
    clmns: usize,
    interrupt: &mut dyn Interrupt,
) -> Result<Outcome<(Vec<u16>, Vec<usize>)>> {
    let (rows, slices) = (data.rows(), data.slices());
    let per_tse = rule.kind.words();
    let mut words: Vec<u16> = Vec::new();
    let mut offsets = Vec::new();
    try_grow("cut offsets", &mut offsets, rows * slices + 1)?;
    offsets.push(0);

    let mut adjacent = Vec::new();
    let mut out: Vec<Tse> = Vec::new();
    let mut total = 0;
    for s in 0..slices {
        if should_stop(interrupt) {
            return Ok(Outcome::Cancelled);
        }
        for r in 0..rows {
            let primary = data.row(s, r)?;
            if primary.is_empty() {
                offsets.push(total);
                continue;
            }
            adjacent.clear();
            if let Some(below) = s.checked_sub(1) {
                insert_adjacent_vois(&mut adjacent, list.row(below, r), NZ, sense);
            }
            if let Some(before) = r.checked_sub(1) {
                insert_adjacent_vois(&mut adjacent, list.row(s, before), NY, sense);
            }
            insert_adjacent_vois(&mut adjacent, list.row(s, r + 1), PY, sense);
            insert_adjacent_vois(&mut adjacent, list.row(s + 1, r), PZ, sense);
            insert_adjacent_vois(&mut adjacent, list.row(s, r), VHERE, sense);
            let secondary = derive_secondary_row(&adjacent, sense, clmns);

            out.clear();
            merge_row(&primary, &secondary, sense, rule, &mut out);
            let need = out.len() * per_tse;
            if words.capacity() - words.len() < need {
                try_grow("cut output", &mut words, need.max(OUT_BLOCK_SIZE * per_tse))?;
            }
            for t in &out {
                t.write_to(&mut words);
            }
            total += out.len();
            offsets.push(total);
        }
        tracing::trace!(slice = s, tses = total, ?sense, "cut slice");
    }
    Ok(Outcome::Done((words, offsets)))
}
