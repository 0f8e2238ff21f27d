//! Intersecting one primary row with the derived secondary row.

use crate::shell::normal::{neighbor_gradient, NormalCodec, SMALL_CODE_MASK};
use crate::shell::tse::PX;
use crate::shell::{Kind, Tse, TseRow};

use super::adjacent::{SVoxel, Sense};

/// How new TSEs on the cut surface are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTseRule {
    pub kind: Kind,
    /// Normal code for every new TSE (half-space cuts). Otherwise the code is
    /// derived from the neighbor flags.
    pub plane_code: Option<u16>,
    /// Mask G codes with [`SMALL_CODE_MASK`].
    pub small_codes: bool,
}

impl NewTseRule {
    fn normal_code(&self, neighbors: u16) -> u16 {
        let codec = NormalCodec::for_kind(self.kind);
        let code = self
            .plane_code
            .unwrap_or_else(|| codec.encode(&neighbor_gradient(neighbors)));
        if self.small_codes && codec == NormalCodec::G {
            code & SMALL_CODE_MASK
        } else {
            code
        }
    }

    /// A TSE at `at` inside the primary run that starts with `prev` and ends with `next`.
    fn new_tse(&self, at: &SVoxel, prev: &Tse, next: Option<&Tse>) -> Tse {
        let column = u16::try_from(at.x).unwrap_or(u16::MAX);
        let t = Tse::new(self.kind, column, at.code, self.normal_code(at.code));
        match self.kind {
            Kind::Gradient => t.with_payload(interpolate(prev, next, column), 0xff),
            Kind::Percent => t.with_percent(0b00_111).with_payload(interpolate(prev, next, column), 0xff),
            _ => t,
        }
    }
}

/// Magnitude at `column`, linear between `prev` and `next`.
fn interpolate(prev: &Tse, next: Option<&Tse>, column: u16) -> u8 {
    let Some(next) = next else {
        return prev.magnitude();
    };
    let (c0, c1) = (i32::from(prev.column()), i32::from(next.column()));
    let (m0, m1) = (i32::from(prev.magnitude()), i32::from(next.magnitude()));
    if c1 <= c0 {
        return prev.magnitude();
    }
    let m = m0 + (m1 - m0) * (i32::from(column) - c0) / (c1 - c0);
    u8::try_from(m.clamp(0, 255)).unwrap_or(u8::MAX)
}

/// Writes the TSEs of `primary` intersected with the secondary region to `out`.
///
/// Pass (a) visits the secondary boundary voxels. One that coincides with a
/// primary TSE keeps that TSE with its neighbor flags narrowed; one inside a
/// primary run becomes a new TSE. Pass (b) keeps primary TSEs lying strictly
/// inside the secondary region unchanged. The two passes are merged in
/// column order.
pub fn merge_row(primary: &TseRow<'_>, secondary: &[SVoxel], sense: Sense, rule: &NewTseRule, out: &mut Vec<Tse>) {
    let tses: Vec<Tse> = primary.iter().collect();
    let column = |t: &Tse| i32::from(t.column());

    let mut cut = Vec::with_capacity(secondary.len());
    for s in secondary {
        let i = tses.partition_point(|t| column(t) <= s.x);
        let Some(prev) = i.checked_sub(1).map(|i| &tses[i]) else {
            continue;
        };
        if column(prev) == s.x {
            cut.push(prev.with_neighbors(prev.neighbors() & s.code));
        } else if prev.neighbors() & PX != 0 {
            cut.push(rule.new_tse(s, prev, tses.get(i)));
        }
    }

    let kept = tses.iter().filter(|t| {
        let c = column(t);
        let j = secondary.partition_point(|s| s.x <= c);
        match j.checked_sub(1).map(|j| &secondary[j]) {
            None => sense == Sense::Outside,
            Some(s) => s.x < c && s.code & PX != 0,
        }
    });

    let mut kept = kept.peekable();
    for t in cut {
        while let Some(k) = kept.next_if(|k| k.column() < t.column()) {
            out.push(*k);
        }
        debug_assert!(kept.peek().is_none_or(|k| k.column() != t.column()));
        out.push(t);
    }
    out.extend(kept.copied());
}
