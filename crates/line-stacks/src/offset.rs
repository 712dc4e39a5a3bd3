//! Offset layout of stack members and the parallel offset primitive
//!
//! [`StackLayout`] is the accumulation state of one stack expressed as a fold: every call to
//! [`StackLayout::place`] hands out the band of one member and returns the state for the next
//! member. Geometry only enters through [`offset_line`].

use crate::{MapUnits, Result, StackError};
use cavalier_contours::polyline::{PlineSource, PlineSourceMut, Polyline};
use geo::{Coord, LineString};

/// Coordinates closer than this are treated as the same position
const REPEAT_POS_EPS: f64 = 1e-9;

/// Maximum distance between an offset arc and its line approximation, relative to the offset
const ARC_APPROX_ERROR: f64 = 0.01;

/// Side of the line a band is drawn on, relative to the line direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Sign applied to the offset distance for a side, flipped for inverted features.
///
/// Positive distances offset to the left of the line direction.
#[inline]
pub fn side_multiplier(side: Side, inverted: bool) -> f64 {
    let sign = match side {
        Side::Left => 1.0,
        Side::Right => -1.0,
    };
    if inverted { -sign } else { sign }
}

/// Band handed out to one stack member, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Running offset of the stack when this member was placed
    pub base_offset_px: f64,
    /// Width of the member's band
    pub width_px: f64,
}

impl Placement {
    /// Unsigned distance between the original line and the offset line, in map units.
    ///
    /// When drawing on both sides the line is moved by half of its width so that the two copies
    /// leave the original path free; on a single side the band starts on the running offset.
    pub fn offset_map_units(&self, units: &MapUnits, draw_on_both_sides: bool) -> f64 {
        let base = units.pixel_distance_to_map_units(self.base_offset_px);
        if draw_on_both_sides {
            base + units.pixel_distance_to_map_units(self.width_px) / 2.0
        } else {
            base
        }
    }

    /// Pixel range `[start, end)` occupied by this member
    #[inline]
    pub fn range_px(&self) -> (f64, f64) {
        (self.base_offset_px, self.base_offset_px + self.width_px)
    }
}

/// Running offset of one stack
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackLayout {
    running_offset_px: f64,
    spacing_px: f64,
}

impl StackLayout {
    /// Start a stack; the first band keeps `spacing_px` away from the original line
    pub fn new(spacing_px: f64) -> Self {
        Self {
            running_offset_px: spacing_px,
            spacing_px,
        }
    }

    #[inline]
    pub fn running_offset_px(&self) -> f64 {
        self.running_offset_px
    }

    /// Place a member of `width_px` and advance by its width plus the spacing
    #[must_use]
    pub fn place(self, width_px: f64) -> (Self, Placement) {
        let placement = Placement {
            base_offset_px: self.running_offset_px,
            width_px,
        };
        let next = Self {
            running_offset_px: self.running_offset_px + width_px + self.spacing_px,
            ..self
        };
        (next, placement)
    }
}

/// Euclidean length of a line in map units
pub fn line_length(line: &LineString<f64>) -> f64 {
    line.lines().map(|l| l.dx().hypot(l.dy())).sum()
}

/// Line parallel to `line` at the signed perpendicular `distance` (positive is left).
///
/// Joins at convex corners are rounded by the offset algorithm and approximated by short
/// segments. When the offset breaks into several pieces the longest one is kept.
///
/// # Errors
/// - [`StackError::InvalidGeometry`] if the line has fewer than 2 distinct points
/// - [`StackError::DegenerateOffset`] if the offset collapses
pub fn offset_line(line: &LineString<f64>, distance: f64) -> Result<LineString<f64>> {
    let coords = dedup_coords(line);
    if coords.len() < 2 {
        return Err(StackError::InvalidGeometry(format!(
            "line has {} distinct point(s), at least 2 are required",
            coords.len()
        )));
    }
    if distance == 0.0 {
        return Ok(LineString::new(coords));
    }
    if !distance.is_finite() {
        return Err(StackError::DegenerateOffset { distance });
    }

    let mut pline = Polyline::new();
    for c in &coords {
        pline.add(c.x, c.y, 0.0);
    }

    let error_distance = (distance.abs() * ARC_APPROX_ERROR).max(REPEAT_POS_EPS);
    let best = pline
        .parallel_offset(distance)
        .into_iter()
        .filter_map(|result| result.arcs_to_approx_lines(error_distance))
        .max_by(|a, b| a.path_length().total_cmp(&b.path_length()))
        .ok_or(StackError::DegenerateOffset { distance })?;

    let offset: Vec<Coord<f64>> = best
        .iter_vertexes()
        .map(|v| Coord { x: v.x, y: v.y })
        .collect();
    let offset = dedup_coords(&LineString::new(offset));
    if offset.len() < 2 {
        return Err(StackError::DegenerateOffset { distance });
    }
    Ok(LineString::new(offset))
}

fn dedup_coords(line: &LineString<f64>) -> Vec<Coord<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(line.0.len());
    for c in &line.0 {
        match coords.last() {
            Some(prev)
                if (prev.x - c.x).abs() <= REPEAT_POS_EPS
                    && (prev.y - c.y).abs() <= REPEAT_POS_EPS => {}
            _ => coords.push(*c),
        }
    }
    coords
}
