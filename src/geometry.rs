//! Geometry primitives and intrinsic measure size estimation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, LayoutResult};
use crate::fraction::Fraction;
use crate::layout::options::{LayoutOptions, SpacingRules};
use crate::model::*;

/// Slack for comparing accumulated floating widths and heights.
pub const EPSILON: f64 = 1e-9;

// ═══════════════════════════════════════════════════════════════════════
// Points, sizes, rectangles
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A rectangle defined by position and size
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn x(&self) -> f64 {
        self.origin.x
    }

    pub fn y(&self) -> f64 {
        self.origin.y
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    pub fn right(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x() && p.x <= self.right() && p.y >= self.y() && p.y <= self.bottom()
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x().min(other.x());
        let y = self.y().min(other.y());
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Measure metrics
// ═══════════════════════════════════════════════════════════════════════

/// Intrinsic size of a measure, before justification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureMetrics {
    pub width: f64,
    pub height: f64,
}

/// Space taken by a key signature's accidentals.
pub fn key_sig_width(fifths: i32, rules: &SpacingRules) -> f64 {
    match fifths {
        f if f > 0 => f as f64 * rules.key_sig_sharp_width,
        f if f < 0 => f.unsigned_abs() as f64 * rules.key_sig_flat_width,
        _ => 0.0,
    }
}

/// One column of simultaneous events within a measure.
#[derive(Debug, Default)]
struct Segment {
    /// Shortest chord/rest starting here
    shortest: Option<Fraction>,
    /// Minimum width demanded by note heads, lyrics or chord symbols
    min_width: f64,
}

/// Walks a measure's elements and gathers what its width depends on.
struct ContentScan<'a> {
    rules: &'a SpacingRules,
    len: Fraction,
    segments: BTreeMap<Fraction, Segment>,
    prefix: f64,
    verses: usize,
    problem: Option<String>,
}

impl<'a> ContentScan<'a> {
    fn new(rules: &'a SpacingRules, len: Fraction) -> Self {
        Self {
            rules,
            len,
            segments: BTreeMap::new(),
            prefix: 0.0,
            verses: 0,
            problem: None,
        }
    }

    fn fail(&mut self, msg: String) {
        if self.problem.is_none() {
            self.problem = Some(msg);
        }
    }

    fn check_tick(&mut self, tick: Fraction) -> bool {
        if tick.is_negative() || tick >= self.len {
            self.fail(format!("element at {tick} lies outside the measure"));
            return false;
        }
        true
    }

    fn chord_rest(&mut self, tick: Fraction, duration: Fraction, min_width: f64) {
        if !duration.is_positive() {
            self.fail(format!("element at {tick} has non-positive duration {duration}"));
            return;
        }
        if !self.check_tick(tick) {
            return;
        }
        let seg = self.segments.entry(tick).or_default();
        seg.shortest = Some(seg.shortest.map_or(duration, |d| d.min(duration)));
        seg.min_width = seg.min_width.max(min_width);
    }

    fn min_width_at(&mut self, tick: Fraction, width: f64) {
        if self.check_tick(tick) {
            let seg = self.segments.entry(tick).or_default();
            seg.min_width = seg.min_width.max(width);
        }
    }

    /// Content width from segment springs.
    fn content_width(&self) -> f64 {
        let reference = self.rules.reference_duration;
        self.segments
            .values()
            .map(|seg| {
                let spring = seg.shortest.map_or(0.0, |d| {
                    let ratio = (d / reference).to_f64().max(1.0);
                    self.rules.min_note_distance * (1.0 + self.rules.spacing_density * ratio.log2())
                });
                spring.max(seg.min_width)
            })
            .sum()
    }
}

impl ElementVisitor for ContentScan<'_> {
    fn visit_chord(&mut self, chord: &Chord) {
        let accidentals = chord.notes.iter().filter(|n| n.accidental.is_some()).count();
        let lyric_chars = chord.lyrics.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let width = (self.rules.note_head_width + accidentals as f64 * self.rules.accidental_width)
            .max(lyric_chars as f64 * self.rules.lyric_char_width);
        self.verses = self.verses.max(chord.lyrics.len());
        self.chord_rest(chord.tick, chord.duration, width);
    }

    fn visit_rest(&mut self, rest: &Rest) {
        self.chord_rest(rest.tick, rest.duration, self.rules.note_head_width);
    }

    fn visit_spanner(&mut self, spanner: &Spanner) {
        if spanner.len.is_negative() {
            self.fail(format!("spanner at {} has negative length", spanner.tick));
        }
        self.check_tick(spanner.tick);
    }

    fn visit_harmony(&mut self, harmony: &Harmony) {
        let width = harmony.text.chars().count() as f64 * self.rules.harmony_char_width;
        self.min_width_at(harmony.tick, width);
    }

    fn visit_key_change(&mut self, key: &KeySignature) {
        self.prefix += key_sig_width(key.fifths, self.rules) + self.rules.key_sig_padding;
    }

    fn visit_clef(&mut self, clef: &Clef) {
        if clef.tick.is_zero() {
            self.prefix += self.rules.clef_width;
        } else {
            self.min_width_at(clef.tick, self.rules.clef_width);
        }
    }
}

/// Estimate the intrinsic width and height of measure `index`.
///
/// Width grows with rhythmic density: every distinct onset gets a spring
/// that lengthens logarithmically with the shortest duration starting there,
/// widened if note heads, lyrics or chord symbols need more room. Key,
/// time and clef changes add a fixed prefix. A nominal width on the measure
/// replaces the estimate; the stretch factor scales either.
pub fn measure_metrics(
    measures: &[Measure],
    index: usize,
    options: &LayoutOptions,
) -> LayoutResult<MeasureMetrics> {
    let rules = &options.spacing;
    let measure = measures
        .get(index)
        .ok_or_else(|| LayoutError::unlayoutable(index, "no such measure"))?;

    if !measure.stretch.is_finite() || measure.stretch <= 0.0 {
        return Err(LayoutError::unlayoutable(
            index,
            format!("stretch {} is not a positive number", measure.stretch),
        ));
    }
    let len = measure.duration();
    if !len.is_positive() {
        return Err(LayoutError::unlayoutable(
            index,
            format!(
                "measure length is not positive (time signature {}/{})",
                measure.time_sig.beats, measure.time_sig.beat_type
            ),
        ));
    }

    let mut scan = ContentScan::new(rules, len);
    measure.visit(&mut scan);
    if let Some(problem) = scan.problem.take() {
        return Err(LayoutError::unlayoutable(index, problem));
    }

    let width = match measure.width {
        Some(w) if w.is_finite() && w > 0.0 => w,
        Some(w) => {
            return Err(LayoutError::unlayoutable(
                index,
                format!("nominal width {w} is not a positive number"),
            ))
        }
        None => {
            let prev = index.checked_sub(1).and_then(|i| measures.get(i));
            let mut prefix = scan.prefix;
            match prev {
                None => prefix += rules.clef_width + rules.time_sig_width,
                Some(p) if p.time_sig != measure.time_sig => prefix += rules.time_sig_width,
                Some(_) => {}
            }
            let content = scan.content_width();
            (rules.barline_distance + prefix + content).max(rules.min_measure_width)
        }
    };

    let staves = measure.staves.max(1) as f64;
    let height = staves * rules.staff_height
        + (staves - 1.0) * options.staff_spacing
        + scan.verses as f64 * rules.lyric_line_height;

    Ok(MeasureMetrics {
        width: width * measure.stretch,
        height,
    })
}

/// Height used for a measure whose width could not be estimated.
pub fn fallback_height(measure: &Measure, options: &LayoutOptions) -> f64 {
    let staves = measure.staves.max(1) as f64;
    staves * options.spacing.staff_height + (staves - 1.0) * options.staff_spacing
}
