//! Data model for a score and the layout geometry attached to it.
//!
//! The score owns its measures in one ordered arena. Laid-out systems and
//! pages live in two more arenas and refer to their children by index
//! ranges, so a measure never points back at anything: the system holding
//! measure `i` is found with [`Score::system_of_measure`].

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::fraction::Fraction;
use crate::geometry::Rect;
use crate::layout::options::LayoutOptions;

/// A complete musical score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    /// Title of the piece
    #[serde(default)]
    pub title: Option<String>,
    /// Composer name
    #[serde(default)]
    pub composer: Option<String>,
    /// Tempo changes, ordered by tick
    #[serde(default)]
    pub tempo_map: TempoMap,
    pub(crate) measures: Vec<Measure>,
    #[serde(default)]
    pub(crate) systems: Vec<System>,
    #[serde(default)]
    pub(crate) pages: Vec<Page>,
    /// Options of the last committed pass
    #[serde(default)]
    pub(crate) layout_state: Option<LayoutState>,
    /// Last committed pass number
    #[serde(default)]
    pub(crate) generation: u64,
}

/// One bar of music.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// Measure number as printed
    pub number: i32,
    /// Start position in the score; maintained by [`Score`]
    #[serde(default)]
    pub tick: Fraction,
    pub time_sig: TimeSignature,
    /// Actual length when it differs from the time signature (pickups)
    #[serde(default)]
    pub actual_len: Option<Fraction>,
    /// Fixed nominal width; bypasses content-based estimation
    #[serde(default)]
    pub width: Option<f64>,
    /// User stretch factor applied to the estimated width
    #[serde(default = "default_stretch")]
    pub stretch: f64,
    /// Number of staves in this measure
    #[serde(default = "default_staves")]
    pub staves: usize,
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub breaks: LayoutBreak,
    /// Geometry from the last pass, relative to the owning system
    #[serde(default)]
    pub layout: Option<MeasureLayout>,
}

fn default_stretch() -> f64 {
    1.0
}

fn default_staves() -> usize {
    1
}

/// Time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Numerator (e.g., 3 in 3/4)
    pub beats: i32,
    /// Denominator (e.g., 4 in 3/4)
    pub beat_type: i32,
}

impl TimeSignature {
    pub fn new(beats: i32, beat_type: i32) -> Self {
        Self { beats, beat_type }
    }

    /// Nominal measure length, or `None` for a degenerate signature.
    pub fn len(&self) -> Option<Fraction> {
        if self.beats <= 0 || self.beat_type <= 0 {
            return None;
        }
        Fraction::try_new(self.beats as i64, self.beat_type as i64)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

/// Forced break flags carried by the last measure before the break.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutBreak {
    #[serde(default)]
    pub line: bool,
    #[serde(default)]
    pub page: bool,
    #[serde(default)]
    pub section: bool,
}

impl LayoutBreak {
    /// Page and section breaks end the system as well.
    pub fn ends_system(&self) -> bool {
        self.line || self.page || self.section
    }
}

/// Per-measure geometry written back by a layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasureLayout {
    /// Left edge relative to the system's left edge
    pub x: f64,
    /// Width after justification
    pub width: f64,
    /// Intrinsic width before justification
    pub natural_width: f64,
    pub height: f64,
    /// Width estimation failed; the measure sits alone on its system
    #[serde(default)]
    pub unlayoutable: bool,
}

// ═══════════════════════════════════════════════════════════════════════
// Notational elements
// ═══════════════════════════════════════════════════════════════════════

/// Everything a measure can contain. Ticks are offsets from the measure
/// start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Chord(Chord),
    Rest(Rest),
    Articulation(Articulation),
    Spanner(Spanner),
    Harmony(Harmony),
    KeyChange(KeySignature),
    Clef(Clef),
}

/// One or more notes sounding together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    pub tick: Fraction,
    pub duration: Fraction,
    pub notes: Vec<Note>,
    /// Lyric syllables, one per verse
    #[serde(default)]
    pub lyrics: Vec<String>,
    #[serde(default)]
    pub staff: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// MIDI pitch (middle C = 60)
    pub pitch: i32,
    #[serde(default)]
    pub accidental: Option<Accidental>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Accidental {
    Sharp,
    Flat,
    Natural,
    DoubleSharp,
    DoubleFlat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rest {
    pub tick: Fraction,
    pub duration: Fraction,
    #[serde(default)]
    pub staff: usize,
}

/// A mark attached to the chord at `tick`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Articulation {
    pub kind: ArticulationKind,
    pub tick: Fraction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArticulationKind {
    Staccato,
    Staccatissimo,
    Tenuto,
    Accent,
    Marcato,
    Fermata,
    Trill,
    Mordent,
    Turn,
}

/// A time-spanning annotation starting in this measure. `len` may reach
/// into following measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanner {
    pub kind: SpannerKind,
    pub tick: Fraction,
    pub len: Fraction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpannerKind {
    Slur,
    Tie,
    Hairpin,
    Ottava,
    Pedal,
    Trill,
    Volta,
    /// Multi-bar repeat sign; cannot be split across systems
    MeasureRepeat,
}

impl SpannerKind {
    pub fn is_breakable(self) -> bool {
        !matches!(self, SpannerKind::MeasureRepeat)
    }
}

/// A chord symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Harmony {
    pub tick: Fraction,
    pub text: String,
}

/// Key signature change at the start of the measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySignature {
    /// Number of sharps (positive) or flats (negative)
    pub fifths: i32,
}

/// Clef change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clef {
    pub tick: Fraction,
    /// Clef sign: "G" (treble), "F" (bass), "C" (alto/tenor)
    pub sign: String,
    #[serde(default)]
    pub staff: usize,
}

/// What an element contributes to layout decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Occupies horizontal space in its measure
    pub has_width: bool,
    /// Has a duration or extent in musical time
    pub has_time_span: bool,
    /// A system break may fall inside its time span
    pub is_breakable: bool,
}

/// Single dispatch point over [`Element`] variants. Every method defaults
/// to doing nothing so visitors only implement what they care about.
pub trait ElementVisitor {
    fn visit_chord(&mut self, _chord: &Chord) {}
    fn visit_rest(&mut self, _rest: &Rest) {}
    fn visit_articulation(&mut self, _articulation: &Articulation) {}
    fn visit_spanner(&mut self, _spanner: &Spanner) {}
    fn visit_harmony(&mut self, _harmony: &Harmony) {}
    fn visit_key_change(&mut self, _key: &KeySignature) {}
    fn visit_clef(&mut self, _clef: &Clef) {}
}

impl Element {
    pub fn accept<V: ElementVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Element::Chord(c) => visitor.visit_chord(c),
            Element::Rest(r) => visitor.visit_rest(r),
            Element::Articulation(a) => visitor.visit_articulation(a),
            Element::Spanner(s) => visitor.visit_spanner(s),
            Element::Harmony(h) => visitor.visit_harmony(h),
            Element::KeyChange(k) => visitor.visit_key_change(k),
            Element::Clef(c) => visitor.visit_clef(c),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Element::Chord(_) | Element::Rest(_) => Capabilities {
                has_width: true,
                has_time_span: true,
                is_breakable: true,
            },
            Element::Articulation(_) => Capabilities {
                has_width: false,
                has_time_span: false,
                is_breakable: true,
            },
            Element::Spanner(s) => Capabilities {
                has_width: false,
                has_time_span: true,
                is_breakable: s.kind.is_breakable(),
            },
            Element::Harmony(_) | Element::KeyChange(_) | Element::Clef(_) => Capabilities {
                has_width: true,
                has_time_span: false,
                is_breakable: true,
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Attached layout geometry
// ═══════════════════════════════════════════════════════════════════════

/// A laid-out line of consecutive measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct System {
    /// Measure indices, contiguous and in time order
    pub measures: Range<usize>,
    /// Position and size on the page
    pub bbox: Rect,
    /// Sum of intrinsic measure widths
    pub natural_width: f64,
    /// Whether measure widths were scaled to the line width
    pub justified: bool,
    /// Pass that collected this system
    pub generation: u64,
}

/// A laid-out sheet of consecutive systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// System indices, contiguous
    pub systems: Range<usize>,
    pub bbox: Rect,
    /// Pass that collected this page
    pub generation: u64,
}

/// What the attached geometry was computed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutState {
    pub options: LayoutOptions,
}

/// Tempo changes over the score, in quarter notes per minute.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TempoMap {
    changes: Vec<TempoChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    pub tick: Fraction,
    pub bpm: f64,
}

/// Default tempo if none is specified in the score.
pub const DEFAULT_TEMPO: f64 = 120.0;

impl TempoMap {
    /// Set the tempo from `tick` onwards, replacing a change at the same tick.
    pub fn set_tempo(&mut self, tick: Fraction, bpm: f64) {
        match self.changes.binary_search_by(|c| c.tick.cmp(&tick)) {
            Ok(i) => self.changes[i].bpm = bpm,
            Err(i) => self.changes.insert(i, TempoChange { tick, bpm }),
        }
    }

    pub fn tempo_at(&self, tick: Fraction) -> f64 {
        let i = self.changes.partition_point(|c| c.tick <= tick);
        if i == 0 {
            DEFAULT_TEMPO
        } else {
            self.changes[i - 1].bpm
        }
    }

    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Score
// ═══════════════════════════════════════════════════════════════════════

impl Score {
    /// Create a new empty score.
    pub fn new() -> Self {
        Self {
            title: None,
            composer: None,
            tempo_map: TempoMap::default(),
            measures: Vec::new(),
            systems: Vec::new(),
            pages: Vec::new(),
            layout_state: None,
            generation: 0,
        }
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn measure(&self, index: usize) -> Option<&Measure> {
        self.measures.get(index)
    }

    pub fn measure_count(&self) -> usize {
        self.measures.len()
    }

    pub fn systems(&self) -> &[System] {
        &self.systems
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn layout_state(&self) -> Option<&LayoutState> {
        self.layout_state.as_ref()
    }

    /// Number of the last committed layout pass (0 before any pass).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// End of the last measure.
    pub fn end_tick(&self) -> Fraction {
        self.measures.last().map_or(Fraction::ZERO, |m| m.end_tick())
    }

    /// Index of the measure covering `tick`.
    pub fn measure_at(&self, tick: Fraction) -> Option<usize> {
        let i = self.measures.partition_point(|m| m.end_tick() <= tick);
        (i < self.measures.len() && self.measures[i].tick <= tick).then_some(i)
    }

    /// Index of the system holding measure `index`.
    pub fn system_of_measure(&self, index: usize) -> Option<usize> {
        let i = self.systems.partition_point(|s| s.measures.end <= index);
        (i < self.systems.len() && self.systems[i].measures.contains(&index)).then_some(i)
    }

    /// Index of the page holding system `index`.
    pub fn page_of_system(&self, index: usize) -> Option<usize> {
        let i = self.pages.partition_point(|p| p.systems.end <= index);
        (i < self.pages.len() && self.pages[i].systems.contains(&index)).then_some(i)
    }

    /// Append a measure after the last one.
    pub fn push_measure(&mut self, mut measure: Measure) -> usize {
        measure.tick = self.end_tick();
        measure.layout = None;
        self.measures.push(measure);
        self.measures.len() - 1
    }

    /// Insert a measure before `index` (appends when `index` is past the
    /// end). Attached geometry is kept: the new measure joins the system
    /// that held `index`, and later system ranges shift by one. Returns the
    /// tick range the new measure occupies; lay that range out next.
    pub fn insert_measure(&mut self, index: usize, mut measure: Measure) -> (Fraction, Fraction) {
        let index = index.min(self.measures.len());
        measure.layout = None;
        if index < self.measures.len() {
            for system in &mut self.systems {
                if system.measures.start > index {
                    system.measures.start += 1;
                    system.measures.end += 1;
                } else if system.measures.contains(&index) {
                    system.measures.end += 1;
                }
            }
        }
        self.measures.insert(index, measure);
        self.retick_from(index);
        let m = &self.measures[index];
        (m.tick, m.end_tick())
    }

    /// Remove the measure at `index`. A system left empty is dropped, and a
    /// page left empty with it. Lay out the empty range at the removed
    /// measure's tick afterwards.
    pub fn remove_measure(&mut self, index: usize) -> Option<Measure> {
        if index >= self.measures.len() {
            return None;
        }
        let owner = self.system_of_measure(index);
        let removed = self.measures.remove(index);

        if self.measures.is_empty() {
            self.clear_layout();
            return Some(removed);
        }

        if let Some(s) = owner {
            self.systems[s].measures.end -= 1;
            for system in &mut self.systems[s + 1..] {
                system.measures.start -= 1;
                system.measures.end -= 1;
            }
            if self.systems[s].measures.is_empty() {
                self.remove_system(s);
            }
        }
        self.retick_from(index);
        Some(removed)
    }

    fn remove_system(&mut self, index: usize) {
        self.systems.remove(index);
        let owner = self.page_of_system(index);
        if let Some(p) = owner {
            self.pages[p].systems.end -= 1;
            for page in &mut self.pages[p + 1..] {
                page.systems.start -= 1;
                page.systems.end -= 1;
            }
            if self.pages[p].systems.is_empty() {
                self.pages.remove(p);
            }
        }
    }

    /// Apply an edit to one measure. Ticks of later measures are refreshed
    /// if the length changed. Returns the tick range to lay out again,
    /// covering the measure both before and after the edit, cut at the
    /// score end.
    pub fn edit_measure<F>(&mut self, index: usize, edit: F) -> Option<(Fraction, Fraction)>
    where
        F: FnOnce(&mut Measure),
    {
        let before = self.measures.get(index)?.end_tick();
        edit(&mut self.measures[index]);
        self.retick_from(index);
        let m = &self.measures[index];
        let to = m.end_tick().max(before).min(self.end_tick());
        Some((m.tick, to))
    }

    /// Recompute start ticks from `index` onwards.
    pub(crate) fn retick_from(&mut self, index: usize) {
        let mut tick = if index == 0 {
            Fraction::ZERO
        } else {
            self.measures[index - 1].end_tick()
        };
        for measure in &mut self.measures[index..] {
            measure.tick = tick;
            tick = measure.end_tick();
        }
    }

    /// Drop all attached geometry.
    pub fn clear_layout(&mut self) {
        self.systems.clear();
        self.pages.clear();
        self.layout_state = None;
        for measure in &mut self.measures {
            measure.layout = None;
        }
    }

    /// Get all distinct time signatures used in the score, in order of
    /// first appearance.
    pub fn time_signatures(&self) -> Vec<TimeSignature> {
        let mut sigs: Vec<TimeSignature> = Vec::new();
        for measure in &self.measures {
            if !sigs.contains(&measure.time_sig) {
                sigs.push(measure.time_sig);
            }
        }
        sigs
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::new()
    }
}

impl Measure {
    pub fn new(number: i32, time_sig: TimeSignature) -> Self {
        Self {
            number,
            tick: Fraction::ZERO,
            time_sig,
            actual_len: None,
            width: None,
            stretch: 1.0,
            staves: 1,
            elements: Vec::new(),
            breaks: LayoutBreak::default(),
            layout: None,
        }
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    /// Fix the nominal width instead of estimating it from content.
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_breaks(mut self, breaks: LayoutBreak) -> Self {
        self.breaks = breaks;
        self
    }

    /// Actual length: `actual_len` for pickups, otherwise the time
    /// signature's nominal length.
    pub fn duration(&self) -> Fraction {
        self.actual_len
            .or_else(|| self.time_sig.len())
            .unwrap_or(Fraction::ZERO)
    }

    pub fn end_tick(&self) -> Fraction {
        self.tick + self.duration()
    }

    pub fn visit<V: ElementVisitor + ?Sized>(&self, visitor: &mut V) {
        for element in &self.elements {
            element.accept(visitor);
        }
    }

    /// Latest absolute tick reached by a spanner that forbids system
    /// breaks, if any starts here.
    pub fn unbreakable_until(&self) -> Option<Fraction> {
        self.elements
            .iter()
            .filter(|e| !e.capabilities().is_breakable)
            .filter_map(|e| match e {
                Element::Spanner(s) => Some(self.tick + s.tick + s.len),
                _ => None,
            })
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(n: i32) -> Measure {
        Measure::new(n, TimeSignature::new(4, 4))
    }

    fn attached(score: &mut Score, groups: &[Range<usize>]) {
        score.systems = groups
            .iter()
            .map(|r| System {
                measures: r.clone(),
                bbox: Rect::default(),
                natural_width: 0.0,
                justified: false,
                generation: 1,
            })
            .collect();
        score.pages = vec![Page {
            systems: 0..groups.len(),
            bbox: Rect::default(),
            generation: 1,
        }];
    }

    #[test]
    fn push_assigns_contiguous_ticks() {
        let mut score = Score::new();
        score.push_measure(bar(1));
        let mut pickup = Measure::new(2, TimeSignature::new(3, 4));
        pickup.actual_len = Some(Fraction::new(1, 4));
        score.push_measure(pickup);
        score.push_measure(bar(3));
        assert_eq!(score.measures()[1].tick, Fraction::from_integer(1));
        assert_eq!(score.measures()[2].tick, Fraction::new(5, 4));
        assert_eq!(score.end_tick(), Fraction::new(9, 4));
    }

    #[test]
    fn measure_at_finds_covering_measure() {
        let mut score = Score::new();
        for n in 1..=3 {
            score.push_measure(bar(n));
        }
        assert_eq!(score.measure_at(Fraction::ZERO), Some(0));
        assert_eq!(score.measure_at(Fraction::new(3, 2)), Some(1));
        assert_eq!(score.measure_at(Fraction::from_integer(2)), Some(2));
        assert_eq!(score.measure_at(Fraction::from_integer(3)), None);
    }

    #[test]
    fn insert_shifts_attached_systems() {
        let mut score = Score::new();
        for n in 1..=6 {
            score.push_measure(bar(n));
        }
        attached(&mut score, &[0..3, 3..6]);
        score.insert_measure(1, bar(99));
        assert_eq!(score.systems()[0].measures, 0..4);
        assert_eq!(score.systems()[1].measures, 4..7);
        assert_eq!(score.measures()[6].tick, Fraction::from_integer(6));
    }

    #[test]
    fn removing_last_measure_of_system_drops_it() {
        let mut score = Score::new();
        for n in 1..=4 {
            score.push_measure(bar(n));
        }
        attached(&mut score, &[0..3, 3..4]);
        score.remove_measure(3);
        assert_eq!(score.systems().len(), 1);
        assert_eq!(score.pages()[0].systems, 0..1);
    }

    #[test]
    fn edit_reports_old_and_new_extent() {
        let mut score = Score::new();
        for n in 1..=3 {
            score.push_measure(bar(n));
        }
        let range = score
            .edit_measure(1, |m| m.time_sig = TimeSignature::new(2, 4))
            .unwrap();
        assert_eq!(range, (Fraction::from_integer(1), Fraction::from_integer(2)));
        assert_eq!(score.measures()[2].tick, Fraction::new(3, 2));
    }

    #[test]
    fn measure_repeat_blocks_breaks() {
        let m = bar(1).with_element(Element::Spanner(Spanner {
            kind: SpannerKind::MeasureRepeat,
            tick: Fraction::ZERO,
            len: Fraction::from_integer(2),
        }));
        assert_eq!(m.unbreakable_until(), Some(Fraction::from_integer(2)));
        assert!(!m.elements[0].capabilities().is_breakable);

        let slur = bar(2).with_element(Element::Spanner(Spanner {
            kind: SpannerKind::Slur,
            tick: Fraction::ZERO,
            len: Fraction::from_integer(3),
        }));
        assert!(slur.elements[0].capabilities().is_breakable);
        assert_eq!(slur.unbreakable_until(), None);
    }

    #[test]
    fn shrinking_last_measure_stays_inside_score() {
        let mut score = Score::new();
        for n in 1..=4 {
            score.push_measure(bar(n));
        }
        let (from, to) = score
            .edit_measure(3, |m| m.time_sig = TimeSignature::new(3, 4))
            .unwrap();
        assert_eq!(score.end_tick(), Fraction::new(15, 4));
        assert_eq!((from, to), (Fraction::from_integer(3), Fraction::new(15, 4)));
    }

    #[test]
    fn tempo_map_lookup() {
        let mut map = TempoMap::default();
        assert_eq!(map.tempo_at(Fraction::ZERO), DEFAULT_TEMPO);
        map.set_tempo(Fraction::from_integer(2), 90.0);
        map.set_tempo(Fraction::ZERO, 60.0);
        assert_eq!(map.tempo_at(Fraction::new(1, 2)), 60.0);
        assert_eq!(map.tempo_at(Fraction::from_integer(2)), 90.0);
        map.set_tempo(Fraction::from_integer(2), 100.0);
        assert_eq!(map.changes().len(), 2);
    }
}
