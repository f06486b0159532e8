//! Default layout settings (all in score units, a staff space is 10).

// ── Page & margins ──────────────────────────────────────────────────
pub(crate) const DEFAULT_PAGE_WIDTH: f64 = 820.0;
pub(crate) const DEFAULT_PAGE_HEIGHT: f64 = 1160.0;
pub(crate) const PAGE_MARGIN_LEFT: f64 = 50.0;
pub(crate) const PAGE_MARGIN_RIGHT: f64 = 30.0;
pub(crate) const PAGE_MARGIN_TOP: f64 = 30.0;
pub(crate) const PAGE_MARGIN_BOTTOM: f64 = 30.0;

// ── Staff dimensions ────────────────────────────────────────────────
pub(crate) const STAFF_HEIGHT: f64 = 40.0; // 5 lines, 4 spaces
pub(crate) const STAFF_SPACING: f64 = 60.0; // gap between staves of one system
pub(crate) const SYSTEM_SPACING: f64 = 90.0; // minimum gap between systems
pub(crate) const LYRICS_LINE_HEIGHT: f64 = 18.0;

// ── Prefix widths ───────────────────────────────────────────────────
pub(crate) const CLEF_SPACE: f64 = 32.0;
pub(crate) const KEY_SIG_SHARP_SPACE: f64 = 10.0;
pub(crate) const KEY_SIG_FLAT_SPACE: f64 = 8.0;
pub(crate) const KEY_SIG_PADDING: f64 = 4.0;
pub(crate) const TIME_SIG_SPACE: f64 = 24.0;

// ── Measure packing ─────────────────────────────────────────────────
pub(crate) const MIN_MEASURE_WIDTH: f64 = 38.0;
pub(crate) const MIN_NOTE_DISTANCE: f64 = 12.0;
pub(crate) const SPACING_DENSITY: f64 = 0.865617; // spring growth per doubling of duration
pub(crate) const BARLINE_DISTANCE: f64 = 14.0;
pub(crate) const NOTEHEAD_WIDTH: f64 = 11.0;
pub(crate) const ACCIDENTAL_WIDTH: f64 = 9.0;
pub(crate) const LYRIC_CHAR_WIDTH: f64 = 7.0;
pub(crate) const HARMONY_CHAR_WIDTH: f64 = 8.0;

// ── Justification ───────────────────────────────────────────────────
pub(crate) const LAST_SYSTEM_FILL_LIMIT: f64 = 0.3;
