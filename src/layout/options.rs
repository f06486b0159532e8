//! Layout configuration for one pass.
//!
//! Options deserialize from partial JSON: every missing field takes its
//! default, so `{"mode": "linear"}` is a complete configuration.

use serde::{Deserialize, Serialize};

use super::constants::*;
use crate::error::{LayoutError, LayoutResult};
use crate::fraction::Fraction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// One unbounded system, no pages to speak of
    Linear,
    /// Systems broken to the line width, grouped onto pages
    #[default]
    Paginated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: PAGE_MARGIN_TOP,
            bottom: PAGE_MARGIN_BOTTOM,
            left: PAGE_MARGIN_LEFT,
            right: PAGE_MARGIN_RIGHT,
        }
    }
}

/// Horizontal spacing constants used by width estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingRules {
    pub staff_height: f64,
    pub lyric_line_height: f64,
    pub min_measure_width: f64,
    /// Spring length of the reference duration
    pub min_note_distance: f64,
    /// Extra spring per doubling of duration
    pub spacing_density: f64,
    /// Duration that gets exactly `min_note_distance`
    pub reference_duration: Fraction,
    pub barline_distance: f64,
    pub note_head_width: f64,
    pub accidental_width: f64,
    pub lyric_char_width: f64,
    pub harmony_char_width: f64,
    pub clef_width: f64,
    pub key_sig_sharp_width: f64,
    pub key_sig_flat_width: f64,
    pub key_sig_padding: f64,
    pub time_sig_width: f64,
}

impl Default for SpacingRules {
    fn default() -> Self {
        Self {
            staff_height: STAFF_HEIGHT,
            lyric_line_height: LYRICS_LINE_HEIGHT,
            min_measure_width: MIN_MEASURE_WIDTH,
            min_note_distance: MIN_NOTE_DISTANCE,
            spacing_density: SPACING_DENSITY,
            reference_duration: Fraction::new(1, 16),
            barline_distance: BARLINE_DISTANCE,
            note_head_width: NOTEHEAD_WIDTH,
            accidental_width: ACCIDENTAL_WIDTH,
            lyric_char_width: LYRIC_CHAR_WIDTH,
            harmony_char_width: HARMONY_CHAR_WIDTH,
            clef_width: CLEF_SPACE,
            key_sig_sharp_width: KEY_SIG_SHARP_SPACE,
            key_sig_flat_width: KEY_SIG_FLAT_SPACE,
            key_sig_padding: KEY_SIG_PADDING,
            time_sig_width: TIME_SIG_SPACE,
        }
    }
}

/// Read-only configuration snapshot for one layout pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub mode: LayoutMode,
    pub page_width: f64,
    pub page_height: f64,
    pub margins: Margins,
    /// Gap between staves inside one system
    pub staff_spacing: f64,
    /// Minimum gap between systems on a page
    pub system_spacing: f64,
    /// Upper bound for a gap after vertical justification
    pub max_system_distance: Option<f64>,
    /// Always stretch the last system of a section to the line width
    pub justify_last_system: bool,
    /// Stretch the last system anyway once it is at least this full (0..=1)
    pub last_system_fill_limit: f64,
    /// Spread systems on the final page too
    pub justify_last_page: bool,
    /// How far a system may overshoot the line width and still take the
    /// next measure
    pub line_width_tolerance: f64,
    /// Left indentation of the first system
    pub first_system_indent: f64,
    pub spacing: SpacingRules,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            mode: LayoutMode::Paginated,
            page_width: DEFAULT_PAGE_WIDTH,
            page_height: DEFAULT_PAGE_HEIGHT,
            margins: Margins::default(),
            staff_spacing: STAFF_SPACING,
            system_spacing: SYSTEM_SPACING,
            max_system_distance: None,
            justify_last_system: false,
            last_system_fill_limit: LAST_SYSTEM_FILL_LIMIT,
            justify_last_page: false,
            line_width_tolerance: 0.0,
            first_system_indent: 0.0,
            spacing: SpacingRules::default(),
        }
    }
}

impl LayoutOptions {
    /// Parse options from JSON and validate them.
    pub fn from_json(json: &str) -> LayoutResult<Self> {
        let options: LayoutOptions =
            serde_json::from_str(json).map_err(|e| LayoutError::InvalidOptions(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn linear() -> Self {
        Self {
            mode: LayoutMode::Linear,
            ..Self::default()
        }
    }

    /// Width available to systems between the side margins.
    pub fn line_width(&self) -> f64 {
        self.page_width - self.margins.left - self.margins.right
    }

    /// Width available to system `index`; the first one is indented.
    pub fn line_width_for(&self, index: usize) -> f64 {
        if index == 0 {
            self.line_width() - self.first_system_indent
        } else {
            self.line_width()
        }
    }

    /// Height available to systems between top and bottom margins.
    pub fn usable_height(&self) -> f64 {
        self.page_height - self.margins.top - self.margins.bottom
    }

    pub fn validate(&self) -> LayoutResult<()> {
        fn positive(name: &str, v: f64) -> LayoutResult<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(LayoutError::InvalidOptions(format!("{name} must be positive, got {v}")))
            }
        }
        fn non_negative(name: &str, v: f64) -> LayoutResult<()> {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(LayoutError::InvalidOptions(format!("{name} must not be negative, got {v}")))
            }
        }

        non_negative("margins.top", self.margins.top)?;
        non_negative("margins.bottom", self.margins.bottom)?;
        non_negative("margins.left", self.margins.left)?;
        non_negative("margins.right", self.margins.right)?;
        non_negative("staff_spacing", self.staff_spacing)?;
        non_negative("system_spacing", self.system_spacing)?;
        non_negative("line_width_tolerance", self.line_width_tolerance)?;
        non_negative("first_system_indent", self.first_system_indent)?;
        if let Some(max) = self.max_system_distance {
            non_negative("max_system_distance", max)?;
        }
        if !(0.0..=1.0).contains(&self.last_system_fill_limit) {
            return Err(LayoutError::InvalidOptions(format!(
                "last_system_fill_limit must lie in 0..=1, got {}",
                self.last_system_fill_limit
            )));
        }

        if self.mode == LayoutMode::Paginated {
            positive("page_width", self.page_width)?;
            positive("page_height", self.page_height)?;
            positive("line width", self.line_width_for(0))?;
            positive("usable page height", self.usable_height())?;
        }

        let s = &self.spacing;
        positive("spacing.staff_height", s.staff_height)?;
        positive("spacing.min_measure_width", s.min_measure_width)?;
        positive("spacing.min_note_distance", s.min_note_distance)?;
        non_negative("spacing.spacing_density", s.spacing_density)?;
        non_negative("spacing.lyric_line_height", s.lyric_line_height)?;
        non_negative("spacing.barline_distance", s.barline_distance)?;
        non_negative("spacing.note_head_width", s.note_head_width)?;
        non_negative("spacing.accidental_width", s.accidental_width)?;
        non_negative("spacing.lyric_char_width", s.lyric_char_width)?;
        non_negative("spacing.harmony_char_width", s.harmony_char_width)?;
        non_negative("spacing.clef_width", s.clef_width)?;
        non_negative("spacing.key_sig_sharp_width", s.key_sig_sharp_width)?;
        non_negative("spacing.key_sig_flat_width", s.key_sig_flat_width)?;
        non_negative("spacing.key_sig_padding", s.key_sig_padding)?;
        non_negative("spacing.time_sig_width", s.time_sig_width)?;
        if !s.reference_duration.is_positive() {
            return Err(LayoutError::InvalidOptions(format!(
                "spacing.reference_duration must be positive, got {}",
                s.reference_duration
            )));
        }
        Ok(())
    }
}
