//! Playback map: maps laid-out measure positions to timing information
//! from the timemap, so a player can move a cursor across the pages.
//!
//! The cursor uses **measure bounding boxes** and **linear interpolation**:
//!   `cursor_x = measure.x + (offset / duration) * measure.width`
//!
//! Positions are read from the geometry attached by the last layout pass;
//! measures without geometry are left out.

use serde::Serialize;

use crate::model::Score;
use crate::timemap::{self, TimemapEntry};

/// Complete playback map combining visual positions with timing data.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackMap {
    /// Visual position of each laid-out measure.
    pub measures: Vec<MeasurePosition>,
    /// Visual position of each system (line of music).
    pub systems: Vec<SystemPosition>,
    /// Timing data for each measure in score order.
    pub timemap: Vec<TimemapEntryJson>,
}

/// Visual position of a measure, in page coordinates.
#[derive(Debug, Clone, Serialize)]
pub struct MeasurePosition {
    /// Index into the score's measures
    pub measure_idx: usize,
    /// X coordinate of the measure's left edge
    pub x: f64,
    /// Width of the measure
    pub width: f64,
    /// Which system (line) this measure belongs to (0-based)
    pub system_idx: usize,
    /// Which page the system sits on (0-based)
    pub page_idx: usize,
}

/// Visual position and dimensions of a system (line of music).
#[derive(Debug, Clone, Serialize)]
pub struct SystemPosition {
    pub page_idx: usize,
    pub x: f64,
    /// Y coordinate of the system's top staff line
    pub y: f64,
    pub width: f64,
    /// Total height of the system (staves + lyrics)
    pub height: f64,
}

/// Serializable version of TimemapEntry for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct TimemapEntryJson {
    /// Measure index
    pub index: usize,
    /// Start position as "numerator/denominator" whole notes
    pub tick: String,
    /// Start time in milliseconds
    pub timestamp_ms: f64,
    /// Duration in milliseconds
    pub duration_ms: f64,
    /// Tempo at this measure (BPM)
    pub tempo_bpm: f64,
}

impl From<&TimemapEntry> for TimemapEntryJson {
    fn from(e: &TimemapEntry) -> Self {
        Self {
            index: e.index,
            tick: e.tick.to_string(),
            timestamp_ms: e.timestamp_ms,
            duration_ms: e.duration_ms,
            tempo_bpm: e.tempo_bpm,
        }
    }
}

/// Generate a playback map from the score's current layout.
pub fn generate_playback_map(score: &Score) -> PlaybackMap {
    let mut measures = Vec::new();
    let mut systems = Vec::with_capacity(score.systems().len());

    for (system_idx, system) in score.systems().iter().enumerate() {
        let page_idx = score.page_of_system(system_idx).unwrap_or(0);
        systems.push(SystemPosition {
            page_idx,
            x: system.bbox.x(),
            y: system.bbox.y(),
            width: system.bbox.width(),
            height: system.bbox.height(),
        });

        for measure_idx in system.measures.clone() {
            let Some(layout) = score.measure(measure_idx).and_then(|m| m.layout) else {
                continue;
            };
            measures.push(MeasurePosition {
                measure_idx,
                x: system.bbox.x() + layout.x,
                width: layout.width,
                system_idx,
                page_idx,
            });
        }
    }

    let timemap = timemap::generate_timemap(score)
        .iter()
        .map(TimemapEntryJson::from)
        .collect();

    PlaybackMap {
        measures,
        systems,
        timemap,
    }
}

/// Serialize a PlaybackMap to JSON.
pub fn playback_map_to_json(map: &PlaybackMap) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
}
