//! Compute absolute timestamps and durations for each measure.
//! This is the bridge between the score model and playback. It answers
//! "when does each measure start?" and "how long is it?" in wall-clock
//! time. It works from the same rational ticks the layout uses, so the two
//! never disagree about where a measure begins.

use crate::fraction::Fraction;
use crate::model::{Score, TempoMap};

/// Timing information for one measure.
#[derive(Debug, Clone, PartialEq)]
pub struct TimemapEntry {
    /// Measure index (0-based)
    pub index: usize,
    /// Start position in whole notes
    pub tick: Fraction,
    /// Cumulative start time in milliseconds from the beginning
    pub timestamp_ms: f64,
    /// Duration of this measure in milliseconds
    pub duration_ms: f64,
    /// Active tempo (BPM) at the start of this measure
    pub tempo_bpm: f64,
    /// Time signature: (beats, beat_type)
    pub time_sig: (i32, i32),
}

/// Milliseconds elapsed from the start of the score to `tick`, following
/// every tempo change on the way.
pub fn tick_to_ms(tempo_map: &TempoMap, tick: Fraction) -> f64 {
    let mut elapsed = 0.0;
    let mut pos = Fraction::ZERO;
    let mut bpm = tempo_map.tempo_at(Fraction::ZERO);

    for change in tempo_map.changes() {
        if change.tick <= pos {
            continue;
        }
        if change.tick >= tick {
            break;
        }
        elapsed += (change.tick - pos).quarters() * 60_000.0 / bpm;
        pos = change.tick;
        bpm = change.bpm;
    }
    if tick > pos {
        elapsed += (tick - pos).quarters() * 60_000.0 / bpm;
    }
    elapsed
}

/// Generate a timemap for every measure of the score in score order.
pub fn generate_timemap(score: &Score) -> Vec<TimemapEntry> {
    score
        .measures()
        .iter()
        .enumerate()
        .map(|(index, measure)| {
            let start = tick_to_ms(&score.tempo_map, measure.tick);
            let end = tick_to_ms(&score.tempo_map, measure.end_tick());
            TimemapEntry {
                index,
                tick: measure.tick,
                timestamp_ms: start,
                duration_ms: end - start,
                tempo_bpm: score.tempo_map.tempo_at(measure.tick),
                time_sig: (measure.time_sig.beats, measure.time_sig.beat_type),
            }
        })
        .collect()
}

/// Total duration of the entire timemap in milliseconds.
pub fn total_duration_ms(timemap: &[TimemapEntry]) -> f64 {
    timemap.last().map_or(0.0, |e| e.timestamp_ms + e.duration_ms)
}
