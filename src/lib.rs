//! scorelayout: incremental system and page layout for music scores.
//!
//! Measures are broken into systems (lines) and systems into pages. After
//! an edit only the affected part of the score is laid out again; the rest
//! keeps its geometry.
//!
//! # Example
//! ```
//! use scorelayout::{Layout, LayoutOptions, Measure, Score, TimeSignature};
//!
//! let mut score = Score::new();
//! for n in 1..=8 {
//!     score.push_measure(Measure::new(n, TimeSignature::new(4, 4)).with_width(150.0));
//! }
//! let options = LayoutOptions::default();
//! let report = Layout::new(&mut score).do_layout(&options).unwrap();
//! println!("Systems: {}", score.systems().len());
//! println!("Pages: {:?}", report.pages);
//! ```

pub mod error;
pub mod fraction;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod playback;
pub mod timemap;

pub use error::{LayoutError, LayoutResult};
pub use fraction::Fraction;
pub use layout::options::{LayoutMode, LayoutOptions, Margins, SpacingRules};
pub use layout::{Layout, LayoutReport};
pub use model::*;
pub use playback::{generate_playback_map, playback_map_to_json};
pub use timemap::generate_timemap;

/// Convert a score, with any attached geometry, to a JSON string.
/// Useful for passing data across FFI boundaries.
pub fn score_to_json(score: &Score) -> LayoutResult<String> {
    Ok(serde_json::to_string_pretty(score)?)
}

/// Read a score from JSON. Measure ticks are recomputed from the measure
/// lengths, so a document only needs to get the order right. A measure
/// with a negative length is rejected.
pub fn score_from_json(json: &str) -> LayoutResult<Score> {
    let mut score: Score = serde_json::from_str(json)?;
    let backwards = score
        .measures()
        .iter()
        .position(|m| m.duration().is_negative());
    if let Some(index) = backwards {
        return Err(LayoutError::Serialization(format!(
            "measure {index} has negative length {}",
            score.measures()[index].duration()
        )));
    }
    score.retick_from(0);
    Ok(score)
}

/// Read a score and options, lay out the whole score, and return the
/// score with its geometry as JSON. An empty `options_json` selects the
/// defaults.
pub fn layout_score_json(score_json: &str, options_json: &str) -> LayoutResult<String> {
    let mut score = score_from_json(score_json)?;
    let options = if options_json.trim().is_empty() {
        LayoutOptions::default()
    } else {
        LayoutOptions::from_json(options_json)?
    };
    Layout::new(&mut score).do_layout(&options)?;
    score_to_json(&score)
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI: for iOS (static library) and Android (shared library)
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Lay out a JSON score and return the laid-out score as a C string.
/// The caller must free the returned string with `scorelayout_free_string`.
/// Returns null on any error.
///
/// # Safety
/// `score_json` must be a valid null-terminated UTF-8 C string.
/// `options_json` may be null to use the default options.
#[no_mangle]
pub unsafe extern "C" fn scorelayout_layout_json(
    score_json: *const c_char,
    options_json: *const c_char,
) -> *mut c_char {
    if score_json.is_null() {
        return std::ptr::null_mut();
    }
    let score_str = match unsafe { CStr::from_ptr(score_json) }.to_str() {
        Ok(s) => s,
        Err(_) => return std::ptr::null_mut(),
    };
    let options_str = if options_json.is_null() {
        ""
    } else {
        match unsafe { CStr::from_ptr(options_json) }.to_str() {
            Ok(s) => s,
            Err(_) => return std::ptr::null_mut(),
        }
    };

    match layout_score_json(score_str, options_str) {
        Ok(json) => CString::new(json).unwrap_or_default().into_raw(),
        Err(e) => {
            log::error!("layout failed: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Free a string previously returned by scorelayout functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a scorelayout function, or null.
#[no_mangle]
pub unsafe extern "C" fn scorelayout_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
