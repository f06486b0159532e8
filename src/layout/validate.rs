//! Consistency checks run on a pass's output before it is committed.

use std::ops::Range;

use crate::error::{LayoutError, LayoutResult};
use crate::layout::options::{LayoutMode, LayoutOptions};
use crate::model::{Measure, Page, System};

/// Width slack allowed between a justified system and its line.
const WIDTH_SLACK: f64 = 1e-6;

/// Check that `systems` (final indices starting at `first_index`) cover
/// measures `expected` contiguously and honor forced breaks.
pub(crate) fn check_systems(
    measures: &[Measure],
    systems: &[System],
    first_index: usize,
    expected: Range<usize>,
    options: &LayoutOptions,
) -> LayoutResult<()> {
    let mut next = expected.start;
    for (j, system) in systems.iter().enumerate() {
        let index = first_index + j;
        let r = &system.measures;
        if r.start != next {
            return Err(LayoutError::invariant(format!(
                "system {index} starts at measure {} but measure {next} is next",
                r.start
            )));
        }
        if r.is_empty() {
            return Err(LayoutError::invariant(format!("system {index} holds no measures")));
        }
        if r.end > measures.len() {
            return Err(LayoutError::invariant(format!(
                "system {index} reaches past the last measure"
            )));
        }
        if let Some(i) = (r.start..r.end - 1).find(|&i| measures[i].breaks.ends_system()) {
            return Err(LayoutError::invariant(format!(
                "forced break after measure {i} not honored by system {index}"
            )));
        }
        if options.mode == LayoutMode::Paginated && system.justified {
            let line = options.line_width_for(index);
            if (system.bbox.width() - line).abs() > WIDTH_SLACK {
                return Err(LayoutError::invariant(format!(
                    "justified system {index} is {} wide, line is {line}",
                    system.bbox.width()
                )));
            }
        }
        next = r.end;
    }
    if next != expected.end {
        return Err(LayoutError::invariant(format!(
            "systems end at measure {next}, expected {}",
            expected.end
        )));
    }
    Ok(())
}

/// Check that `pages` cover systems `expected` contiguously and that page
/// breaks fall at page ends. `system_at` resolves a final system index.
pub(crate) fn check_pages<'a, F>(
    measures: &[Measure],
    pages: &[Page],
    expected: Range<usize>,
    system_at: F,
) -> LayoutResult<()>
where
    F: Fn(usize) -> &'a System,
{
    let mut next = expected.start;
    for page in pages {
        let r = &page.systems;
        if r.start != next || r.is_empty() {
            return Err(LayoutError::invariant(format!(
                "page covering systems {}..{} breaks the sequence at system {next}",
                r.start, r.end
            )));
        }
        for s in r.start..r.end - 1 {
            let last = system_at(s).measures.end - 1;
            if measures[last].breaks.page {
                return Err(LayoutError::invariant(format!(
                    "page break after measure {last} not honored"
                )));
            }
        }
        next = r.end;
    }
    if next != expected.end {
        return Err(LayoutError::invariant(format!(
            "pages end at system {next}, expected {}",
            expected.end
        )));
    }
    Ok(())
}

/// Every measure of the re-collected systems got exactly one geometry.
pub(crate) fn check_measure_layouts(
    collected: &[System],
    layouts: &[(usize, crate::model::MeasureLayout)],
) -> LayoutResult<()> {
    let expected: usize = collected.iter().map(|s| s.measures.len()).sum();
    if layouts.len() != expected {
        return Err(LayoutError::invariant(format!(
            "{} measure layouts for {expected} measures",
            layouts.len()
        )));
    }
    let covered = collected
        .iter()
        .flat_map(|s| s.measures.clone())
        .zip(layouts.iter().map(|(i, _)| *i))
        .all(|(a, b)| a == b);
    if !covered {
        return Err(LayoutError::invariant("measure layouts out of order"));
    }
    Ok(())
}
