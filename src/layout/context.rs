//! Working state for one layout pass.

use std::collections::HashMap;
use std::ops::Range;

use crate::error::{LayoutError, LayoutResult};
use crate::geometry::{measure_metrics, MeasureMetrics};
use crate::layout::options::LayoutOptions;
use crate::model::{MeasureLayout, Page, Score, System};

/// Mutable scratchpad threaded through the collectors of one pass.
///
/// Systems are addressed by their index in the final list. `systems[0]`
/// has final index `sys_restart`; everything before it is kept from the
/// previous pass. Old systems from `suffix_next` onwards have not been
/// looked at yet and are reused untouched if the pass stops early.
#[derive(Debug)]
pub struct LayoutContext {
    /// Stamp for systems and pages created by this pass
    pub(crate) generation: u64,
    /// Next measure the system collector consumes
    pub(crate) cursor: usize,
    /// Natural width accumulated by the system in progress
    pub(crate) cur_width: f64,
    /// Height accumulated by the page in progress
    pub(crate) cur_height: f64,
    /// Measures whose content changed
    pub(crate) dirty: Range<usize>,
    /// Old index of the last affected system; an old boundary at or after
    /// it may end system collection early
    pub(crate) stable_after: Option<usize>,
    /// Range pass over existing geometry; identical leading systems are
    /// kept instead of re-stamped
    pub(crate) partial: bool,
    /// Final index of `systems[0]`
    pub(crate) sys_restart: usize,
    /// Final index of the first re-collected system; kept leading systems
    /// move it forward
    pub(crate) first_collected: usize,
    /// Number of re-collected systems in `systems`
    pub(crate) collected: usize,
    /// First old system not consumed yet
    pub(crate) suffix_next: usize,
    /// Old page index the page collector restarts at
    pub(crate) page_restart: usize,
    /// Old page index after the last page replaced by this pass
    pub(crate) page_old_end: usize,
    pub(crate) systems: Vec<System>,
    pub(crate) pages: Vec<Page>,
    /// Geometry for measures of re-collected systems
    pub(crate) measure_layouts: Vec<(usize, MeasureLayout)>,
    metrics: HashMap<usize, LayoutResult<MeasureMetrics>>,
    pub(crate) warnings: Vec<LayoutError>,
}

impl LayoutContext {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            generation,
            cursor: 0,
            cur_width: 0.0,
            cur_height: 0.0,
            dirty: 0..0,
            stable_after: None,
            partial: false,
            sys_restart: 0,
            first_collected: 0,
            collected: 0,
            suffix_next: 0,
            page_restart: 0,
            page_old_end: 0,
            systems: Vec::new(),
            pages: Vec::new(),
            measure_layouts: Vec::new(),
            metrics: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Intrinsic metrics of measure `index`, computed once per pass. The
    /// first failure for a measure is recorded as a warning.
    pub(crate) fn metrics(
        &mut self,
        score: &Score,
        index: usize,
        options: &LayoutOptions,
    ) -> LayoutResult<MeasureMetrics> {
        if let Some(cached) = self.metrics.get(&index) {
            return cached.clone();
        }
        let result = measure_metrics(score.measures(), index, options);
        if let Err(ref e) = result {
            self.warnings.push(e.clone());
        }
        self.metrics.insert(index, result.clone());
        result
    }

    /// Final index of the next system the context would hold.
    pub(crate) fn next_system_index(&self) -> usize {
        self.sys_restart + self.systems.len()
    }

    /// Make sure the system with final index `index` is in `systems`,
    /// pulling reusable old systems in as needed. Returns false past the
    /// last system.
    pub(crate) fn ensure_system(&mut self, score: &Score, index: usize) -> bool {
        while self.next_system_index() <= index {
            match score.systems.get(self.suffix_next) {
                Some(old) => {
                    self.systems.push(old.clone());
                    self.suffix_next += 1;
                }
                None => return false,
            }
        }
        true
    }

    pub(crate) fn system(&self, index: usize) -> &System {
        &self.systems[index - self.sys_restart]
    }

    pub(crate) fn system_mut(&mut self, index: usize) -> &mut System {
        &mut self.systems[index - self.sys_restart]
    }

    /// Offset between final and old indices of reused suffix systems.
    pub(crate) fn suffix_shift(&self) -> isize {
        self.next_system_index() as isize - self.suffix_next as isize
    }
}
