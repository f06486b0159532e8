//! Layout facade: turns a score's measures into systems and pages.
//!
//! A pass either lays out the whole score or only the part touched by an
//! edit. Partial passes re-collect systems from the first affected one and
//! stop as soon as a new system ends where an old one ended past the edit;
//! pages are treated the same way. The result is checked and only then
//! swapped into the score, so readers never see a half-updated layout.

pub(crate) mod constants;
pub(crate) mod context;
pub(crate) mod linear;
pub mod options;
pub(crate) mod pages;
pub(crate) mod range;
pub(crate) mod systems;
pub(crate) mod validate;

use std::ops::Range;

use crate::error::{LayoutError, LayoutResult};
use crate::fraction::Fraction;
use crate::model::{LayoutState, Score};
use context::LayoutContext;
use options::{LayoutMode, LayoutOptions};

/// Summary of a committed pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutReport {
    pub mode: LayoutMode,
    /// Whether every measure was laid out again
    pub full: bool,
    /// Stamp given to systems and pages created by this pass
    pub generation: u64,
    /// Measures marked as changed
    pub dirty_measures: Range<usize>,
    /// Final indices of re-collected systems
    pub systems: Range<usize>,
    /// Final indices of rebuilt pages
    pub pages: Range<usize>,
    /// Measures that could not be measured and were placed alone
    pub warnings: Vec<LayoutError>,
}

/// Lays out one score. Holds the score exclusively for the whole pass.
pub struct Layout<'a> {
    score: &'a mut Score,
}

impl<'a> Layout<'a> {
    pub fn new(score: &'a mut Score) -> Self {
        Self { score }
    }

    /// Lay out the whole score.
    pub fn do_layout(&mut self, options: &LayoutOptions) -> LayoutResult<LayoutReport> {
        let end = self.score.end_tick();
        self.do_layout_range(options, Fraction::ZERO, end)
    }

    /// Lay out the systems overlapping `[from, to)` and whatever follows
    /// until the layout is stable again.
    pub fn do_layout_range(
        &mut self,
        options: &LayoutOptions,
        from: Fraction,
        to: Fraction,
    ) -> LayoutResult<LayoutReport> {
        options.validate()?;
        range::check_range(self.score, from, to)?;

        let generation = self.score.generation + 1;
        let mut ctx = LayoutContext::new(generation);

        if self.score.measures.is_empty() {
            self.score.clear_layout();
            self.score.layout_state = Some(LayoutState {
                options: options.clone(),
            });
            self.score.generation = generation;
            return Ok(LayoutReport {
                mode: options.mode,
                full: true,
                generation,
                dirty_measures: 0..0,
                systems: 0..0,
                pages: 0..0,
                warnings: Vec::new(),
            });
        }

        let full = self.needs_full_layout(options, from, to);
        let dirty = if full {
            0..self.score.measures.len()
        } else {
            range::dirty_measures(self.score, from, to)
        };

        match options.mode {
            LayoutMode::Linear => {
                linear::layout_linear(full, self.score, options, dirty.clone(), &mut ctx)?;
            }
            LayoutMode::Paginated => {
                self.layout_paginated(full, options, dirty.clone(), &mut ctx)?;
            }
        }

        self.check(options, &ctx)?;
        let report = self.commit(options, full, dirty, ctx);

        log::debug!(
            "layout pass {} ({:?}, {}): measures {:?}, systems {:?}, pages {:?}",
            report.generation,
            report.mode,
            if report.full { "full" } else { "partial" },
            report.dirty_measures,
            report.systems,
            report.pages
        );
        for warning in &report.warnings {
            log::warn!("{warning}");
        }
        Ok(report)
    }

    /// A partial pass needs geometry from a pass with the same options that
    /// still starts at the first measure.
    fn needs_full_layout(&self, options: &LayoutOptions, from: Fraction, to: Fraction) -> bool {
        let score = &*self.score;
        let same_options = score
            .layout_state
            .as_ref()
            .is_some_and(|s| &s.options == options);
        let covers_start = score.systems.first().is_some_and(|s| s.measures.start == 0);
        let in_bounds = score
            .systems
            .last()
            .is_some_and(|s| s.measures.end <= score.measures.len());
        let whole_score = from.is_zero() && to == score.end_tick();
        !same_options || !covers_start || !in_bounds || whole_score || score.pages.is_empty()
    }

    fn layout_paginated(
        &mut self,
        full: bool,
        options: &LayoutOptions,
        dirty: Range<usize>,
        ctx: &mut LayoutContext,
    ) -> LayoutResult<()> {
        let score = &*self.score;
        ctx.dirty = dirty.clone();

        if full {
            ctx.cursor = 0;
            ctx.sys_restart = 0;
            ctx.first_collected = 0;
            ctx.page_restart = 0;
        } else {
            let affected = range::affected_systems(score, &dirty);
            let lo = affected.start;
            let Some(page) = score.page_of_system(lo) else {
                return Err(LayoutError::invariant(format!("system {lo} is on no page")));
            };
            let sys_restart = score.pages[page].systems.start;

            ctx.partial = true;
            ctx.page_restart = page;
            ctx.sys_restart = sys_restart;
            ctx.first_collected = lo;
            ctx.cursor = score.systems[lo].measures.start;
            ctx.systems.extend(score.systems[sys_restart..lo].iter().cloned());

            // Trailing measures without a system mean no old boundary can
            // be trusted past the edit.
            let all_assigned = score
                .systems
                .last()
                .is_some_and(|s| s.measures.end == score.measures.len());
            if all_assigned {
                ctx.stable_after = Some(affected.end - 1);
            }
            log::trace!(
                "range layout: dirty measures {:?}, affected systems {:?}, restart page {}",
                dirty,
                affected,
                page
            );
        }

        systems::collect_systems(score, options, ctx)?;
        pages::collect_pages(score, options, ctx);
        Ok(())
    }

    /// Validate the pass output against its unchanged surroundings.
    fn check(&self, options: &LayoutOptions, ctx: &LayoutContext) -> LayoutResult<()> {
        let score = &*self.score;
        let measure_start = match ctx.sys_restart {
            0 => 0,
            s => score.systems[s - 1].measures.end,
        };
        let measure_end = score
            .systems
            .get(ctx.suffix_next)
            .map_or(score.measures.len(), |s| s.measures.start);
        validate::check_systems(
            &score.measures,
            &ctx.systems,
            ctx.sys_restart,
            measure_start..measure_end,
            options,
        )?;

        let offset = ctx.first_collected - ctx.sys_restart;
        let collected = &ctx.systems[offset..offset + ctx.collected];
        validate::check_measure_layouts(collected, &ctx.measure_layouts)?;

        let shift = ctx.suffix_shift();
        let system_end = score
            .pages
            .get(ctx.page_old_end)
            .map_or(ctx.next_system_index(), |p| (p.systems.start as isize + shift) as usize);
        validate::check_pages(
            &score.measures,
            &ctx.pages,
            ctx.sys_restart..system_end,
            |i| ctx.system(i),
        )
    }

    /// Splice the pass output into the score.
    fn commit(
        &mut self,
        options: &LayoutOptions,
        full: bool,
        dirty: Range<usize>,
        ctx: LayoutContext,
    ) -> LayoutReport {
        let score = &mut *self.score;
        let shift = ctx.suffix_shift();
        let first_collected = ctx.first_collected;
        let collected = ctx.collected;
        let page_restart = ctx.page_restart;
        let page_count = ctx.pages.len();

        for (index, layout) in ctx.measure_layouts {
            score.measures[index].layout = Some(layout);
        }
        score
            .systems
            .splice(ctx.sys_restart..ctx.suffix_next, ctx.systems);
        score
            .pages
            .splice(page_restart..ctx.page_old_end, ctx.pages);
        if shift != 0 {
            for page in &mut score.pages[page_restart + page_count..] {
                page.systems.start = (page.systems.start as isize + shift) as usize;
                page.systems.end = (page.systems.end as isize + shift) as usize;
            }
        }
        score.layout_state = Some(LayoutState {
            options: options.clone(),
        });
        score.generation = ctx.generation;

        LayoutReport {
            mode: options.mode,
            full,
            generation: ctx.generation,
            dirty_measures: dirty,
            systems: first_collected..first_collected + collected,
            pages: page_restart..page_restart + page_count,
            warnings: ctx.warnings,
        }
    }
}
