//! Linear layout: every measure on one unbounded system.

use std::ops::Range;

use crate::error::LayoutResult;
use crate::geometry::{fallback_height, Rect};
use crate::layout::context::LayoutContext;
use crate::layout::options::LayoutOptions;
use crate::model::{MeasureLayout, Page, Score, System};

/// Lay out `dirty` (or everything when `layout_all`) as one system wrapped
/// in a single implicit page.
pub(crate) fn layout_linear(
    layout_all: bool,
    score: &Score,
    options: &LayoutOptions,
    dirty: Range<usize>,
    ctx: &mut LayoutContext,
) -> LayoutResult<()> {
    reset_systems(layout_all, score, dirty, ctx);
    collect_linear_system(score, options, ctx)
}

/// Start from a clean slate so repeated passes give the same result. Only
/// the dirty measures and the measure after each lose their cached widths.
fn reset_systems(layout_all: bool, score: &Score, dirty: Range<usize>, ctx: &mut LayoutContext) {
    let n = score.measures.len();
    ctx.dirty = if layout_all { 0..n } else { dirty };
    ctx.cursor = 0;
    ctx.cur_width = 0.0;
    ctx.cur_height = 0.0;
    ctx.sys_restart = 0;
    ctx.first_collected = 0;
    ctx.collected = 0;
    ctx.page_restart = 0;
    ctx.systems.clear();
    ctx.pages.clear();
    ctx.measure_layouts.clear();
}

/// Append measures to the single system until the score is exhausted.
fn collect_linear_system(score: &Score, options: &LayoutOptions, ctx: &mut LayoutContext) -> LayoutResult<()> {
    let n = score.measures.len();
    let mut height: f64 = 0.0;

    while ctx.cursor < n {
        let i = ctx.cursor;
        let measure = &score.measures[i];
        // A measure's prefix depends on its predecessor's time signature.
        let stale = ctx.dirty.contains(&i) || (i > 0 && ctx.dirty.contains(&(i - 1)));
        let cached = measure.layout.filter(|l| !stale && !l.unlayoutable);

        let (width, h, unlayoutable) = match cached {
            Some(l) => (l.natural_width, l.height, false),
            None => match ctx.metrics(score, i, options) {
                Ok(m) => (m.width, m.height, false),
                Err(_) => (
                    options.spacing.min_measure_width,
                    fallback_height(measure, options),
                    true,
                ),
            },
        };

        ctx.measure_layouts.push((
            i,
            MeasureLayout {
                x: ctx.cur_width,
                width,
                natural_width: width,
                height: h,
                unlayoutable,
            },
        ));
        ctx.cur_width += width;
        height = height.max(h);
        ctx.cursor += 1;
    }

    let width = ctx.cur_width;
    let m = &options.margins;
    ctx.systems.push(System {
        measures: 0..n,
        bbox: Rect::new(m.left, m.top, width, height),
        natural_width: width,
        justified: false,
        generation: ctx.generation,
    });
    ctx.collected = 1;
    ctx.suffix_next = score.systems.len();
    ctx.pages.push(Page {
        systems: 0..1,
        bbox: Rect::new(0.0, 0.0, width + m.left + m.right, height + m.top + m.bottom),
        generation: ctx.generation,
    });
    ctx.page_old_end = score.pages.len();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    fn score_of(widths: &[f64]) -> Score {
        let mut score = Score::new();
        for (i, &w) in widths.iter().enumerate() {
            score.push_measure(Measure::new(i as i32 + 1, TimeSignature::new(4, 4)).with_width(w));
        }
        score
    }

    #[test]
    fn one_system_sum_of_widths() {
        let score = score_of(&[20.0, 30.0, 50.0, 500.0]);
        let o = LayoutOptions::linear();
        let mut ctx = LayoutContext::new(1);
        layout_linear(true, &score, &o, 0..4, &mut ctx).unwrap();
        assert_eq!(ctx.systems.len(), 1);
        assert_eq!(ctx.systems[0].measures, 0..4);
        assert_eq!(ctx.systems[0].bbox.width(), 600.0);
        assert_eq!(ctx.pages.len(), 1);
        let xs: Vec<f64> = ctx.measure_layouts.iter().map(|(_, l)| l.x).collect();
        assert_eq!(xs, vec![0.0, 20.0, 50.0, 100.0]);
    }

    #[test]
    fn clean_measures_reuse_previous_widths() {
        let mut score = score_of(&[20.0, 30.0]);
        // Pretend a previous pass measured measure 0 differently.
        score.measures[0].layout = Some(MeasureLayout {
            x: 0.0,
            width: 25.0,
            natural_width: 25.0,
            height: 40.0,
            unlayoutable: false,
        });
        let o = LayoutOptions::linear();
        let mut ctx = LayoutContext::new(2);
        layout_linear(false, &score, &o, 1..2, &mut ctx).unwrap();
        assert_eq!(ctx.systems[0].bbox.width(), 55.0);

        let mut ctx = LayoutContext::new(3);
        layout_linear(true, &score, &o, 1..2, &mut ctx).unwrap();
        assert_eq!(ctx.systems[0].bbox.width(), 50.0);
    }

    #[test]
    fn measure_after_dirty_one_is_measured_again() {
        let mut score = score_of(&[20.0, 30.0, 40.0]);
        let stale = MeasureLayout {
            x: 0.0,
            width: 99.0,
            natural_width: 99.0,
            height: 40.0,
            unlayoutable: false,
        };
        for m in &mut score.measures {
            m.layout = Some(stale);
        }
        let o = LayoutOptions::linear();
        let mut ctx = LayoutContext::new(2);
        layout_linear(false, &score, &o, 0..1, &mut ctx).unwrap();
        let widths: Vec<f64> = ctx.measure_layouts.iter().map(|(_, l)| l.width).collect();
        assert_eq!(widths, vec![20.0, 30.0, 99.0]);
    }
}
