//! Page collector: stacks systems onto pages and spreads them vertically.

use crate::geometry::{Rect, EPSILON};
use crate::layout::context::LayoutContext;
use crate::layout::options::LayoutOptions;
use crate::model::{Page, Score};

/// Collect pages starting at system `ctx.sys_restart` until the systems run
/// out or a page ends on an old page boundary inside the reused suffix.
pub(crate) fn collect_pages(score: &Score, options: &LayoutOptions, ctx: &mut LayoutContext) {
    let suffix_start = ctx.first_collected + ctx.collected;
    let reusable = ctx.suffix_next < score.systems.len();
    let mut cursor = ctx.sys_restart;

    while ctx.ensure_system(score, cursor) {
        let start = cursor;
        cursor = collect_page(score, options, ctx, start);
        let is_last = !ctx.ensure_system(score, cursor);
        place_page(options, ctx, start..cursor, is_last);

        if reusable && cursor >= suffix_start {
            if let Some(q) = stable_page(score, ctx, cursor) {
                ctx.page_old_end = q + 1;
                return;
            }
        }
    }
    ctx.page_old_end = score.pages.len();
}

/// Old page whose end matches final system index `end` once mapped back.
fn stable_page(score: &Score, ctx: &LayoutContext, end: usize) -> Option<usize> {
    let old_end = end as isize - ctx.suffix_shift();
    if old_end < 0 {
        return None;
    }
    let old_end = old_end as usize;
    let old = &score.pages;
    let q = old.partition_point(|p| p.systems.end < old_end);
    (q < old.len() && old[q].systems.end == old_end && q >= ctx.page_restart).then_some(q)
}

/// Take systems from `start` onto one page; returns the end index.
fn collect_page(score: &Score, options: &LayoutOptions, ctx: &mut LayoutContext, start: usize) -> usize {
    let usable = options.usable_height();
    let mut cursor = start;
    ctx.cur_height = 0.0;

    while ctx.ensure_system(score, cursor) {
        let system = ctx.system(cursor);
        let h = system.bbox.height();
        let need = if cursor == start {
            h
        } else {
            ctx.cur_height + options.system_spacing + h
        };
        if cursor > start && need > usable + EPSILON {
            break;
        }
        let page_break = score.measures[system.measures.end - 1].breaks.page;
        ctx.cur_height = need;
        cursor += 1;
        if page_break {
            break;
        }
    }
    cursor
}

/// Set system y positions and push the page.
fn place_page(options: &LayoutOptions, ctx: &mut LayoutContext, systems: std::ops::Range<usize>, is_last: bool) {
    let count = systems.len();
    let leftover = options.usable_height() - ctx.cur_height;

    let mut gap = options.system_spacing;
    if count > 1 && leftover > 0.0 && (!is_last || options.justify_last_page) {
        let mut extra = leftover / (count - 1) as f64;
        if let Some(max) = options.max_system_distance {
            extra = extra.min((max - options.system_spacing).max(0.0));
        }
        gap += extra;
    }

    let mut y = options.margins.top;
    for i in systems.clone() {
        let system = ctx.system_mut(i);
        system.bbox.origin.y = y;
        y += system.bbox.height() + gap;
    }

    ctx.pages.push(Page {
        systems,
        bbox: Rect::new(0.0, 0.0, options.page_width, options.page_height),
        generation: ctx.generation,
    });
}
