//! System collector: greedy line breaking of measures into systems.

use crate::error::LayoutResult;
use crate::fraction::Fraction;
use crate::geometry::{fallback_height, Rect, EPSILON};
use crate::layout::context::LayoutContext;
use crate::layout::options::LayoutOptions;
use crate::model::{MeasureLayout, Score, System};

/// A measure taken into the system in progress.
#[derive(Debug, Clone, Copy)]
struct Slot {
    index: usize,
    width: f64,
    height: f64,
    /// A non-breakable spanner crosses the barline after this measure
    blocked_after: bool,
}

/// Collect systems from `ctx.cursor` until the score ends or a new system
/// ends on an old system boundary past the affected region.
pub(crate) fn collect_systems(
    score: &Score,
    options: &LayoutOptions,
    ctx: &mut LayoutContext,
) -> LayoutResult<()> {
    let n = score.measures.len();
    while ctx.cursor < n {
        let mark = ctx.measure_layouts.len();
        let system = collect_system(score, options, ctx)?;
        let end = system.measures.end;
        if ctx.partial && ctx.collected == 0 && unchanged(score, ctx, &system, mark) {
            // Leading system came out as before; it keeps its old stamp.
            let old = score.systems[ctx.next_system_index()].clone();
            ctx.measure_layouts.truncate(mark);
            ctx.systems.push(old);
            ctx.first_collected += 1;
        } else {
            ctx.systems.push(system);
            ctx.collected += 1;
        }

        if let Some(k) = stable_boundary(score, ctx, end) {
            ctx.suffix_next = k + 1;
            return Ok(());
        }
    }
    ctx.suffix_next = score.systems.len();
    Ok(())
}

/// Whether `system`, collected at the next final index, equals the old
/// system there, measure geometry included. Vertical placement is left to
/// the page collector.
fn unchanged(score: &Score, ctx: &LayoutContext, system: &System, mark: usize) -> bool {
    let Some(old) = score.systems.get(ctx.next_system_index()) else {
        return false;
    };
    let same_frame = old.measures == system.measures
        && old.bbox.x() == system.bbox.x()
        && old.bbox.width() == system.bbox.width()
        && old.bbox.height() == system.bbox.height()
        && old.natural_width == system.natural_width
        && old.justified == system.justified;
    same_frame
        && ctx.measure_layouts[mark..]
            .iter()
            .all(|(i, layout)| score.measures[*i].layout.as_ref() == Some(layout))
}

/// Old system index whose end matches `end`, if collection may stop there.
fn stable_boundary(score: &Score, ctx: &LayoutContext, end: usize) -> Option<usize> {
    let after = ctx.stable_after?;
    let old = &score.systems;
    let k = old.partition_point(|s| s.measures.end < end);
    (k < old.len() && old[k].measures.end == end && k >= after).then_some(k)
}

/// Take measures from the cursor into one system and close it.
fn collect_system(
    score: &Score,
    options: &LayoutOptions,
    ctx: &mut LayoutContext,
) -> LayoutResult<System> {
    let measures = &score.measures;
    let n = measures.len();
    let system_index = ctx.next_system_index();
    let line_width = options.line_width_for(system_index);
    let limit = line_width + options.line_width_tolerance + EPSILON;
    let start = ctx.cursor;

    let mut slots: Vec<Slot> = Vec::new();
    let mut blocked_until: Fraction = measures[start].tick;
    let mut unlayoutable = false;
    ctx.cur_width = 0.0;

    while ctx.cursor < n {
        let i = ctx.cursor;
        let measure = &measures[i];

        let metrics = match ctx.metrics(score, i, options) {
            Ok(m) => m,
            Err(_) => {
                // Goes alone on a system of its own.
                if slots.is_empty() {
                    slots.push(Slot {
                        index: i,
                        width: options.spacing.min_measure_width,
                        height: fallback_height(measure, options),
                        blocked_after: false,
                    });
                    ctx.cursor += 1;
                    unlayoutable = true;
                }
                break;
            }
        };

        if !slots.is_empty() && ctx.cur_width + metrics.width > limit {
            let last_blocked = slots.last().is_some_and(|s| s.blocked_after);
            if !last_blocked {
                break;
            }
            if let Some(keep) = slots.iter().rposition(|s| !s.blocked_after) {
                slots.truncate(keep + 1);
                ctx.cursor = start + keep + 1;
                ctx.cur_width = slots.iter().map(|s| s.width).sum();
                break;
            }
            // No barline in this system may break; keep going.
        }

        if let Some(until) = measure.unbreakable_until() {
            blocked_until = blocked_until.max(until);
        }
        slots.push(Slot {
            index: i,
            width: metrics.width,
            height: metrics.height,
            blocked_after: blocked_until > measure.end_tick(),
        });
        ctx.cur_width += metrics.width;
        ctx.cursor += 1;

        if measure.breaks.ends_system() {
            break;
        }
    }

    Ok(close_system(score, options, ctx, &slots, system_index, unlayoutable))
}

/// Justify the collected measures and record their geometry.
fn close_system(
    score: &Score,
    options: &LayoutOptions,
    ctx: &mut LayoutContext,
    slots: &[Slot],
    system_index: usize,
    unlayoutable: bool,
) -> System {
    let line_width = options.line_width_for(system_index);
    let natural: f64 = slots.iter().map(|s| s.width).sum();
    let height = slots.iter().map(|s| s.height).fold(0.0, f64::max);
    let first = slots[0].index;
    let last = slots[slots.len() - 1].index;

    let breaks = score.measures[last].breaks;
    let ends_section = last + 1 == score.measures.len() || breaks.section || breaks.page;
    let overwide_single = slots.len() == 1 && natural > line_width;

    let justify = if unlayoutable || overwide_single || natural <= 0.0 {
        false
    } else if natural > line_width {
        // Squeeze systems that could not break in time.
        true
    } else if ends_section {
        options.justify_last_system || natural / line_width >= options.last_system_fill_limit
    } else {
        true
    };

    let scale = if justify { line_width / natural } else { 1.0 };
    let mut x = 0.0;
    for (j, slot) in slots.iter().enumerate() {
        let width = if justify && j + 1 == slots.len() {
            line_width - x
        } else {
            slot.width * scale
        };
        ctx.measure_layouts.push((
            slot.index,
            MeasureLayout {
                x,
                width,
                natural_width: slot.width,
                height: slot.height,
                unlayoutable,
            },
        ));
        x += width;
    }

    let indent = if system_index == 0 {
        options.first_system_indent
    } else {
        0.0
    };
    System {
        measures: first..last + 1,
        bbox: Rect::new(
            options.margins.left + indent,
            0.0,
            if justify { line_width } else { natural },
            height,
        ),
        natural_width: natural,
        justified: justify,
        generation: ctx.generation,
    }
}
