//! Range relayout tests: edits only re-collect the systems they touch.

use pretty_assertions::assert_eq;
use scorelayout::geometry::Rect;
use scorelayout::{
    Chord, Element, Fraction, Layout, LayoutOptions, Measure, MeasureLayout, Note, Score, Spanner,
    SpannerKind, TimeSignature,
};
use std::ops::Range;

fn options() -> LayoutOptions {
    let mut o = LayoutOptions::default();
    o.page_width = 100.0;
    o.margins.left = 0.0;
    o.margins.right = 0.0;
    o.justify_last_system = true;
    o
}

fn bar(n: usize, width: f64) -> Measure {
    Measure::new(n as i32 + 1, TimeSignature::new(4, 4)).with_width(width)
}

/// `n` measures of width 20, laid out once: five measures per system.
fn laid_out(n: usize) -> Score {
    let mut score = Score::new();
    for i in 0..n {
        score.push_measure(bar(i, 20.0));
    }
    Layout::new(&mut score).do_layout(&options()).unwrap();
    score
}

fn groups(score: &Score) -> Vec<Range<usize>> {
    score.systems().iter().map(|s| s.measures.clone()).collect()
}

fn generations(score: &Score) -> Vec<u64> {
    score.systems().iter().map(|s| s.generation).collect()
}

/// Lay out the whole score from scratch on a copy.
fn fresh(score: &Score) -> Score {
    fresh_with(score, &options())
}

fn fresh_with(score: &Score, o: &LayoutOptions) -> Score {
    let mut copy = score.clone();
    copy.clear_layout();
    Layout::new(&mut copy).do_layout(o).unwrap();
    copy
}

type SystemGeometry = (Range<usize>, Rect, f64, bool);
type PageGeometry = (Range<usize>, Rect);

/// Everything a pass computes except the generation stamps.
fn geometry(score: &Score) -> (Vec<SystemGeometry>, Vec<PageGeometry>, Vec<Option<MeasureLayout>>) {
    let systems = score
        .systems()
        .iter()
        .map(|s| (s.measures.clone(), s.bbox, s.natural_width, s.justified))
        .collect();
    let pages = score
        .pages()
        .iter()
        .map(|p| (p.systems.clone(), p.bbox))
        .collect();
    let measures = score.measures().iter().map(|m| m.layout).collect();
    (systems, pages, measures)
}

/// Measures with two quarter chords and no nominal width, so widths come
/// from content and the clef and time signature prefixes.
fn with_content(n: usize) -> Score {
    let quarter = |q: i64| {
        Element::Chord(Chord {
            tick: Fraction::new(q, 4),
            duration: Fraction::new(1, 4),
            notes: vec![Note {
                pitch: 64,
                accidental: None,
            }],
            lyrics: Vec::new(),
            staff: 0,
        })
    };
    let mut score = Score::new();
    for i in 0..n {
        let m = Measure::new(i as i32 + 1, TimeSignature::new(4, 4))
            .with_element(quarter(0))
            .with_element(quarter(1));
        score.push_measure(m);
    }
    score
}

#[test]
fn mid_system_edit_touches_one_system() {
    let mut score = laid_out(30);
    assert_eq!(score.systems().len(), 6);

    let (from, to) = score.edit_measure(17, |m| m.width = Some(10.0)).unwrap();
    assert_eq!((from, to), (Fraction::from_integer(17), Fraction::from_integer(18)));
    let report = Layout::new(&mut score).do_layout_range(&options(), from, to).unwrap();

    assert!(!report.full);
    assert_eq!(report.dirty_measures, 17..18);
    assert_eq!(report.systems, 3..4);
    assert_eq!(groups(&score)[3], 15..20);
    assert_eq!(generations(&score), vec![1, 1, 1, 2, 1, 1]);

    let m = score.measures()[17].layout.unwrap();
    assert_eq!(m.natural_width, 10.0);
    assert!(m.width > 10.0);
    println!("✓ edit in system 3 re-collected systems {:?}", report.systems);
}

#[test]
fn edit_in_second_of_two_systems() {
    let mut score = laid_out(10);
    let (from, to) = score.edit_measure(6, |m| m.width = Some(15.0)).unwrap();
    let report = Layout::new(&mut score).do_layout_range(&options(), from, to).unwrap();

    assert_eq!(report.systems, 1..2);
    assert_eq!(groups(&score), vec![0..5, 5..10]);
    assert_eq!(generations(&score), vec![1, 2]);
}

#[test]
fn edit_opening_second_system_keeps_first() {
    let mut score = laid_out(10);
    // Measure 5 opens the second system, so the first one is laid out
    // again but comes out the same.
    let (from, to) = score.edit_measure(5, |m| m.width = Some(18.0)).unwrap();
    let report = Layout::new(&mut score).do_layout_range(&options(), from, to).unwrap();

    assert!(!report.full);
    assert_eq!(report.systems, 1..2);
    assert_eq!(groups(&score), vec![0..5, 5..10]);
    assert_eq!(generations(&score), vec![1, 2]);
    assert_eq!(score.measures()[5].layout.unwrap().natural_width, 18.0);
    assert_eq!(geometry(&score), geometry(&fresh(&score)));
}

#[test]
fn growing_measure_reflows_until_stable() {
    let mut score = laid_out(30);
    let (from, to) = score.edit_measure(17, |m| m.width = Some(60.0)).unwrap();
    let report = Layout::new(&mut score).do_layout_range(&options(), from, to).unwrap();

    assert_eq!(
        groups(&score),
        vec![0..5, 5..10, 10..15, 15..18, 18..23, 23..28, 28..30]
    );
    assert_eq!(report.systems, 3..7);
    assert_eq!(&generations(&score)[..3], &[1, 1, 1]);
    assert_eq!(groups(&score), groups(&fresh(&score)));
}

#[test]
fn boundary_edit_includes_previous_system() {
    let mut score = laid_out(30);
    // Measure 10 opens system 2; shrinking it may pull it back onto system 1.
    let (from, to) = score.edit_measure(10, |m| m.width = Some(5.0)).unwrap();
    let report = Layout::new(&mut score).do_layout_range(&options(), from, to).unwrap();

    // Measure 10 does not fit back, so system 1 comes out unchanged.
    assert_eq!(report.systems.start, 2);
    assert_eq!(geometry(&score), geometry(&fresh(&score)));
    assert_eq!(&generations(&score)[..3], &[1, 1, 2]);
}

#[test]
fn later_pages_untouched() {
    // 20 systems, 9 per page.
    let mut score = laid_out(100);
    assert_eq!(score.pages().len(), 3);

    let (from, to) = score.edit_measure(52, |m| m.width = Some(10.0)).unwrap();
    let report = Layout::new(&mut score).do_layout_range(&options(), from, to).unwrap();

    assert_eq!(report.systems, 10..11);
    assert_eq!(report.pages, 1..2);
    let page_gens: Vec<u64> = score.pages().iter().map(|p| p.generation).collect();
    assert_eq!(page_gens, vec![1, 2, 1]);
    assert_eq!(score.systems()[18].generation, 1);
}

#[test]
fn edit_that_moves_a_page_boundary() {
    let mut score = laid_out(100);
    // A page break after measure 12 cuts page 0 short.
    let (from, to) = score.edit_measure(12, |m| m.breaks.page = true).unwrap();
    Layout::new(&mut score).do_layout_range(&options(), from, to).unwrap();

    let expected = fresh(&score);
    assert_eq!(groups(&score), groups(&expected));
    let pages: Vec<_> = score.pages().iter().map(|p| p.systems.clone()).collect();
    let expected_pages: Vec<_> = expected.pages().iter().map(|p| p.systems.clone()).collect();
    assert_eq!(pages, expected_pages);
    assert_eq!(pages[0], 0..3);
}

#[test]
fn insert_then_relayout() {
    let mut score = laid_out(30);
    let (from, to) = score.insert_measure(12, bar(99, 20.0));
    assert_eq!(groups(&score)[2], 10..16);

    let report = Layout::new(&mut score).do_layout_range(&options(), from, to).unwrap();
    assert_eq!(
        groups(&score),
        vec![0..5, 5..10, 10..15, 15..20, 20..25, 25..30, 30..31]
    );
    assert_eq!(report.systems, 2..7);
    assert_eq!(score.measures()[12].number, 100);
    assert_eq!(score.measures()[30].tick, Fraction::from_integer(30));
}

#[test]
fn remove_then_relayout() {
    let mut score = laid_out(30);
    let removed = score.remove_measure(12).unwrap();
    let at = removed.tick;
    Layout::new(&mut score).do_layout_range(&options(), at, at).unwrap();

    assert_eq!(
        groups(&score),
        vec![0..5, 5..10, 10..15, 15..20, 20..25, 25..29]
    );
    assert_eq!(&generations(&score)[..2], &[1, 1]);
}

#[test]
fn removing_a_lone_system() {
    let mut score = Score::new();
    for i in 0..11 {
        score.push_measure(bar(i, 20.0));
    }
    Layout::new(&mut score).do_layout(&options()).unwrap();
    assert_eq!(groups(&score), vec![0..5, 5..10, 10..11]);

    let removed = score.remove_measure(10).unwrap();
    assert_eq!(groups(&score), vec![0..5, 5..10]);
    let end = score.end_tick();
    assert_eq!(removed.tick, end);
    Layout::new(&mut score).do_layout_range(&options(), end, end).unwrap();
    assert_eq!(groups(&score), vec![0..5, 5..10]);
}

#[test]
fn empty_range_marks_one_measure() {
    let mut score = laid_out(30);
    let at = Fraction::from_integer(22);
    let report = Layout::new(&mut score).do_layout_range(&options(), at, at).unwrap();
    assert_eq!(report.dirty_measures, 22..23);
    // Nothing changed, so no system gets a new stamp.
    assert!(report.systems.is_empty());
    assert!(generations(&score).iter().all(|&g| g == 1));
}

#[test]
fn new_options_force_full_layout() {
    let mut score = laid_out(30);
    let mut o = options();
    o.page_width = 120.0;
    let report = Layout::new(&mut score)
        .do_layout_range(&o, Fraction::from_integer(3), Fraction::from_integer(4))
        .unwrap();

    assert!(report.full);
    assert_eq!(groups(&score)[0], 0..6);
    assert!(generations(&score).iter().all(|&g| g == 2));
}

#[test]
fn unbreakable_spanner_widens_edit() {
    let mut score = laid_out(30);
    let repeat = Element::Spanner(Spanner {
        kind: SpannerKind::MeasureRepeat,
        tick: Fraction::ZERO,
        len: Fraction::from_integer(2),
    });
    // A two-bar repeat over measures 19 and 20 straddles a system break.
    let (from, to) = score.edit_measure(19, |m| m.elements.push(repeat)).unwrap();
    let report = Layout::new(&mut score).do_layout_range(&options(), from, to).unwrap();

    assert_eq!(report.dirty_measures, 19..21);
    let owner = score.system_of_measure(19).unwrap();
    assert_eq!(score.system_of_measure(20), Some(owner));
    assert_eq!(groups(&score), groups(&fresh(&score)));
}

#[test]
fn matches_full_layout_after_many_edits() {
    let mut score = laid_out(64);
    let edits = [(5, 35.0), (40, 12.0), (41, 70.0), (63, 25.0), (0, 55.0), (22, 90.0)];
    for (i, w) in edits {
        let (from, to) = score.edit_measure(i, |m| m.width = Some(w)).unwrap();
        Layout::new(&mut score).do_layout_range(&options(), from, to).unwrap();
        assert_eq!(geometry(&score), geometry(&fresh(&score)), "after editing measure {i}");
    }
}

#[test]
fn shrinking_the_last_measure() {
    let mut score = laid_out(8);
    let (from, to) = score
        .edit_measure(7, |m| m.time_sig = TimeSignature::new(3, 4))
        .unwrap();
    assert_eq!(to, score.end_tick());

    let report = Layout::new(&mut score).do_layout_range(&options(), from, to).unwrap();
    assert_eq!(report.dirty_measures, 7..8);
    assert_eq!(geometry(&score), geometry(&fresh(&score)));
}

#[test]
fn time_signature_change_remeasures_next_measure() {
    let mut o = LayoutOptions::default();
    o.justify_last_system = true;
    let mut score = with_content(24);
    Layout::new(&mut score).do_layout(&o).unwrap();
    let before = score.measures()[10].layout.unwrap().natural_width;

    let (from, to) = score
        .edit_measure(9, |m| m.time_sig = TimeSignature::new(5, 4))
        .unwrap();
    let report = Layout::new(&mut score).do_layout_range(&o, from, to).unwrap();

    assert!(!report.full);
    assert_eq!(report.dirty_measures, 9..10);
    // Measure 10 now changes back to 4/4 and carries a time signature.
    let after = score.measures()[10].layout.unwrap().natural_width;
    assert!(after > before, "{after} should exceed {before}");
    assert_eq!(geometry(&score), geometry(&fresh_with(&score, &o)));
}

#[test]
fn linear_time_signature_change_remeasures_next_measure() {
    let o = LayoutOptions::linear();
    let mut score = with_content(6);
    Layout::new(&mut score).do_layout(&o).unwrap();

    let (from, to) = score
        .edit_measure(1, |m| m.time_sig = TimeSignature::new(5, 4))
        .unwrap();
    let report = Layout::new(&mut score).do_layout_range(&o, from, to).unwrap();

    assert!(!report.full);
    assert_eq!(geometry(&score), geometry(&fresh_with(&score, &o)));
}

#[test]
fn repeating_a_range_pass_changes_nothing() {
    for o in [options(), LayoutOptions::linear()] {
        let mut score = laid_out(40);
        Layout::new(&mut score).do_layout(&o).unwrap();
        let (from, to) = score.edit_measure(13, |m| m.width = Some(45.0)).unwrap();

        Layout::new(&mut score).do_layout_range(&o, from, to).unwrap();
        let once = geometry(&score);
        Layout::new(&mut score).do_layout_range(&o, from, to).unwrap();
        assert_eq!(geometry(&score), once, "{:?}", o.mode);
        assert_eq!(once, geometry(&fresh_with(&score, &o)), "{:?}", o.mode);
    }
}
