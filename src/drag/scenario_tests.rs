// pitroll -- the interactive editing core of a pitch/beat piano roll
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Whole gestures replayed against small scores.
//!
//! Layout reference at scale 1 with the timeline at 0: `x(beat) = 96 * beat + 16`,
//! `y(pitch) = 40 + 12 * (127 - pitch)`, so C4 sits at y 844.

use super::*;
use crate::collab::{RectSelection, UndoLog};
use crate::note::Pit;
use crate::tone::Tone;
use expect_test::expect;

#[derive(Debug, Default)]
struct RecordingPlayer {
    plays: Vec<Vec<PitResult>>,
    stops: usize,
}

impl NotePlayer for RecordingPlayer {
    fn play(&mut self, pits: Vec<PitResult>) {
        self.plays.push(pits);
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}

type Editor = DragEditor<UndoLog, RectSelection, RecordingPlayer>;

fn editor() -> Editor {
    DragEditor::new(UndoLog::new(), RectSelection::default(), RecordingPlayer::default())
}

fn r(n: i64) -> Rational {
    Rational::int(n)
}

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn empty_score() -> (Score, ToneId) {
    let mut score = Score::new(r(120));
    let tone = score.tones.insert(Tone::default());
    (score, tone)
}

/// Begin at `from`, pass the midpoint and release at `to`.
fn drag(editor: &mut Editor, score: &mut Score, from: Point, to: Point) -> Option<Capture> {
    editor.begin(score, from, 1.0, Modifiers::default())?;
    editor.changed(score, p((from.x + to.x) / 2.0, (from.y + to.y) / 2.0));
    editor.changed(score, to);
    editor.ended(score, to)
}

#[test]
fn last_pit_grows_the_note() {
    let (mut score, tone) = empty_score();
    score.push(Note::new(
        r(60),
        r(0)..r(4),
        vec![Pit::new(r(0), r(0), tone), Pit::new(r(4), r(2), tone)],
    ));
    let mut editor = editor();

    // the second pit sits at (400, 820)
    assert_eq!(
        editor.begin(&mut score, p(398.0, 820.0), 1.0, Modifiers::default()),
        Some(DragMode::Pit)
    );
    assert_eq!(editor.session().map(DragSession::beat_interval), Some(Rational::nth(4)));
    editor.changed(&mut score, p(446.0, 820.0));
    assert_eq!(score.note(0).map(|n| n.pits[1].beat), Some(Rational::new(9, 2)));
    let capture = editor.ended(&mut score, p(494.0, 820.0)).unwrap();

    let note = score.note(0).unwrap();
    assert_eq!(note.beat_range, r(0)..r(5));
    assert_eq!(note.pits[1].beat, r(5));
    assert_eq!(note.pits[1].pitch, r(2));
    assert_eq!(capture.notes.len(), 1);
    assert_eq!(capture.notes[0].old.end(), r(4));
    assert_eq!(editor.undo().groups.len(), 1);

    let last = editor.player().plays.last().unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].pitch, r(62));
    assert_eq!(last[0].beat, r(5));
    assert_eq!(last[0].seconds, Rational::new(5, 2));
    assert_eq!(editor.player().stops, 1);
}

#[test]
fn body_moves_rigidly() {
    let (mut score, tone) = empty_score();
    score.push(Note::simple(r(60), r(0)..r(4), tone));
    let pits = score.note(0).unwrap().pits.clone();
    let mut editor = editor();

    let capture = drag(&mut editor, &mut score, p(200.0, 844.0), p(392.0, 808.0)).unwrap();
    let note = score.note(0).unwrap();
    assert_eq!(note.beat_range, r(2)..r(6));
    assert_eq!(note.pitch, r(63));
    assert_eq!(note.pits, pits);
    assert_eq!(capture.notes.len(), 1);
    assert!(capture.score.is_empty());
}

#[test]
fn body_stays_on_the_surface() {
    let (mut score, tone) = empty_score();
    score.push(Note::simple(r(125), r(1)..r(2), tone));
    let mut editor = editor();
    // y(125) = 64; drag far up and left
    drag(&mut editor, &mut score, p(150.0, 64.0), p(-500.0, 41.0 - 400.0)).unwrap();
    let note = score.note(0).unwrap();
    assert_eq!(note.start(), r(0));
    assert_eq!(note.pitch, r(127));
}

#[test]
fn selected_start_handles_move_together() {
    let (mut score, tone) = empty_score();
    score.push(Note::simple(r(60), r(2)..r(6), tone));
    score.push(Note::simple(r(64), r(3)..r(7), tone));
    let mut editor = editor();
    editor.selection_mut().rects = vec![Rect::from_edges(150.0, 780.0, 700.0, 860.0)];

    assert_eq!(
        editor.begin(&mut score, p(204.0, 844.0), 1.0, Modifiers::default()),
        Some(DragMode::StartBeat)
    );
    let capture = editor.ended(&mut score, p(108.0, 844.0)).unwrap();

    let ranges: Vec<_> = score.iter().map(|n| n.beat_range.clone()).collect();
    assert_eq!(ranges, vec![r(1)..r(6), r(2)..r(7)]);
    // the pits keep their beats on the timeline
    assert_eq!(score.note(0).unwrap().pit_beat(0), Some(r(2)));
    assert_eq!(capture.notes.len(), 2);
    assert_eq!(editor.undo().groups.len(), 1);
    assert_eq!(editor.undo().groups[0].len(), 1);
}

#[test]
fn unselected_note_moves_alone() {
    let (mut score, tone) = empty_score();
    score.push(Note::simple(r(60), r(2)..r(6), tone));
    score.push(Note::simple(r(64), r(3)..r(7), tone));
    let mut editor = editor();
    // selects the second note only
    editor.selection_mut().rects = vec![Rect::from_edges(500.0, 780.0, 700.0, 810.0)];

    let capture = drag(&mut editor, &mut score, p(204.0, 844.0), p(108.0, 844.0)).unwrap();
    assert_eq!(capture.notes.len(), 1);
    assert_eq!(score.note(1).unwrap().start(), r(3));
}

#[test]
fn handles_clamp_at_the_opposite_edge() {
    let (mut score, tone) = empty_score();
    score.push(Note::simple(r(60), r(0)..r(4), tone));
    let mut editor = editor();

    assert_eq!(
        editor.begin(&mut score, p(404.0, 844.0), 1.0, Modifiers::default()),
        Some(DragMode::EndBeat)
    );
    editor.changed(&mut score, p(212.0, 844.0));
    assert_eq!(score.note(0).unwrap().end(), r(2));
    editor.ended(&mut score, p(-400.0, 844.0));
    assert_eq!(score.note(0).unwrap().beat_range, r(0)..r(0));

    // and the start cannot pass the end
    let (mut score, tone) = empty_score();
    score.push(Note::simple(r(60), r(1)..r(2), tone));
    assert_eq!(
        editor.begin(&mut score, p(109.0, 844.0), 1.0, Modifiers::default()),
        Some(DragMode::StartBeat)
    );
    editor.ended(&mut score, p(900.0, 844.0));
    let note = score.note(0).unwrap();
    assert_eq!(note.beat_range, r(2)..r(2));
    assert_eq!(note.pits[0].beat, r(0));
}

#[test]
fn shared_tone_edits_fork_the_tone() {
    let (mut score, shared) = empty_score();
    let other = score.tones.insert(Tone::one_overtone());
    score.push(Note::simple(r(60), r(0)..r(4), shared));
    score.push(Note::new(
        r(48),
        r(4)..r(8),
        vec![Pit::new(r(0), r(0), shared), Pit::new(r(2), r(0), other)],
    ));
    score.push(Note::simple(r(72), r(0)..r(2), other));
    let before = score.clone();
    let mut editor = editor();
    editor.options.edit_tone_notes.insert(0);

    // the middle control point of the default envelope is drawn at (208, 806)
    assert_eq!(
        editor.begin(&mut score, p(208.0, 806.0), 1.0, Modifiers::default()),
        Some(DragMode::AllSprol(1))
    );
    let capture = editor.ended(&mut score, p(208.0, 796.0)).unwrap();

    let forked = score.note(0).unwrap().pits[0].tone;
    assert_ne!(forked, shared);
    assert_eq!(score.note(1).unwrap().pits[0].tone, forked);
    assert_eq!(score.note(1).unwrap().pits[1].tone, other);
    assert_eq!(score.note(2).unwrap().pits[0].tone, other);
    assert_eq!(score.tones.get(shared), before.tones.get(shared));

    let sprol = *score.tones.get(forked).unwrap().spectlope.get(1).unwrap();
    assert!((sprol.pitch - 102.0).abs() < 1e-9, "{:?}", sprol);
    assert_eq!(sprol.volm, 0.5);

    assert_eq!(capture.notes.len(), 2);
    assert!(capture
        .score
        .iter()
        .any(|change| matches!(change, ScoreChange::ToneAdded { id, .. } if *id == forked)));

    assert_eq!(editor.undo_mut().undo(&mut score), Ok(true));
    assert_eq!(score.notes(), before.notes());
}

#[test]
fn tone_edit_back_to_the_start_keeps_ids() {
    let (mut score, shared) = empty_score();
    score.push(Note::simple(r(60), r(0)..r(4), shared));
    let mut editor = editor();
    editor.options.edit_tone_notes.insert(0);

    editor.begin(&mut score, p(208.0, 806.0), 1.0, Modifiers::default());
    editor.changed(&mut score, p(230.0, 780.0));
    assert_ne!(score.note(0).unwrap().pits[0].tone, shared);
    assert_eq!(editor.ended(&mut score, p(208.0, 806.0)), None);
    assert_eq!(score.note(0).unwrap().pits[0].tone, shared);
    assert!(editor.undo().groups.is_empty());
}

#[test]
fn even_amplitude_and_panel_height() {
    let (mut score, shared) = empty_score();
    score.push(Note::simple(r(60), r(0)..r(4), shared));
    let mut editor = editor();
    editor.options.edit_tone_notes.insert(0);

    // frame from (16, 782) to (400, 830), the even knob on its top right corner
    assert_eq!(
        editor.begin(&mut score, p(396.0, 795.0), 1.0, Modifiers::default()),
        Some(DragMode::EvenAmplitude)
    );
    editor.ended(&mut score, p(396.0, 819.0));
    let tone = score.tones.get(score.note(0).unwrap().pits[0].tone).unwrap();
    assert_eq!(tone.overtone.even_amplitude, 0.5);

    assert_eq!(
        editor.begin(&mut score, p(300.0, 786.0), 1.0, Modifiers::default()),
        Some(DragMode::SpectlopeHeight)
    );
    editor.changed(&mut score, p(300.0, 756.0));
    assert_eq!(score.note(0).unwrap().spectlope_height, 78.0);
    editor.ended(&mut score, p(300.0, 986.0));
    assert_eq!(score.note(0).unwrap().spectlope_height, MIN_SPECTLOPE_HEIGHT);
    assert_eq!(editor.undo().groups.len(), 2);
}

#[test]
fn unmoved_gestures_change_nothing() {
    let (mut score, shared) = empty_score();
    let other = score.tones.insert(Tone::one_overtone());
    score.push(Note::simple(r(60), r(0)..r(4), shared));
    score.push(Note::new(
        r(48),
        r(4)..r(8),
        vec![Pit::new(r(0), r(0), shared), Pit::new(r(2), r(0), other)],
    ));
    score.key_beats = vec![r(2)];
    score.scales = vec![r(36)];
    let before = score.clone();

    let gestures = [
        (p(200.0, 844.0), DragMode::Note),
        (p(590.0, 988.0), DragMode::Pit),
        (p(788.0, 988.0), DragMode::EndBeat),
        (p(208.0, 20.0), DragMode::KeyBeat(0)),
        (p(1000.0, 20.0), DragMode::AllBeat),
        (p(300.0, 1132.0), DragMode::Scale(0)),
        (p(208.0, 806.0), DragMode::AllSprol(1)),
        (p(300.0, 786.0), DragMode::SpectlopeHeight),
    ];
    for &(point, mode) in gestures.iter() {
        let mut editor = editor();
        editor.options.edit_tone_notes.insert(0);
        assert_eq!(
            editor.begin(&mut score, point, 1.0, Modifiers::default()),
            Some(mode)
        );
        assert_eq!(editor.ended(&mut score, point), None, "{:?}", mode);
        assert!(editor.undo().groups.is_empty());
        assert_eq!(score, before, "{:?}", mode);
    }
}

#[test]
fn pit_beats_never_go_negative() {
    let (mut score, tone) = empty_score();
    score.push(Note::new(
        r(60),
        r(1)..r(5),
        vec![
            Pit::new(r(0), r(0), tone),
            Pit::new(r(1), r(0), tone),
            Pit::new(r(2), r(0), tone),
        ],
    ));
    let before = score.clone();
    let mut editor = editor();
    let from = p(113.0, 845.0);
    assert_eq!(
        editor.begin(&mut score, from, 1.0, Modifiers::default()),
        Some(DragMode::Pit)
    );

    for &dx in [-300.0, -50.0, 30.0, 500.0, -1000.0, 7.0, 0.0].iter() {
        editor.changed(&mut score, p(from.x + dx, from.y));
        let note = score.note(0).unwrap();
        assert!(note.start() >= r(0), "{:?}", note);
        assert!(note.pits.iter().all(|pit| pit.beat >= r(0)), "{:?}", note);
        assert!(note.pits.windows(2).all(|w| w[0].beat <= w[1].beat), "{:?}", note);
    }
    // the far left frame moved the start to 0 and kept the other pits in place
    editor.changed(&mut score, p(from.x - 300.0, from.y));
    let note = score.note(0).unwrap();
    assert_eq!(note.beat_range, r(0)..r(5));
    assert_eq!(note.pit_beat(1), Some(r(2)));

    assert_eq!(editor.ended(&mut score, from), None);
    assert_eq!(score, before);
}

#[test]
fn selected_pits_move_as_one() {
    let (mut score, tone) = empty_score();
    score.push(Note::new(
        r(60),
        r(0)..r(4),
        (0..4).map(|beat| Pit::new(r(beat), r(0), tone)).collect(),
    ));
    let mut editor = editor();
    // pits 1 and 2 sit at (208, 844) and (304, 844)
    editor.selection_mut().rects = vec![Rect::from_edges(150.0, 830.0, 350.0, 860.0)];
    let beats = |score: &Score| -> Vec<String> {
        let note = score.note(0).unwrap();
        note.pits.iter().map(|pit| pit.beat.to_string()).collect()
    };

    let from = p(207.0, 844.0);
    assert_eq!(
        editor.begin(&mut score, from, 1.0, Modifiers::default()),
        Some(DragMode::Pit)
    );
    editor.changed(&mut score, p(from.x + 480.0, from.y));
    assert_eq!(beats(&score), vec!["0", "7/4", "11/4", "3"]);
    editor.changed(&mut score, p(from.x - 480.0, from.y));
    assert_eq!(beats(&score), vec!["0", "1/4", "5/4", "3"]);
    editor.changed(&mut score, p(from.x + 48.0, from.y - 24.0));
    assert_eq!(beats(&score), vec!["0", "3/2", "5/2", "3"]);

    let capture = editor.ended(&mut score, p(from.x + 48.0, from.y - 24.0)).unwrap();
    assert_eq!(capture.notes.len(), 1);
    let note = score.note(0).unwrap();
    let pitches: Vec<_> = note.pits.iter().map(|pit| pit.pitch).collect();
    assert_eq!(pitches, vec![r(0), r(2), r(2), r(0)]);
    assert_eq!(note.beat_range, r(0)..r(4));
}

#[test]
fn straight_pits_lock_to_their_neighbor() {
    let (mut score, tone) = empty_score();
    score.push(Note::new(
        r(60),
        r(0)..r(4),
        vec![Pit::new(r(0), r(0), tone), Pit::new(r(2), r(0), tone)],
    ));
    let before = score.clone();
    let mut editor = editor();

    let straight = Modifiers { straight: true };
    assert_eq!(
        editor.begin(&mut score, p(208.0, 843.0), 1.0, straight),
        Some(DragMode::StraightPit(PitLock::Pitch))
    );
    editor.ended(&mut score, p(304.0, 800.0));
    let pit = score.note(0).unwrap().pits[1].clone();
    assert_eq!((pit.beat, pit.pitch), (r(3), r(0)));

    let mut score = before;
    drag(&mut editor, &mut score, p(208.0, 843.0), p(304.0, 800.0)).unwrap();
    let pit = score.note(0).unwrap().pits[1].clone();
    assert_eq!((pit.beat, pit.pitch), (r(3), r(4)));
}

#[test]
fn lyrics_drag_their_pit() {
    let (mut score, tone) = empty_score();
    score.push(Note::new(
        r(60),
        r(0)..r(4),
        vec![
            Pit::new(r(0), r(0), tone),
            Pit::new(r(2), r(2), tone).with_lyric("ah"),
        ],
    ));
    let mut editor = editor();
    assert_eq!(
        editor.begin(&mut score, p(215.0, 832.0), 1.0, Modifiers::default()),
        Some(DragMode::Pit)
    );
    editor.ended(&mut score, p(311.0, 832.0));
    assert_eq!(score.note(0).unwrap().pits[1].beat, r(3));
}

#[test]
fn timeline_markers() {
    let (mut score, _) = empty_score();
    score.key_beats = vec![r(2), r(4)];
    let mut editor = editor();

    // key beats stay a step away from their neighbors
    let capture = drag(&mut editor, &mut score, p(208.0, 20.0), p(508.0, 20.0)).unwrap();
    assert_eq!(score.key_beats, vec![Rational::new(15, 4), r(4)]);
    assert_eq!(
        capture.score,
        vec![ScoreChange::KeyBeats {
            old: vec![r(2), r(4)],
            new: vec![Rational::new(15, 4), r(4)],
        }]
    );

    let (mut score, _) = empty_score();
    score.scales = vec![r(48)];
    drag(&mut editor, &mut score, p(600.0, 988.0), p(600.0, 964.0)).unwrap();
    assert_eq!(score.scales, vec![r(50)]);

    // the loop keeps at least one step
    drag(&mut editor, &mut score, p(400.0, 20.0), p(-600.0, 20.0)).unwrap();
    assert_eq!(score.loop_dur_beat, Rational::nth(4));

    drag(&mut editor, &mut score, p(1552.0, 20.0), p(-500.0, 20.0)).unwrap();
    assert_eq!(score.beat_range, r(0)..r(0));
}

#[test]
fn all_beat_shifts_everything() {
    let (mut score, tone) = empty_score();
    score.push(Note::simple(r(60), r(1)..r(5), tone));
    score.key_beats = vec![r(2)];
    let mut editor = editor();

    assert_eq!(
        editor.begin(&mut score, p(1000.0, 20.0), 1.0, Modifiers::default()),
        Some(DragMode::AllBeat)
    );
    let capture = editor.ended(&mut score, p(700.0, 20.0)).unwrap();
    assert_eq!(score.note(0).unwrap().beat_range, r(0)..r(4));
    assert_eq!(score.key_beats, vec![r(1)]);
    assert_eq!(capture.notes.len(), 1);
    assert_eq!(capture.score.len(), 1);
}

#[test]
fn spectrogram_toggles_on_release() {
    let (mut score, _) = empty_score();
    let mut editor = editor();

    let capture = drag(&mut editor, &mut score, p(12.0, 20.0), p(12.0, 20.0)).unwrap();
    assert!(score.is_shown_spectrogram);
    assert_eq!(
        capture.score,
        vec![ScoreChange::IsShownSpectrogram {
            old: false,
            new: true,
        }]
    );

    // released elsewhere
    assert_eq!(drag(&mut editor, &mut score, p(12.0, 20.0), p(100.0, 20.0)), None);
    assert!(score.is_shown_spectrogram);
    assert_eq!(editor.undo().groups.len(), 1);
}

#[test]
fn cursor_hints() {
    let mut hints = Vec::new();
    let mut editor = editor();
    let mut hint_after = |score: &mut Score, from: Point, to: Point| {
        editor.begin(score, from, 1.0, Modifiers::default());
        editor.changed(score, to);
        hints.push(editor.cursor_hint(score).unwrap_or_default());
        editor.ended(score, to);
        assert_eq!(editor.cursor_hint(score), None);
    };

    let (mut score, tone) = empty_score();
    score.push(Note::simple(r(60), r(0)..r(4), tone));
    hint_after(&mut score, p(200.0, 844.0), p(392.0, 808.0));

    let (mut score, tone) = empty_score();
    score.push(Note::new(
        r(60),
        r(0)..r(4),
        vec![Pit::new(r(0), r(0), tone), Pit::new(r(4), r(2), tone)],
    ));
    hint_after(&mut score, p(398.0, 820.0), p(494.0, 820.0));

    let (mut score, tone) = empty_score();
    score.push(Note::simple(r(60), r(1)..r(5), tone));
    score.key_beats = vec![r(2), r(4)];
    hint_after(&mut score, p(208.0, 20.0), p(508.0, 20.0));
    hint_after(&mut score, p(1000.0, 20.0), p(700.0, 20.0));
    hint_after(&mut score, p(12.0, 20.0), p(12.0, 20.0));

    expect![[r#"["D#4 @ 2", "D4 @ 5", "key @ 15/4", "shift -1", "show spectrogram"]"#]]
        .assert_eq(&format!("{:?}", hints));
}

#[test]
fn begin_ends_a_running_gesture() {
    let (mut score, tone) = empty_score();
    score.push(Note::simple(r(60), r(0)..r(4), tone));
    let mut editor = editor();

    editor.begin(&mut score, p(200.0, 844.0), 1.0, Modifiers::default());
    editor.changed(&mut score, p(392.0, 808.0));
    // the note now spans x 208 to 592 at y 808
    assert_eq!(
        editor.begin(&mut score, p(300.0, 808.0), 1.0, Modifiers::default()),
        Some(DragMode::Note)
    );
    assert!(editor.is_active());
    assert_eq!(editor.undo().groups.len(), 1);
    assert_eq!(score.note(0).unwrap().beat_range, r(2)..r(6));
}

#[test]
fn stale_notes_are_skipped() {
    let (mut score, tone) = empty_score();
    score.push(Note::simple(r(60), r(0)..r(4), tone));
    score.push(Note::simple(r(64), r(4)..r(8), tone));
    let second = score.note(1).cloned().unwrap();
    let mut editor = editor();

    assert_eq!(
        editor.begin(&mut score, p(600.0, 796.0), 1.0, Modifiers::default()),
        Some(DragMode::Note)
    );
    score.remove(0).unwrap();
    editor.changed(&mut score, p(696.0, 796.0));
    assert_eq!(editor.ended(&mut score, p(696.0, 796.0)), None);
    assert_eq!(score.notes(), &[second]);
}

#[test]
fn drafts_and_empty_space_start_nothing() {
    let (mut score, tone) = empty_score();
    score.draft_notes.push(Note::simple(r(60), r(0)..r(4), tone));
    let mut editor = editor();
    assert_eq!(
        editor.begin(&mut score, p(200.0, 844.0), 1.0, Modifiers::default()),
        None
    );
    assert!(!editor.is_active());
    assert_eq!(editor.mode(), None);
    editor.changed(&mut score, p(300.0, 844.0));
    assert_eq!(editor.ended(&mut score, p(300.0, 844.0)), None);
    assert_eq!(editor.player().stops, 0);
}
