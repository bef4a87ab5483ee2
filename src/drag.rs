// pitroll -- the interactive editing core of a pitch/beat piano roll
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The drag interaction: one pointer gesture turned into one undoable edit.
//!
//! A gesture runs `begin`, any number of `changed` and one `ended`. Every `changed` frame
//! re-derives the edited values from the snapshot taken at `begin` plus the quantized
//! distance from the begin point, so frames never accumulate rounding.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use log::{debug, trace, warn};

use crate::collab::{Capture, NoteChange, NotePlayer, PitResult, ScoreChange, Selection, Undo};
use crate::coords::metrics::{MAX_PITCH, MAX_SPECTLOPE_HEIGHT, MIN_SPECTLOPE_HEIGHT};
use crate::coords::{beat_interval, pitch_interval, Mapper, Point, Rect};
use crate::geometry::{self, EditOptions};
use crate::hit::{self, Hit, NotePart};
use crate::note::{Note, PitchName};
use crate::rational::Rational;
use crate::score::{Beat, Score};
use crate::tone::{Sprol, Tone, ToneId};

#[cfg(test)]
mod scenario_tests;

/// Keys held while a gesture begins.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Drag pits along a straight line with a neighbor.
    pub straight: bool,
}

/// What a straight pit drag keeps equal to the neighboring pit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PitLock {
    Beat,
    Pitch,
}

/// What a gesture edits, chosen once when it begins.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DragMode {
    /// Moving whole notes.
    Note,
    StartBeat,
    EndBeat,
    Pit,
    StraightPit(PitLock),
    EvenAmplitude,
    Sprol(usize),
    AllSprol(usize),
    SpectlopeHeight,
    KeyBeat(usize),
    Scale(usize),
    /// Shifting every note and key beat in time.
    AllBeat,
    LoopDurBeat,
    EndOfTimelineBeat,
    SpectrogramToggle,
}

/// The score-level fields a gesture can change.
#[derive(Debug, Clone, PartialEq)]
struct ScoreFields {
    key_beats: Vec<Beat>,
    scales: Vec<Rational>,
    loop_dur_beat: Beat,
    beat_range: Range<Beat>,
    is_shown_spectrogram: bool,
}

impl ScoreFields {
    fn of(score: &Score) -> Self {
        ScoreFields {
            key_beats: score.key_beats.clone(),
            scales: score.scales.clone(),
            loop_dur_beat: score.loop_dur_beat,
            beat_range: score.beat_range.clone(),
            is_shown_spectrogram: score.is_shown_spectrogram,
        }
    }

    fn changes(&self, score: &Score) -> Vec<ScoreChange> {
        let mut changes = Vec::new();
        if self.key_beats != score.key_beats {
            changes.push(ScoreChange::KeyBeats {
                old: self.key_beats.clone(),
                new: score.key_beats.clone(),
            });
        }
        if self.scales != score.scales {
            changes.push(ScoreChange::Scales {
                old: self.scales.clone(),
                new: score.scales.clone(),
            });
        }
        if self.loop_dur_beat != score.loop_dur_beat {
            changes.push(ScoreChange::LoopDurBeat {
                old: self.loop_dur_beat,
                new: score.loop_dur_beat,
            });
        }
        if self.beat_range != score.beat_range {
            changes.push(ScoreChange::BeatRange {
                old: self.beat_range.clone(),
                new: score.beat_range.clone(),
            });
        }
        if self.is_shown_spectrogram != score.is_shown_spectrogram {
            changes.push(ScoreChange::IsShownSpectrogram {
                old: self.is_shown_spectrogram,
                new: score.is_shown_spectrogram,
            });
        }
        changes
    }
}

/// An edit of a tone shared by every pit holding `original`.
#[derive(Debug, Clone)]
struct ToneEdit {
    original: ToneId,
    began: Tone,
    /// The frame the gesture started in, giving the scale of the panel.
    frame: Rect,
    /// The id the edited tone is stored under, reserved on the first real change.
    fork: Option<ToneId>,
}

/// The state of one gesture, alive from `begin` to `ended`.
#[derive(Debug, Clone)]
pub struct DragSession {
    mode: DragMode,
    /// The note that was hit.
    note: Option<usize>,
    /// The pit that was hit, or the pit whose tone is edited.
    pit: Option<usize>,
    begin_point: Point,
    last_point: Point,
    mapper: Mapper,
    beat_interval: Rational,
    pitch_interval: Rational,
    /// Every note the gesture may change, as it was when the gesture began.
    began: BTreeMap<usize, Note>,
    /// The pits moved by pit drags.
    pits: BTreeMap<usize, BTreeSet<usize>>,
    fields: ScoreFields,
    tone: Option<ToneEdit>,
    beat_delta: Beat,
}

/// `value`, raised to `lower` unless `original` already was below it.
fn at_least(value: Rational, lower: Rational, original: Rational) -> Rational {
    value.max(lower.min(original))
}

/// `value`, lowered to `upper` unless `original` already was above it.
fn at_most(value: Rational, upper: Rational, original: Rational) -> Rational {
    value.min(upper.max(original))
}

fn clamp_around(value: Rational, lower: Rational, upper: Rational, original: Rational) -> Rational {
    at_most(at_least(value, lower, original), upper, original)
}

fn replace_note(score: &mut Score, index: usize, note: Note) {
    if let Err(err) = score.replace(index, note) {
        warn!("skipping stale note: {}", err);
    }
}

/// The lock of a straight pit drag: a neighbor on the same beat locks the beat,
/// otherwise a neighbor on the same pitch locks the pitch.
fn straight_lock(note: &Note, pit: usize) -> Option<PitLock> {
    let current = note.pits.get(pit)?;
    let neighbors: Vec<_> = pit
        .checked_sub(1)
        .and_then(|i| note.pits.get(i))
        .into_iter()
        .chain(note.pits.get(pit + 1))
        .collect();
    if neighbors.iter().any(|other| other.beat == current.beat) {
        Some(PitLock::Beat)
    } else if neighbors.iter().any(|other| other.pitch == current.pitch) {
        Some(PitLock::Pitch)
    } else {
        None
    }
}

fn mode_for(score: &Score, hit: Hit, modifiers: Modifiers) -> Option<DragMode> {
    let mode = match hit {
        Hit::Note { index, part } => match part {
            NotePart::Body => DragMode::Note,
            NotePart::StartBeat => DragMode::StartBeat,
            NotePart::EndBeat => DragMode::EndBeat,
            NotePart::Pit(pit) | NotePart::Lyric(pit) => {
                let lock = if modifiers.straight {
                    straight_lock(score.note(index)?, pit)
                } else {
                    None
                };
                lock.map_or(DragMode::Pit, DragMode::StraightPit)
            }
            NotePart::EvenAmplitude(_) => DragMode::EvenAmplitude,
            NotePart::Sprol { sprol, .. } => DragMode::Sprol(sprol),
            NotePart::AllSprol(sprol) => DragMode::AllSprol(sprol),
            NotePart::SpectlopeHeight => DragMode::SpectlopeHeight,
        },
        Hit::KeyBeat(index) => DragMode::KeyBeat(index),
        Hit::Scale(index) => DragMode::Scale(index),
        Hit::SpectrogramToggle => DragMode::SpectrogramToggle,
        Hit::LoopDurBeat => DragMode::LoopDurBeat,
        Hit::EndOfTimelineBeat => DragMode::EndOfTimelineBeat,
        Hit::AllBeat => DragMode::AllBeat,
    };
    Some(mode)
}

fn pit_result(score: &Score, note: &Note, pit: usize) -> Option<PitResult> {
    let beat = note.pit_beat(pit)?;
    let current = note.pits.get(pit)?;
    Some(PitResult {
        pitch: note.pit_pitch(pit)?,
        beat,
        seconds: score.seconds(beat),
        stereo: current.stereo,
        tone: current.tone,
    })
}

impl DragSession {
    fn new(score: &Score, mapper: Mapper, point: Point, scale: f64, mode: DragMode) -> Self {
        DragSession {
            mode,
            note: None,
            pit: None,
            begin_point: point,
            last_point: point,
            mapper,
            beat_interval: beat_interval(scale, score.tempo),
            pitch_interval: pitch_interval(scale),
            began: BTreeMap::new(),
            pits: BTreeMap::new(),
            fields: ScoreFields::of(score),
            tone: None,
            beat_delta: Rational::zero(),
        }
    }

    pub fn mode(&self) -> DragMode {
        self.mode
    }

    /// The notes as they were when the gesture began.
    pub fn began(&self) -> &BTreeMap<usize, Note> {
        &self.began
    }

    pub fn beat_interval(&self) -> Rational {
        self.beat_interval
    }

    pub fn pitch_interval(&self) -> Rational {
        self.pitch_interval
    }

    fn snapshot(&mut self, score: &Score, indexes: impl IntoIterator<Item = usize>) {
        for index in indexes {
            if let Some(note) = score.note(index) {
                self.began.insert(index, note.clone());
            }
        }
    }

    /// Prepare editing the tone of a pit, or of the frame nearest to the begin point.
    /// Every note holding that tone joins the working set.
    fn start_tone_edit(&mut self, score: &Score, index: usize, pit: Option<usize>) -> Option<()> {
        let note = score.note(index)?;
        let frames = geometry::tone_frames(note, &self.mapper);
        let begin = self.begin_point;
        let frame = match pit {
            Some(pit) => frames.iter().find(|frame| frame.pit() == pit),
            None => frames
                .iter()
                .map(|frame| (frame.rect.squared_distance(begin), frame))
                .fold(None, |best, (d, frame)| match best {
                    Some((best_d, _)) if best_d <= d => best,
                    _ => Some((d, frame)),
                })
                .map(|(_, frame)| frame),
        }?;

        let pit = frame.pit();
        let original = note.pits.get(pit)?.tone;
        let began = match score.tones.get(original) {
            Ok(tone) => tone.clone(),
            Err(err) => {
                warn!("cannot edit the tone of pit {}: {}", pit, err);
                return None;
            }
        };
        self.pit = Some(pit);
        self.tone = Some(ToneEdit {
            original,
            began,
            frame: frame.rect,
            fork: None,
        });
        let holders: Vec<usize> = score
            .iter()
            .enumerate()
            .filter(|(_, note)| note.has_tone(original))
            .map(|(i, _)| i)
            .collect();
        self.snapshot(score, holders);
        Some(())
    }

    fn update(&mut self, score: &mut Score, point: Point) {
        self.last_point = point;
        let (dx, dy) = (point.x - self.begin_point.x, point.y - self.begin_point.y);
        let db = self.mapper.beat_delta(dx, self.beat_interval);
        let dp = self.mapper.pitch_delta(dy, self.pitch_interval);
        trace!("{:?} moved by {} beats and {} semitones", self.mode, db, dp);
        let zero = Rational::zero();
        self.beat_delta = db;

        match self.mode {
            DragMode::Note => self.move_notes(score, db, dp),
            DragMode::StartBeat => self.move_starts(score, db),
            DragMode::EndBeat => self.move_ends(score, db),
            DragMode::Pit => self.move_pits(score, db, dp),
            DragMode::StraightPit(PitLock::Beat) => self.move_pits(score, zero, dp),
            DragMode::StraightPit(PitLock::Pitch) => self.move_pits(score, db, zero),
            DragMode::EvenAmplitude | DragMode::Sprol(_) | DragMode::AllSprol(_) => {
                self.edit_tone(score, dx, dy)
            }
            DragMode::SpectlopeHeight => self.resize_panels(score, dy),
            DragMode::KeyBeat(index) => self.move_key_beat(score, index, db),
            DragMode::Scale(index) => {
                let scales = &self.fields.scales;
                if let Some(&original) = scales.get(index) {
                    let mut moved = scales.clone();
                    moved[index] =
                        clamp_around(original + dp, zero, Rational::int(MAX_PITCH), original);
                    score.scales = moved;
                }
            }
            DragMode::AllBeat => self.beat_delta = self.shift_all(score, db),
            DragMode::LoopDurBeat => {
                let original = self.fields.loop_dur_beat;
                score.loop_dur_beat = at_least(original + db, self.beat_interval, original);
            }
            DragMode::EndOfTimelineBeat => {
                let (start, end) = (self.fields.beat_range.start, self.fields.beat_range.end);
                score.beat_range = start..at_least(end + db, start, end);
            }
            DragMode::SpectrogramToggle => {}
        }
    }

    /// Rigid move, keeping every start at or after beat 0 and every pitch in range.
    fn move_notes(&self, score: &mut Score, db: Beat, dp: Rational) {
        let zero = Rational::zero();
        let earliest = self.began.values().map(Note::start).min();
        let lowest = self.began.values().map(|note| note.pitch).min();
        let highest = self.began.values().map(|note| note.pitch).max();
        let (earliest, lowest, highest) = match (earliest, lowest, highest) {
            (Some(e), Some(l), Some(h)) => (e, l, h),
            _ => return,
        };
        let db = at_least(db, -earliest, zero);
        let dp = clamp_around(dp, -lowest, Rational::int(MAX_PITCH) - highest, zero);
        for (&index, note) in self.began.iter() {
            replace_note(score, index, note.translated(db, dp));
        }
    }

    /// Pits keep their absolute beats while the start moves, as far as the new range allows.
    fn move_starts(&self, score: &mut Score, db: Beat) {
        let zero = Rational::zero();
        for (&index, began) in self.began.iter() {
            let start = began.start();
            let new_start = at_least(start + db, zero, start).min(began.end());
            let mut note = began.clone();
            if new_start != start {
                note.beat_range.start = new_start;
                let length = note.length();
                for pit in note.pits.iter_mut() {
                    pit.beat = (start + pit.beat - new_start).max(zero).min(length);
                }
            }
            replace_note(score, index, note);
        }
    }

    fn move_ends(&self, score: &mut Score, db: Beat) {
        for (&index, began) in self.began.iter() {
            let end = began.end();
            let new_end = (end + db).max(began.start());
            let mut note = began.clone();
            if new_end != end {
                note.beat_range.end = new_end;
                let length = note.length();
                for pit in note.pits.iter_mut() {
                    pit.beat = pit.beat.min(length);
                }
            }
            replace_note(score, index, note);
        }
    }

    /// The selected pits move as one set by a common delta, clamped so that no pit comes
    /// closer than one quantization step to an unselected neighbor.
    /// A pit moved before the note start drags the start along; the last pit may grow the note.
    fn move_pits(&self, score: &mut Score, db: Beat, dp: Rational) {
        let zero = Rational::zero();
        let max_pitch = Rational::int(MAX_PITCH);
        let (mut db, mut dp) = (db, dp);
        for (&index, selected) in self.pits.iter() {
            let began = match self.began.get(&index) {
                Some(note) => note,
                None => continue,
            };
            for &p in selected.iter() {
                let original = match began.pits.get(p) {
                    Some(pit) => pit,
                    None => continue,
                };
                let lower = (0..p)
                    .rev()
                    .find(|j| !selected.contains(j))
                    .map_or(-began.start(), |j| began.pits[j].beat + self.beat_interval);
                let upper = (p + 1..began.pits.len())
                    .find(|j| !selected.contains(j))
                    .map(|j| began.pits[j].beat - self.beat_interval);

                db = at_least(db, lower - original.beat, zero);
                if let Some(upper) = upper {
                    db = at_most(db, upper - original.beat, zero);
                }
                let pitch = began.pitch + original.pitch;
                dp = clamp_around(dp, -pitch, max_pitch - pitch, zero);
            }
        }

        for (&index, selected) in self.pits.iter() {
            let mut note = match self.began.get(&index) {
                Some(note) => note.clone(),
                None => continue,
            };
            for &p in selected.iter() {
                if let Some(pit) = note.pits.get_mut(p) {
                    pit.beat += db;
                    pit.pitch += dp;
                }
            }
            note.fit_range_to_pits();
            replace_note(score, index, note);
        }
    }

    /// Write the edited tone under a fresh id and hand it to every pit holding the original.
    /// An edit that ends up equal to the original puts the original ids back.
    fn edit_tone(&mut self, score: &mut Score, dx: f64, dy: f64) {
        let edit = match self.tone.as_mut() {
            Some(edit) => edit,
            None => return,
        };
        let frame = edit.frame;
        let tone = match self.mode {
            DragMode::EvenAmplitude => {
                let delta = if frame.height > 0.0 { -dy / frame.height } else { 0.0 };
                edit.began
                    .with_even_amplitude(edit.began.overtone.even_amplitude + delta)
            }
            DragMode::Sprol(index) | DragMode::AllSprol(index) => {
                let (d_pitch, d_volm) = geometry::panel_delta(&frame, dx, dy);
                match edit.began.spectlope.get(index) {
                    Some(sprol) => edit.began.with_sprol(
                        index,
                        Sprol::new(sprol.pitch + d_pitch, sprol.volm + d_volm, sprol.noise),
                    ),
                    None => edit.began.clone(),
                }
            }
            _ => return,
        };

        if tone == edit.began {
            for (&index, note) in self.began.iter() {
                replace_note(score, index, note.clone());
            }
            return;
        }

        let id = *edit.fork.get_or_insert_with(|| score.tones.reserve());
        if let Err(err) = score.tones.set(id, tone) {
            warn!("cannot store the edited tone: {}", err);
            return;
        }
        let original = edit.original;
        for (&index, began) in self.began.iter() {
            let mut note = began.clone();
            for pit in note.pits.iter_mut().filter(|pit| pit.tone == original) {
                pit.tone = id;
            }
            replace_note(score, index, note);
        }
    }

    fn resize_panels(&self, score: &mut Score, dy: f64) {
        for (&index, began) in self.began.iter() {
            let original = began.spectlope_height;
            let mut note = began.clone();
            note.spectlope_height = (original - dy)
                .max(MIN_SPECTLOPE_HEIGHT.min(original))
                .min(MAX_SPECTLOPE_HEIGHT.max(original));
            replace_note(score, index, note);
        }
    }

    fn move_key_beat(&self, score: &mut Score, index: usize, db: Beat) {
        let beats = &self.fields.key_beats;
        let original = match beats.get(index) {
            Some(&beat) => beat,
            None => return,
        };
        let lower = index
            .checked_sub(1)
            .and_then(|i| beats.get(i))
            .map_or(Rational::zero(), |&beat| beat + self.beat_interval);
        let upper = beats.get(index + 1).map(|&beat| beat - self.beat_interval);
        let mut beat = at_least(original + db, lower, original);
        if let Some(upper) = upper {
            beat = at_most(beat, upper, original);
        }
        let mut moved = beats.clone();
        moved[index] = beat;
        score.key_beats = moved;
    }

    /// Returns the shift actually applied.
    fn shift_all(&self, score: &mut Score, db: Beat) -> Beat {
        let zero = Rational::zero();
        let earliest = self
            .began
            .values()
            .map(Note::start)
            .chain(self.fields.key_beats.iter().copied())
            .min();
        let db = earliest.map_or(db, |earliest| at_least(db, -earliest, zero));
        for (&index, note) in self.began.iter() {
            replace_note(score, index, note.translated(db, zero));
        }
        score.key_beats = self.fields.key_beats.iter().map(|&beat| beat + db).collect();
        db
    }

    /// The pits to play for the current frame.
    fn preview(&self, score: &Score) -> Vec<PitResult> {
        let whole = |index: usize| -> (usize, Vec<usize>) {
            let pits = score.note(index).map_or(0, |note| note.pits.len());
            (index, (0..pits).collect())
        };
        let pits: Vec<(usize, Vec<usize>)> = match self.mode {
            DragMode::Pit | DragMode::StraightPit(_) => self
                .pits
                .iter()
                .map(|(&index, pits)| (index, pits.iter().copied().collect()))
                .collect(),
            DragMode::Note | DragMode::StartBeat | DragMode::EndBeat => {
                self.began.keys().map(|&index| whole(index)).collect()
            }
            DragMode::EvenAmplitude | DragMode::Sprol(_) | DragMode::AllSprol(_) => {
                self.note.into_iter().map(whole).collect()
            }
            _ => Vec::new(),
        };
        pits.into_iter()
            .flat_map(|(index, pits)| {
                pits.into_iter()
                    .filter_map(move |pit| pit_result(score, score.note(index)?, pit))
            })
            .collect()
    }

    /// Old and new values of everything the gesture changed.
    fn capture(&self, score: &Score) -> Capture {
        let mut notes = Vec::new();
        for (&index, old) in self.began.iter() {
            match score.note(index) {
                Some(new) if new != old => notes.push(NoteChange {
                    index,
                    old: old.clone(),
                    new: new.clone(),
                }),
                Some(_) => {}
                None => warn!("note {} disappeared during the gesture", index),
            }
        }
        let mut changes = self.fields.changes(score);
        if let Some(id) = self.tone.as_ref().and_then(|edit| edit.fork) {
            if notes.iter().any(|change| change.new.has_tone(id)) {
                if let Ok(tone) = score.tones.get(id) {
                    changes.push(ScoreChange::ToneAdded {
                        id,
                        tone: tone.clone(),
                    });
                }
            }
        }
        Capture {
            notes,
            score: changes,
        }
    }
}

/// Turns pointer gestures into edits of a score.
///
/// The editor owns its collaborators: the undo history receives one group per gesture
/// that changed something, the selection widens a gesture to every selected element,
/// and the player previews the edited pits while dragging.
pub struct DragEditor<U, S, P> {
    undo: U,
    selection: S,
    player: P,
    /// Which tone panels are shown.
    pub options: EditOptions,
    /// Horizontal scroll origin of the view.
    pub origin_x: f64,
    session: Option<DragSession>,
}

impl<U: Undo, S: Selection, P: NotePlayer> DragEditor<U, S, P> {
    pub fn new(undo: U, selection: S, player: P) -> Self {
        DragEditor {
            undo,
            selection,
            player,
            options: EditOptions::default(),
            origin_x: 0.0,
            session: None,
        }
    }

    pub fn undo(&self) -> &U {
        &self.undo
    }

    pub fn undo_mut(&mut self) -> &mut U {
        &mut self.undo
    }

    pub fn selection(&self) -> &S {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut S {
        &mut self.selection
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn mode(&self) -> Option<DragMode> {
        self.session.as_ref().map(DragSession::mode)
    }

    pub fn mapper(&self, score: &Score) -> Mapper {
        Mapper::for_score(score, self.origin_x)
    }

    /// Start a gesture at `point`, returning the chosen mode.
    /// Nothing under the point means no gesture.
    ///
    /// A gesture still running is ended at its last point first.
    pub fn begin(
        &mut self,
        score: &mut Score,
        point: Point,
        scale: f64,
        modifiers: Modifiers,
    ) -> Option<DragMode> {
        if let Some(last) = self.session.as_ref().map(|session| session.last_point) {
            warn!("gesture began before the previous one ended, ending that one first");
            self.ended(score, last);
        }

        let mapper = self.mapper(score);
        let hit = match hit::classify(score, &mapper, &self.options, point, scale) {
            Some(hit) => hit,
            None => {
                debug!("nothing to drag at {:?}", point);
                return None;
            }
        };
        let session = self.prepare(score, mapper, hit, point, scale, modifiers)?;
        debug!(
            "began {:?} on {:?} with {} notes",
            session.mode,
            hit,
            session.began.len()
        );
        let mode = session.mode;
        self.session = Some(session);
        Some(mode)
    }

    fn prepare(
        &self,
        score: &Score,
        mapper: Mapper,
        hit: Hit,
        point: Point,
        scale: f64,
        modifiers: Modifiers,
    ) -> Option<DragSession> {
        let mode = mode_for(score, hit, modifiers)?;
        let mut session = DragSession::new(score, mapper, point, scale, mode);
        match hit {
            Hit::Note { index, part } => {
                session.note = Some(index);
                match part {
                    NotePart::Body
                    | NotePart::StartBeat
                    | NotePart::EndBeat
                    | NotePart::SpectlopeHeight => {
                        let notes = self.working_notes(score, &mapper, index);
                        session.snapshot(score, notes);
                    }
                    NotePart::Pit(pit) | NotePart::Lyric(pit) => {
                        session.pit = Some(pit);
                        let pits = match mode {
                            DragMode::StraightPit(_) => single_pit(index, pit),
                            _ => self.working_pits(score, &mapper, index, pit),
                        };
                        session.snapshot(score, pits.keys().copied().collect::<Vec<_>>());
                        session.pits = pits;
                    }
                    NotePart::EvenAmplitude(pit) | NotePart::Sprol { pit, .. } => {
                        session.start_tone_edit(score, index, Some(pit))?
                    }
                    NotePart::AllSprol(_) => session.start_tone_edit(score, index, None)?,
                }
            }
            Hit::AllBeat => session.snapshot(score, 0..score.len()),
            _ => {}
        }
        Some(session)
    }

    fn selected(&self, score: &Score, mapper: &Mapper) -> BTreeMap<usize, Vec<usize>> {
        let rects = self.selection.current_selection_rects();
        if rects.is_empty() {
            return BTreeMap::new();
        }
        self.selection.note_and_pit_indexes(score, mapper, &rects)
    }

    /// The hit note, or every selected note when the hit note is selected.
    fn working_notes(&self, score: &Score, mapper: &Mapper, index: usize) -> Vec<usize> {
        let selected = self.selected(score, mapper);
        if selected.contains_key(&index) {
            selected.into_iter().map(|(index, _)| index).collect()
        } else {
            vec![index]
        }
    }

    /// The hit pit, or every selected pit when the hit pit is selected.
    fn working_pits(
        &self,
        score: &Score,
        mapper: &Mapper,
        index: usize,
        pit: usize,
    ) -> BTreeMap<usize, BTreeSet<usize>> {
        let selected = self.selected(score, mapper);
        let is_selected = selected.get(&index).map_or(false, |pits| pits.contains(&pit));
        if !is_selected {
            return single_pit(index, pit);
        }
        selected
            .into_iter()
            .filter(|(_, pits)| !pits.is_empty())
            .map(|(index, pits)| (index, pits.into_iter().collect()))
            .collect()
    }

    /// Apply the movement from the begin point to `point`. Does nothing without a gesture.
    pub fn changed(&mut self, score: &mut Score, point: Point) {
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => {
                trace!("pointer moved without a gesture");
                return;
            }
        };
        session.update(score, point);
        let pits = session.preview(score);
        if !pits.is_empty() {
            self.player.play(pits);
        }
    }

    /// Finish the gesture at `point` and hand its changes to the undo history,
    /// returning them. A gesture that changed nothing leaves the history alone.
    pub fn ended(&mut self, score: &mut Score, point: Point) -> Option<Capture> {
        self.changed(score, point);
        let session = self.session.take()?;
        self.player.stop();

        if session.mode == DragMode::SpectrogramToggle
            && geometry::spectrogram_toggle_rect(&session.mapper).contains(point)
        {
            score.is_shown_spectrogram = !session.fields.is_shown_spectrogram;
        }

        let capture = session.capture(score);
        debug!(
            "ended {:?} with {} note and {} score changes",
            session.mode,
            capture.notes.len(),
            capture.score.len()
        );
        if capture.is_empty() {
            return None;
        }
        self.undo.begin_undo_group();
        self.undo.capture(capture.clone());
        Some(capture)
    }

    /// A short text describing the dragged element, for display next to the pointer.
    pub fn cursor_hint(&self, score: &Score) -> Option<String> {
        let session = self.session.as_ref()?;
        let note = session.note.and_then(|index| score.note(index));
        let pit = session.pit;
        let hint = match session.mode {
            DragMode::Note | DragMode::StartBeat => {
                let note = note?;
                format!("{} @ {}", PitchName(note.pitch), note.start())
            }
            DragMode::EndBeat => {
                let note = note?;
                format!("{} @ {}", PitchName(note.pitch_at(note.end())), note.end())
            }
            DragMode::Pit | DragMode::StraightPit(_) => {
                let (note, pit) = (note?, pit?);
                format!("{} @ {}", PitchName(note.pit_pitch(pit)?), note.pit_beat(pit)?)
            }
            DragMode::EvenAmplitude | DragMode::Sprol(_) | DragMode::AllSprol(_) => {
                let tone = score.tones.get(note?.pits.get(pit?)?.tone).ok()?;
                match session.mode {
                    DragMode::Sprol(index) | DragMode::AllSprol(index) => {
                        let sprol = tone.spectlope.get(index)?;
                        format!("pitch {:.1} volume {:.2}", sprol.pitch, sprol.volm)
                    }
                    _ => format!("even {:.2}", tone.overtone.even_amplitude),
                }
            }
            DragMode::SpectlopeHeight => format!("height {}", note?.spectlope_height),
            DragMode::KeyBeat(index) => format!("key @ {}", score.key_beats.get(index)?),
            DragMode::Scale(index) => format!("scale {}", PitchName(*score.scales.get(index)?)),
            DragMode::AllBeat => format!("shift {}", session.beat_delta),
            DragMode::LoopDurBeat => format!("loop {}", score.loop_dur_beat),
            DragMode::EndOfTimelineBeat => format!("end @ {}", score.beat_range.end),
            DragMode::SpectrogramToggle => {
                if score.is_shown_spectrogram {
                    "hide spectrogram".to_string()
                } else {
                    "show spectrogram".to_string()
                }
            }
        };
        Some(hint)
    }
}

fn single_pit(index: usize, pit: usize) -> BTreeMap<usize, BTreeSet<usize>> {
    let mut pits = BTreeMap::new();
    pits.insert(index, std::iter::once(pit).collect());
    pits
}
