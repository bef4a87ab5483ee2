// pitroll -- the interactive editing core of a pitch/beat piano roll
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Interfaces to the parts of the editor living outside the editing core:
//! undo history, selection and audio preview.

use std::collections::BTreeMap;
use std::ops::Range;

use log::{debug, warn};

use crate::coords::{Mapper, Rect};
use crate::geometry::{self, NOTE_HALF_HEIGHT};
use crate::note::{Note, Stereo};
use crate::rational::Rational;
use crate::score::{Beat, Score, ScoreError};
use crate::tone::{Tone, ToneId};

/// A note replaced during a gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteChange {
    pub index: usize,
    pub old: Note,
    pub new: Note,
}

/// A score-level field changed during a gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreChange {
    KeyBeats { old: Vec<Beat>, new: Vec<Beat> },
    Scales { old: Vec<Rational>, new: Vec<Rational> },
    LoopDurBeat { old: Beat, new: Beat },
    BeatRange { old: Range<Beat>, new: Range<Beat> },
    IsShownSpectrogram { old: bool, new: bool },
    /// A tone forked by the gesture, stored under a fresh id.
    ToneAdded { id: ToneId, tone: Tone },
}

/// Everything one gesture changed, old and new values side by side.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Capture {
    pub notes: Vec<NoteChange>,
    pub score: Vec<ScoreChange>,
}

impl Capture {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.score.is_empty()
    }

    /// Put the old values back.
    ///
    /// A forked tone stays in the arena, unreferenced, since tone ids are never reused.
    pub fn revert(&self, score: &mut Score) -> Result<(), ScoreError> {
        for change in self.notes.iter().rev() {
            score.replace(change.index, change.old.clone())?;
        }
        for change in self.score.iter().rev() {
            match change {
                ScoreChange::KeyBeats { old, .. } => score.key_beats = old.clone(),
                ScoreChange::Scales { old, .. } => score.scales = old.clone(),
                ScoreChange::LoopDurBeat { old, .. } => score.loop_dur_beat = *old,
                ScoreChange::BeatRange { old, .. } => score.beat_range = old.clone(),
                ScoreChange::IsShownSpectrogram { old, .. } => score.is_shown_spectrogram = *old,
                ScoreChange::ToneAdded { .. } => {}
            }
        }
        Ok(())
    }

    /// Put the new values (back) in place.
    pub fn apply(&self, score: &mut Score) -> Result<(), ScoreError> {
        for change in self.score.iter() {
            match change {
                ScoreChange::KeyBeats { new, .. } => score.key_beats = new.clone(),
                ScoreChange::Scales { new, .. } => score.scales = new.clone(),
                ScoreChange::LoopDurBeat { new, .. } => score.loop_dur_beat = *new,
                ScoreChange::BeatRange { new, .. } => score.beat_range = new.clone(),
                ScoreChange::IsShownSpectrogram { new, .. } => score.is_shown_spectrogram = *new,
                ScoreChange::ToneAdded { id, tone } => {
                    if score.tones.set(*id, tone.clone()).is_err() {
                        warn!("cannot restore tone {:?}, it was never handed out", id);
                    }
                }
            }
        }
        for change in self.notes.iter() {
            score.replace(change.index, change.new.clone())?;
        }
        Ok(())
    }
}

/// The undo history of the surrounding editor.
pub trait Undo {
    /// Start a new group; everything captured until the next call is undone at once.
    fn begin_undo_group(&mut self);
    fn capture(&mut self, capture: Capture);
}

/// An undo history that only records what it is given.
#[derive(Debug, Clone, Default)]
pub struct UndoLog {
    pub groups: Vec<Vec<Capture>>,
}

impl UndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revert the last group on a score and drop it from the log.
    pub fn undo(&mut self, score: &mut Score) -> Result<bool, ScoreError> {
        match self.groups.pop() {
            None => Ok(false),
            Some(group) => {
                for capture in group.iter().rev() {
                    capture.revert(score)?;
                }
                Ok(true)
            }
        }
    }
}

impl Undo for UndoLog {
    fn begin_undo_group(&mut self) {
        self.groups.push(Vec::new());
    }

    fn capture(&mut self, capture: Capture) {
        debug!(
            "captured {} note and {} score changes",
            capture.notes.len(),
            capture.score.len()
        );
        match self.groups.last_mut() {
            Some(group) => group.push(capture),
            None => self.groups.push(vec![capture]),
        }
    }
}

/// The current selection of the surrounding editor.
pub trait Selection {
    /// The rectangles the user has selected, in layout space.
    fn current_selection_rects(&self) -> Vec<Rect>;

    /// The notes touched by a selection, each with its selected pits.
    fn note_and_pit_indexes(
        &self,
        score: &Score,
        mapper: &Mapper,
        rects: &[Rect],
    ) -> BTreeMap<usize, Vec<usize>>;
}

/// A selection made of plain rectangles, resolved geometrically:
/// a note is selected when its body touches a rectangle, a pit when its marker lies in one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RectSelection {
    pub rects: Vec<Rect>,
}

impl RectSelection {
    pub fn new(rects: Vec<Rect>) -> Self {
        RectSelection { rects }
    }
}

impl Selection for RectSelection {
    fn current_selection_rects(&self) -> Vec<Rect> {
        self.rects.clone()
    }

    fn note_and_pit_indexes(
        &self,
        score: &Score,
        mapper: &Mapper,
        rects: &[Rect],
    ) -> BTreeMap<usize, Vec<usize>> {
        let mut selected = BTreeMap::new();
        for (index, note) in score.iter().enumerate() {
            let line = geometry::pointline(note, mapper);
            if line.is_empty() {
                continue;
            }
            let (top, bottom) = line.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(t, b), p| {
                (t.min(p.y), b.max(p.y))
            });
            let bounds = Rect::from_edges(
                mapper.x(note.start()),
                top - NOTE_HALF_HEIGHT,
                mapper.x(note.end()),
                bottom + NOTE_HALF_HEIGHT,
            );
            if !rects.iter().any(|rect| rect.intersects(&bounds)) {
                continue;
            }
            let pits = (0..note.pits.len())
                .filter(|&i| {
                    geometry::pit_point(note, i, mapper).map_or(false, |p| {
                        rects.iter().any(|rect| rect.squared_distance(p) == 0.0)
                    })
                })
                .collect();
            selected.insert(index, pits);
        }
        selected
    }
}

/// One pit as heard by the preview player.
#[derive(Debug, Clone, PartialEq)]
pub struct PitResult {
    /// Absolute pitch.
    pub pitch: Rational,
    /// Absolute beat.
    pub beat: Beat,
    /// The beat in seconds at the score's tempo.
    pub seconds: Rational,
    pub stereo: Stereo,
    pub tone: ToneId,
}

/// The audio preview. Calls must return right away; playback happens elsewhere.
pub trait NotePlayer {
    fn play(&mut self, pits: Vec<PitResult>);
    fn stop(&mut self);
}

/// A player that does not make a sound.
#[derive(Debug, Copy, Clone, Default)]
pub struct SilentPlayer;

impl NotePlayer for SilentPlayer {
    fn play(&mut self, _pits: Vec<PitResult>) {}

    fn stop(&mut self) {}
}
