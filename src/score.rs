// pitroll -- the interactive editing core of a pitch/beat piano roll
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The score: every note of the surface plus the timeline markers around them.

use std::ops::Range;

use snafu::Snafu;

use crate::note::Note;
use crate::rational::Rational;
use crate::tone::ToneArena;

/// Time in beats, can be fractional, e.g. a note taking 1/4.
pub type Beat = Rational;

/// Possible errors of the whole-note editing calls.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ScoreError {
    #[snafu(display("Note index {} is out of range for {} notes", index, len))]
    NoteIndexOutOfRange { index: usize, len: usize },
}

/// A score is the set of notes shown on the surface.
///
/// Notes are only changed by replacing them as a whole, which keeps them plain values
/// that can be compared before and after an edit.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    /// The notes in drawing order; later notes are drawn on top.
    notes: Vec<Note>,
    /// Unconfirmed notes, shown as a preview only.
    pub draft_notes: Vec<Note>,
    /// Beats per minute, always positive.
    pub tempo: Rational,
    /// The range of the timeline.
    pub beat_range: Range<Beat>,
    /// Marker beats on the timeline, in order.
    pub key_beats: Vec<Beat>,
    /// Pitches of the horizontal scale lines.
    pub scales: Vec<Rational>,
    /// Length of the playback loop.
    pub loop_dur_beat: Beat,
    pub is_shown_spectrogram: bool,
    /// Top of the timeline band.
    pub timeline_y: f64,
    /// All sound colors referenced by pits.
    pub tones: ToneArena,
}

impl Score {
    pub fn new(tempo: Rational) -> Self {
        assert!(tempo > Rational::zero(), "tempo must be positive");
        Score {
            notes: Vec::new(),
            draft_notes: Vec::new(),
            tempo,
            beat_range: Rational::zero()..Rational::int(16),
            key_beats: Vec::new(),
            scales: Vec::new(),
            loop_dur_beat: Rational::int(4),
            is_shown_spectrogram: false,
            timeline_y: 0.0,
            tones: ToneArena::new(),
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Add a note on top of all others, returning its index.
    pub fn push(&mut self, note: Note) -> usize {
        self.notes.push(note);
        self.notes.len() - 1
    }

    /// Replace a note, returning the old value.
    pub fn replace(&mut self, index: usize, note: Note) -> Result<Note, ScoreError> {
        let len = self.notes.len();
        let slot = self
            .notes
            .get_mut(index)
            .ok_or(ScoreError::NoteIndexOutOfRange { index, len })?;
        Ok(std::mem::replace(slot, note))
    }

    /// Insert a note at an index, shifting all notes above it.
    pub fn insert(&mut self, index: usize, note: Note) -> Result<(), ScoreError> {
        let len = self.notes.len();
        if index > len {
            return Err(ScoreError::NoteIndexOutOfRange { index, len });
        }
        self.notes.insert(index, note);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Note, ScoreError> {
        let len = self.notes.len();
        if index >= len {
            return Err(ScoreError::NoteIndexOutOfRange { index, len });
        }
        Ok(self.notes.remove(index))
    }

    /// Time in seconds at which a beat sounds.
    ///
    /// ```
    /// # use pitroll::rational::Rational;
    /// # use pitroll::score::Score;
    /// let score = Score::new(Rational::int(120));
    /// assert_eq!(score.seconds(Rational::int(3)), Rational::new(3, 2));
    /// ```
    pub fn seconds(&self, beat: Beat) -> Rational {
        beat * 60 / self.tempo
    }

    /// Iterate all notes in drawing order.
    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.notes.iter()
    }
}
