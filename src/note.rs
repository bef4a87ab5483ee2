// pitroll -- the interactive editing core of a pitch/beat piano roll
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Definitions of what a note is.

use std::fmt;
use std::ops::Range;

use crate::coords::metrics::DEFAULT_SPECTLOPE_HEIGHT;
use crate::rational::Rational;
use crate::tone::ToneId;

/// Stereo placement of a pit.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Stereo {
    /// Left (-1) to right (1).
    pub pan: f64,
    /// Volume in [0, 1].
    pub volm: f64,
}

impl Default for Stereo {
    fn default() -> Self {
        Stereo { pan: 0.0, volm: 1.0 }
    }
}

/// A control point of a note, carrying pitch bend, stereo placement and sound color.
#[derive(Debug, Clone, PartialEq)]
pub struct Pit {
    /// Offset from the start of the owning note.
    pub beat: Rational,
    /// Offset from the pitch of the owning note.
    pub pitch: Rational,
    pub stereo: Stereo,
    pub tone: ToneId,
    pub lyric: String,
}

impl Pit {
    pub fn new(beat: Rational, pitch: Rational, tone: ToneId) -> Self {
        Pit {
            beat,
            pitch,
            stereo: Stereo::default(),
            tone,
            lyric: String::new(),
        }
    }

    pub fn with_lyric(mut self, lyric: &str) -> Self {
        self.lyric = lyric.to_string();
        self
    }
}

/// A note: a base pitch held over a range of beats, shaped by its pits.
///
/// The pits are ordered by beat. Two pits on the same beat form a stack,
/// which makes the pitch jump at that beat.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub pitch: Rational,
    pub beat_range: Range<Rational>,
    pub pits: Vec<Pit>,
    /// Height of the tone panel drawn above the note.
    pub spectlope_height: f64,
}

impl Note {
    pub fn new(pitch: Rational, beat_range: Range<Rational>, pits: Vec<Pit>) -> Self {
        Note {
            pitch,
            beat_range,
            pits,
            spectlope_height: DEFAULT_SPECTLOPE_HEIGHT,
        }
    }

    /// A note with a single pit at its start.
    pub fn simple(pitch: Rational, beat_range: Range<Rational>, tone: ToneId) -> Self {
        Note::new(
            pitch,
            beat_range,
            vec![Pit::new(Rational::zero(), Rational::zero(), tone)],
        )
    }

    pub fn start(&self) -> Rational {
        self.beat_range.start
    }

    pub fn end(&self) -> Rational {
        self.beat_range.end
    }

    pub fn length(&self) -> Rational {
        self.beat_range.end - self.beat_range.start
    }

    pub fn is_single_pit(&self) -> bool {
        self.pits.len() <= 1
    }

    /// Absolute beat of a pit.
    pub fn pit_beat(&self, index: usize) -> Option<Rational> {
        self.pits.get(index).map(|pit| self.start() + pit.beat)
    }

    /// Absolute pitch of a pit.
    pub fn pit_pitch(&self, index: usize) -> Option<Rational> {
        self.pits.get(index).map(|pit| self.pitch + pit.pitch)
    }

    /// The absolute pitch sounding at an absolute beat.
    ///
    /// Pitch moves linearly from pit to pit, stays flat before the first and after the last one,
    /// and the later pit of a stack wins on the stack's beat.
    ///
    /// ```
    /// # use pitroll::note::*;
    /// # use pitroll::rational::Rational;
    /// # use pitroll::tone::ToneArena;
    /// let tone = ToneArena::new().reserve();
    /// let note = Note::new(
    ///     Rational::int(60),
    ///     Rational::int(0)..Rational::int(4),
    ///     vec![
    ///         Pit::new(Rational::int(0), Rational::int(0), tone),
    ///         Pit::new(Rational::int(2), Rational::int(2), tone),
    ///     ],
    /// );
    /// assert_eq!(note.pitch_at(Rational::int(1)), Rational::int(61));
    /// assert_eq!(note.pitch_at(Rational::int(3)), Rational::int(62));
    /// ```
    pub fn pitch_at(&self, beat: Rational) -> Rational {
        let offset = beat - self.start();
        let current = self.pits.iter().rposition(|pit| pit.beat <= offset);
        let relative = match current {
            None => self.pits.first().map_or(Rational::zero(), |pit| pit.pitch),
            Some(i) => match self.pits.get(i + 1) {
                None => self.pits[i].pitch,
                Some(next) => {
                    let pit = &self.pits[i];
                    let span = next.beat - pit.beat;
                    if span.is_zero() {
                        next.pitch
                    } else {
                        pit.pitch + (next.pitch - pit.pitch) * (offset - pit.beat) / span
                    }
                }
            },
        };
        self.pitch + relative
    }

    pub fn has_tone(&self, tone: ToneId) -> bool {
        self.pits.iter().any(|pit| pit.tone == tone)
    }

    /// The tone all pits share, if they share one.
    pub fn uniform_tone(&self) -> Option<ToneId> {
        let first = self.pits.first()?.tone;
        if self.pits.iter().all(|pit| pit.tone == first) {
            Some(first)
        } else {
            None
        }
    }

    /// The same note moved in time and pitch, pits unchanged.
    pub fn translated(&self, beat: Rational, pitch: Rational) -> Note {
        Note {
            pitch: self.pitch + pitch,
            beat_range: self.start() + beat..self.end() + beat,
            pits: self.pits.clone(),
            spectlope_height: self.spectlope_height,
        }
    }

    /// Restore the pit invariants after pit beats were moved:
    /// a negative pit beat is absorbed by moving the note start left,
    /// and a pit beyond the end makes the note longer.
    pub fn fit_range_to_pits(&mut self) {
        let min_beat = self.pits.iter().map(|pit| pit.beat).min();
        if let Some(min_beat) = min_beat {
            if min_beat.is_negative() {
                self.beat_range.start += min_beat;
                for pit in self.pits.iter_mut() {
                    pit.beat -= min_beat;
                }
            }
        }
        let max_beat = self.pits.iter().map(|pit| pit.beat).max();
        if let Some(max_beat) = max_beat {
            if max_beat > self.length() {
                self.beat_range.end = self.start() + max_beat;
            }
        }
    }
}

/// The name of a pitch in standard notation, for display.
/// Follows the MIDI numbering where C4 corresponds to 60.
/// Fractional pitches show their offset from the semitone below.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PitchName(pub Rational);

impl fmt::Display for PitchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        static NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        let semitone = self.0.floor();
        let fraction = self.0 - Rational::int(semitone);
        // C4 is MIDI note number 60
        let octave = semitone.div_euclid(12) - 1;
        write!(f, "{}{}", NAMES[semitone.rem_euclid(12) as usize], octave)?;
        if !fraction.is_zero() {
            write!(f, " +{}", fraction)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tone::ToneArena;
    use expect_test::expect;

    fn r(n: i64) -> Rational {
        Rational::int(n)
    }

    #[test]
    fn pitch_names() {
        let names: Vec<String> = [r(60), r(69), Rational::new(133, 2), r(0), r(-1)]
            .iter()
            .map(|&p| PitchName(p).to_string())
            .collect();
        expect![[r#"["C4", "A4", "F#4 +1/2", "C-1", "B-2"]"#]].assert_eq(&format!("{:?}", names));
    }

    #[test]
    fn stacks_jump() {
        let tone = ToneArena::new().reserve();
        let note = Note::new(
            r(60),
            r(1)..r(5),
            vec![
                Pit::new(r(1), r(0), tone),
                Pit::new(r(2), r(0), tone),
                Pit::new(r(2), r(5), tone),
            ],
        );
        assert_eq!(note.pitch_at(r(1)), r(60));
        assert_eq!(note.pitch_at(r(2)), r(60));
        assert_eq!(note.pitch_at(r(3)), r(65));
        assert_eq!(note.pitch_at(r(5)), r(65));
        assert_eq!(note.pit_beat(2), Some(r(3)));
        assert_eq!(note.pit_pitch(2), Some(r(65)));
        assert_eq!(note.pit_pitch(3), None);
    }

    #[test]
    fn fit_range_absorbs_and_grows() {
        let tone = ToneArena::new().reserve();
        let mut note = Note::new(
            r(60),
            r(4)..r(8),
            vec![Pit::new(r(-1), r(0), tone), Pit::new(r(5), r(2), tone)],
        );
        note.fit_range_to_pits();
        assert_eq!(note.beat_range, r(3)..r(9));
        assert_eq!(note.pits[0].beat, r(0));
        assert_eq!(note.pits[1].beat, r(6));
    }

    #[test]
    fn uniform_tone() {
        let mut arena = ToneArena::new();
        let (a, b) = (arena.reserve(), arena.reserve());
        let mut note = Note::simple(r(60), r(0)..r(1), a);
        assert_eq!(note.uniform_tone(), Some(a));
        note.pits.push(Pit::new(r(1), r(0), b));
        assert_eq!(note.uniform_tone(), None);
        assert!(note.has_tone(b));
    }
}
