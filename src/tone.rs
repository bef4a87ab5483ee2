// pitroll -- the interactive editing core of a pitch/beat piano roll
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Sound colors: spectral envelopes and overtone shapes, and the arena that gives them identity.

use std::collections::BTreeMap;

use snafu::Snafu;

/// Lowest spectral pitch shown in a tone panel.
pub const SPECT_MIN_PITCH: f64 = 0.0;
/// Highest spectral pitch shown in a tone panel.
pub const SPECT_MAX_PITCH: f64 = 144.0;

/// One control point of a spectral envelope.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sprol {
    /// Spectral pitch in semitones.
    pub pitch: f64,
    /// Volume at that pitch, in [0, 1].
    pub volm: f64,
    /// Noise ratio at that pitch, in [0, 1].
    pub noise: f64,
}

impl Sprol {
    pub fn new(pitch: f64, volm: f64, noise: f64) -> Self {
        Sprol {
            pitch: pitch.max(SPECT_MIN_PITCH).min(SPECT_MAX_PITCH),
            volm: volm.max(0.0).min(1.0),
            noise: noise.max(0.0).min(1.0),
        }
    }
}

/// A spectral envelope, its control points ordered by pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectlope {
    sprols: Vec<Sprol>,
}

impl Spectlope {
    /// Create an envelope, putting the points in pitch order.
    pub fn new(mut sprols: Vec<Sprol>) -> Self {
        sprols.sort_by(|a, b| {
            a.pitch
                .partial_cmp(&b.pitch)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Spectlope { sprols }
    }

    /// Pure noise over the whole spectrum.
    pub fn full_noise() -> Self {
        Spectlope::new(vec![
            Sprol::new(SPECT_MIN_PITCH, 1.0, 1.0),
            Sprol::new(SPECT_MAX_PITCH, 1.0, 1.0),
        ])
    }

    pub fn is_full_noise(&self) -> bool {
        !self.sprols.is_empty() && self.sprols.iter().all(|sprol| sprol.noise >= 1.0)
    }

    pub fn sprols(&self) -> &[Sprol] {
        &self.sprols
    }

    pub fn get(&self, index: usize) -> Option<&Sprol> {
        self.sprols.get(index)
    }

    pub fn len(&self) -> usize {
        self.sprols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprols.is_empty()
    }

    /// The same envelope with one point replaced.
    /// The point's pitch is kept between its neighbors so the order survives.
    pub fn with_sprol(&self, index: usize, sprol: Sprol) -> Spectlope {
        let mut sprols = self.sprols.clone();
        if index >= sprols.len() {
            return self.clone();
        }
        let lower = index
            .checked_sub(1)
            .map_or(SPECT_MIN_PITCH, |i| sprols[i].pitch);
        let upper = sprols.get(index + 1).map_or(SPECT_MAX_PITCH, |s| s.pitch);
        let mut sprol = Sprol::new(sprol.pitch, sprol.volm, sprol.noise);
        sprol.pitch = sprol.pitch.max(lower).min(upper);
        sprols[index] = sprol;
        Spectlope { sprols }
    }

    /// Volume at a spectral pitch, interpolating linearly between the control points.
    pub fn volm_at(&self, pitch: f64) -> f64 {
        self.interpolate(pitch, |sprol| sprol.volm)
    }

    /// Noise ratio at a spectral pitch, interpolating linearly between the control points.
    pub fn noise_at(&self, pitch: f64) -> f64 {
        self.interpolate(pitch, |sprol| sprol.noise)
    }

    fn interpolate<F: Fn(&Sprol) -> f64>(&self, pitch: f64, value: F) -> f64 {
        let (first, last) = match (self.sprols.first(), self.sprols.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if pitch <= first.pitch {
            return value(first);
        }
        if pitch >= last.pitch {
            return value(last);
        }
        for pair in self.sprols.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if pitch <= b.pitch {
                let span = b.pitch - a.pitch;
                if span <= 0.0 {
                    return value(b);
                }
                let t = (pitch - a.pitch) / span;
                return value(a) + (value(b) - value(a)) * t;
            }
        }
        value(last)
    }
}

impl Default for Spectlope {
    fn default() -> Self {
        Spectlope::new(vec![
            Sprol::new(SPECT_MIN_PITCH, 1.0, 0.0),
            Sprol::new(72.0, 0.5, 0.0),
            Sprol::new(120.0, 0.0, 0.0),
        ])
    }
}

/// Amplitude scalars for the even and odd harmonics.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Overtone {
    pub even_amplitude: f64,
    pub odd_amplitude: f64,
}

impl Overtone {
    /// Only the fundamental sounds.
    pub fn is_one_overtone(&self) -> bool {
        self.even_amplitude <= 0.0 && self.odd_amplitude <= 0.0
    }
}

impl Default for Overtone {
    fn default() -> Self {
        Overtone {
            even_amplitude: 1.0,
            odd_amplitude: 1.0,
        }
    }
}

/// A sound color. Identity lives in the [`ToneArena`], not in the value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tone {
    pub overtone: Overtone,
    pub spectlope: Spectlope,
}

impl Tone {
    /// A plain sine-like tone: only the fundamental.
    pub fn one_overtone() -> Self {
        Tone {
            overtone: Overtone {
                even_amplitude: 0.0,
                odd_amplitude: 0.0,
            },
            spectlope: Spectlope::default(),
        }
    }

    pub fn with_even_amplitude(&self, amplitude: f64) -> Tone {
        let mut tone = self.clone();
        tone.overtone.even_amplitude = amplitude.max(0.0).min(1.0);
        tone
    }

    pub fn with_sprol(&self, index: usize, sprol: Sprol) -> Tone {
        Tone {
            overtone: self.overtone,
            spectlope: self.spectlope.with_sprol(index, sprol),
        }
    }
}

/// Stable identity of a tone. Pits holding equal ids share one sound color.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToneId(u64);

impl ToneId {
    pub fn index(self) -> u64 {
        self.0
    }
}

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ToneError {
    #[snafu(display("Tone {:?} does not exist", id))]
    UnknownTone { id: ToneId },
}

/// Owner of all tone values, addressed by id. Ids are handed out once and never reused,
/// so an old id stays resolvable for undo after an edit forked the tone.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToneArena {
    tones: BTreeMap<ToneId, Tone>,
    next_id: u64,
}

impl ToneArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a fresh id without storing a value yet.
    pub fn reserve(&mut self) -> ToneId {
        let id = ToneId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Store a tone under a fresh id.
    pub fn insert(&mut self, tone: Tone) -> ToneId {
        let id = self.reserve();
        self.tones.insert(id, tone);
        id
    }

    /// Store a tone under an id handed out by this arena.
    pub fn set(&mut self, id: ToneId, tone: Tone) -> Result<(), ToneError> {
        if id.0 >= self.next_id {
            return Err(ToneError::UnknownTone { id });
        }
        self.tones.insert(id, tone);
        Ok(())
    }

    pub fn get(&self, id: ToneId) -> Result<&Tone, ToneError> {
        self.tones.get(&id).ok_or(ToneError::UnknownTone { id })
    }

    pub fn contains(&self, id: ToneId) -> bool {
        self.tones.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tones.is_empty()
    }
}
