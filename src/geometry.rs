// pitroll -- the interactive editing core of a pitch/beat piano roll
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Shapes derived from notes. Rendering and hit-testing both go through these functions,
//! so what is drawn is exactly what can be clicked.

use std::collections::BTreeSet;
use std::ops::Range;

use crate::coords::metrics::*;
use crate::coords::{Mapper, Point, Rect};
use crate::note::Note;
use crate::rational::Rational;
use crate::tone::{Overtone, Sprol, SPECT_MAX_PITCH, SPECT_MIN_PITCH};

/// Half the height of a note body.
pub const NOTE_HALF_HEIGHT: f64 = PITCH_HEIGHT / 2.0;

/// Which notes show their tone panels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditOptions {
    /// Global full edit mode, showing the panels of notes at minimal panel height.
    pub is_full_edit: bool,
    /// Notes whose tone editing was switched on individually.
    pub edit_tone_notes: BTreeSet<usize>,
}

impl EditOptions {
    pub fn is_panel_visible(&self, index: usize, note: &Note) -> bool {
        (self.is_full_edit && note.spectlope_height == MIN_SPECTLOPE_HEIGHT)
            || self.edit_tone_notes.contains(&index)
    }
}

/// The polyline tracing the pitch curve of a note.
///
/// A single-pit note is a flat segment. Otherwise the curve is sampled every
/// `1 / POINTLINE_RESOLUTION` beats from the note start, always including the end,
/// and a stack adds one point per lower pit so the jump is drawn.
pub fn pointline(note: &Note, mapper: &Mapper) -> Vec<Point> {
    let point_at = |beat: Rational, pitch: Rational| Point::new(mapper.x(beat), mapper.y(pitch));
    if note.is_single_pit() {
        let pitch = note.pitch_at(note.start());
        return vec![point_at(note.start(), pitch), point_at(note.end(), pitch)];
    }

    let step = Rational::nth(POINTLINE_RESOLUTION);
    let mut beats = BTreeSet::new();
    let mut beat = note.start();
    while beat < note.end() {
        beats.insert(beat);
        beat += step;
    }
    beats.insert(note.end().max(note.start()));

    // Pits sitting below another pit on the same beat.
    let stacked: Vec<usize> = note
        .pits
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0].beat == pair[1].beat)
        .map(|(i, _)| i)
        .collect();
    for &i in stacked.iter() {
        let stack_beat = note.start() + note.pits[i].beat;
        if stack_beat >= note.start() && stack_beat <= note.end() {
            beats.insert(stack_beat);
        }
    }

    let mut points = Vec::with_capacity(beats.len() + stacked.len());
    for beat in beats {
        for &i in stacked.iter() {
            if note.start() + note.pits[i].beat == beat {
                points.push(point_at(beat, note.pitch + note.pits[i].pitch));
            }
        }
        points.push(point_at(beat, note.pitch_at(beat)));
    }
    points
}

/// Squared distance from a point to a polyline. A single point counts as a polyline.
pub fn squared_distance_to_polyline(points: &[Point], point: Point) -> f64 {
    match points {
        [] => f64::INFINITY,
        [single] => single.squared_distance(point),
        _ => points
            .windows(2)
            .map(|segment| squared_distance_to_segment(segment[0], segment[1], point))
            .fold(f64::INFINITY, f64::min),
    }
}

fn squared_distance_to_segment(a: Point, b: Point, point: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length_sq = dx * dx + dy * dy;
    if length_sq <= 0.0 {
        return a.squared_distance(point);
    }
    let t = (((point.x - a.x) * dx + (point.y - a.y) * dy) / length_sq)
        .max(0.0)
        .min(1.0);
    point.squared_distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Position of a pit marker.
pub fn pit_point(note: &Note, index: usize, mapper: &Mapper) -> Option<Point> {
    Some(Point::new(
        mapper.x(note.pit_beat(index)?),
        mapper.y(note.pit_pitch(index)?),
    ))
}

/// Lower edge of the tone panel of a pit, hovering above the pit.
pub fn panel_bottom(note: &Note, index: usize, mapper: &Mapper) -> Option<f64> {
    let pitch = note.pit_pitch(index)?;
    Some(mapper.y(pitch) - NOTE_HALF_HEIGHT - PANEL_PADDING)
}

/// A rectangle hosting the spectral envelope editor for a run of pits.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneFrame {
    /// The pits sharing this frame.
    pub pits: Range<usize>,
    pub rect: Rect,
}

impl ToneFrame {
    /// The pit whose tone the frame shows.
    pub fn pit(&self) -> usize {
        self.pits.start
    }
}

/// Partition a note into tone frames.
///
/// A pit joins the open frame when its panel sits within half a padding of the frame's
/// first pit and it is not stacked on the previous pit. A stack always starts a new frame,
/// and the frame below it is at least `STACK_FRAME_WIDTH` wide.
pub fn tone_frames(note: &Note, mapper: &Mapper) -> Vec<ToneFrame> {
    let bottoms: Vec<f64> = (0..note.pits.len())
        .filter_map(|i| panel_bottom(note, i, mapper))
        .collect();
    if bottoms.is_empty() {
        return Vec::new();
    }

    let mut groups = Vec::new();
    let mut open = 0;
    for i in 1..note.pits.len() {
        let is_stacked = note.pits[i].beat == note.pits[i - 1].beat;
        let is_close = (bottoms[i] - bottoms[open]).abs() <= PANEL_PADDING / 2.0;
        if is_stacked || !is_close {
            groups.push(open..i);
            open = i;
        }
    }
    groups.push(open..note.pits.len());

    let mut lefts: Vec<f64> = groups
        .iter()
        .enumerate()
        .map(|(k, group)| {
            if k == 0 {
                mapper.x(note.start())
            } else {
                mapper.x(note.start() + note.pits[group.start].beat)
            }
        })
        .collect();
    // The lower pit of a stack keeps a frame of its own; later frames move right.
    for k in 1..groups.len() {
        let first = groups[k].start;
        if note.pits[first].beat == note.pits[first - 1].beat {
            lefts[k] = lefts[k].max(lefts[k - 1] + STACK_FRAME_WIDTH);
        }
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(k, pits)| {
            let right = lefts
                .get(k + 1)
                .copied()
                .unwrap_or_else(|| mapper.x(note.end()));
            let bottom = bottoms[pits.clone()]
                .iter()
                .copied()
                .fold(f64::INFINITY, f64::min);
            ToneFrame {
                rect: Rect::from_edges(lefts[k], bottom - note.spectlope_height, right, bottom),
                pits,
            }
        })
        .collect()
}

/// Where a spectral control point is drawn inside its frame:
/// volume runs left to right, spectral pitch bottom to top.
pub fn sprol_knob(frame: &Rect, sprol: &Sprol) -> Point {
    let t = (sprol.pitch - SPECT_MIN_PITCH) / (SPECT_MAX_PITCH - SPECT_MIN_PITCH);
    Point::new(
        frame.left() + sprol.volm * frame.width,
        frame.bottom() - t * frame.height,
    )
}

/// Where the even harmonics amplitude knob is drawn: on the right edge, higher is louder.
pub fn even_amplitude_knob(frame: &Rect, overtone: &Overtone) -> Point {
    Point::new(
        frame.right(),
        frame.bottom() - overtone.even_amplitude * frame.height,
    )
}

/// Convert a movement inside a frame to a change of (spectral pitch, volume).
/// A collapsed frame moves nothing.
pub fn panel_delta(frame: &Rect, dx: f64, dy: f64) -> (f64, f64) {
    let pitch = if frame.height > 0.0 {
        -dy / frame.height * (SPECT_MAX_PITCH - SPECT_MIN_PITCH)
    } else {
        0.0
    };
    let volm = if frame.width > 0.0 { dx / frame.width } else { 0.0 };
    (pitch, volm)
}

/// The box of a pit's lyric, right below the pit. Pits without a lyric have none.
pub fn lyric_rect(note: &Note, index: usize, mapper: &Mapper) -> Option<Rect> {
    let pit = note.pits.get(index)?;
    if pit.lyric.is_empty() {
        return None;
    }
    let origin = pit_point(note, index, mapper)?;
    Some(Rect::new(
        origin.x,
        origin.y + NOTE_HALF_HEIGHT,
        pit.lyric.chars().count() as f64 * LYRIC_CHAR_WIDTH,
        LYRIC_HEIGHT,
    ))
}

/// The spectrogram toggle, at the left of the timeline band.
pub fn spectrogram_toggle_rect(mapper: &Mapper) -> Rect {
    Rect::new(
        0.0,
        mapper.timeline_y + (TIMELINE_HEIGHT - TOGGLE_SIZE) / 2.0,
        TOGGLE_SIZE,
        TOGGLE_SIZE,
    )
}

/// Every shape of one note, computed once for both drawing and hit-testing.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteShape {
    pub pointline: Vec<Point>,
    pub frames: Vec<ToneFrame>,
    pub pit_points: Vec<Point>,
    pub start_x: f64,
    pub end_x: f64,
}

impl NoteShape {
    pub fn new(note: &Note, mapper: &Mapper) -> Self {
        NoteShape {
            pointline: pointline(note, mapper),
            frames: tone_frames(note, mapper),
            pit_points: (0..note.pits.len())
                .filter_map(|i| pit_point(note, i, mapper))
                .collect(),
            start_x: mapper.x(note.start()),
            end_x: mapper.x(note.end()),
        }
    }

    /// Width of the note on the layout.
    pub fn width(&self) -> f64 {
        (self.end_x - self.start_x).max(0.0)
    }
}
