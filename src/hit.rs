// pitroll -- the interactive editing core of a pitch/beat piano roll
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Resolving a point on the surface to the thing under it.

use log::trace;

use crate::coords::metrics::MIN_CAPTURE_RADIUS;
use crate::coords::{capture_radius, edge_band, Mapper, Point};
use crate::geometry::{self, EditOptions, NoteShape, ToneFrame, NOTE_HALF_HEIGHT};
use crate::note::Note;
use crate::score::Score;

/// The part of a note that was hit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NotePart {
    /// The body, for moving the whole note.
    Body,
    /// The handle left of the note.
    StartBeat,
    /// The handle right of the note.
    EndBeat,
    Pit(usize),
    Lyric(usize),
    /// The even harmonics knob of the tone panel showing this pit's tone.
    EvenAmplitude(usize),
    /// A spectral control point of the tone of one pit.
    Sprol { pit: usize, sprol: usize },
    /// A spectral control point of the tone shared by all pits of the note.
    AllSprol(usize),
    /// The top edge of a tone panel, resizing all panels of the note.
    SpectlopeHeight,
}

/// Everything a point can resolve to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Hit {
    Note { index: usize, part: NotePart },
    KeyBeat(usize),
    Scale(usize),
    SpectrogramToggle,
    LoopDurBeat,
    EndOfTimelineBeat,
    /// The timeline band away from any marker, shifting everything in time.
    AllBeat,
}

/// Resolve a point to the most specific thing under it.
///
/// `scale` is the number of layout units per screen pixel, so capture radii stay
/// the same size on screen at any zoom. Notes on top win over the notes below them.
pub fn classify(
    score: &Score,
    mapper: &Mapper,
    options: &EditOptions,
    point: Point,
    scale: f64,
) -> Option<Hit> {
    let hit = if mapper.is_in_timeline(point) {
        Some(classify_timeline(score, mapper, point, scale))
    } else {
        let shapes: Vec<NoteShape> = score
            .iter()
            .map(|note| NoteShape::new(note, mapper))
            .collect();
        classify_panels(score, &shapes, options, point, scale)
            .or_else(|| classify_notes(score, &shapes, mapper, point, scale))
            .or_else(|| classify_scales(score, mapper, point, scale))
    };
    trace!("classified {:?} as {:?}", point, hit);
    hit
}

fn classify_timeline(score: &Score, mapper: &Mapper, point: Point, scale: f64) -> Hit {
    if geometry::spectrogram_toggle_rect(mapper).contains(point) {
        return Hit::SpectrogramToggle;
    }
    let radius = capture_radius(scale);
    let markers = score
        .key_beats
        .iter()
        .enumerate()
        .map(|(i, &beat)| (beat, Hit::KeyBeat(i)))
        .chain(std::iter::once((
            score.beat_range.start + score.loop_dur_beat,
            Hit::LoopDurBeat,
        )))
        .chain(std::iter::once((score.beat_range.end, Hit::EndOfTimelineBeat)));

    nearest(
        markers.map(|(beat, hit)| {
            let dx = mapper.x(beat) - point.x;
            (dx * dx, hit)
        }),
        radius * radius,
    )
    .unwrap_or(Hit::AllBeat)
}

/// The candidate with the smallest squared distance not above `limit_sq`.
/// Earlier candidates win ties.
fn nearest<T, I: Iterator<Item = (f64, T)>>(candidates: I, limit_sq: f64) -> Option<T> {
    let mut best: Option<(f64, T)> = None;
    for (distance_sq, candidate) in candidates {
        if distance_sq > limit_sq {
            continue;
        }
        if best.as_ref().map_or(true, |(d, _)| distance_sq < *d) {
            best = Some((distance_sq, candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}

/// The knobs drawn inside a frame, with the part each one edits.
fn frame_knobs(score: &Score, note: &Note, frame: &ToneFrame) -> Vec<(Point, NotePart)> {
    let pit = frame.pit();
    let tone = match note.pits.get(pit).map(|p| score.tones.get(p.tone)) {
        Some(Ok(tone)) => tone,
        _ => return Vec::new(),
    };
    let is_shared = note.uniform_tone().is_some();
    let mut knobs: Vec<(Point, NotePart)> = tone
        .spectlope
        .sprols()
        .iter()
        .enumerate()
        .map(|(sprol_index, sprol)| {
            let part = if is_shared {
                NotePart::AllSprol(sprol_index)
            } else {
                NotePart::Sprol {
                    pit,
                    sprol: sprol_index,
                }
            };
            (geometry::sprol_knob(&frame.rect, sprol), part)
        })
        .collect();
    knobs.push((
        geometry::even_amplitude_knob(&frame.rect, &tone.overtone),
        NotePart::EvenAmplitude(pit),
    ));
    knobs
}

/// Tone panels come first: a point inside a panel never falls through to anything else.
fn classify_panels(
    score: &Score,
    shapes: &[NoteShape],
    options: &EditOptions,
    point: Point,
    scale: f64,
) -> Option<Hit> {
    let radius = capture_radius(scale);
    let radius_sq = radius * radius;
    let mut candidates = Vec::new();

    for (index, (note, shape)) in score.iter().zip(shapes).enumerate().rev() {
        if !options.is_panel_visible(index, note) {
            continue;
        }
        for frame in shape.frames.iter() {
            let rect = &frame.rect;
            let knobs = frame_knobs(score, note, frame);
            if rect.contains(point) {
                let part = if point.y - rect.top() <= radius {
                    NotePart::SpectlopeHeight
                } else {
                    knobs
                        .iter()
                        .map(|(knob, part)| (knob.squared_distance(point), *part))
                        .fold(None, |best: Option<(f64, NotePart)>, (d, part)| match best {
                            Some((best_d, _)) if best_d <= d => best,
                            _ => Some((d, part)),
                        })
                        .map_or(NotePart::SpectlopeHeight, |(_, part)| part)
                };
                return Some(Hit::Note { index, part });
            }

            if point.x >= rect.left() && point.x <= rect.right() {
                let dy = point.y - rect.top();
                candidates.push((
                    dy * dy,
                    Hit::Note {
                        index,
                        part: NotePart::SpectlopeHeight,
                    },
                ));
            }
            for (knob, part) in knobs {
                candidates.push((knob.squared_distance(point), Hit::Note { index, part }));
            }
        }
    }
    nearest(candidates.into_iter(), radius_sq)
}

fn classify_notes(
    score: &Score,
    shapes: &[NoteShape],
    mapper: &Mapper,
    point: Point,
    scale: f64,
) -> Option<Hit> {
    score
        .iter()
        .zip(shapes)
        .enumerate()
        .rev()
        .find_map(|(index, (note, shape))| {
            classify_note(note, shape, mapper, point, scale).map(|part| Hit::Note { index, part })
        })
}

fn classify_note(
    note: &Note,
    shape: &NoteShape,
    mapper: &Mapper,
    point: Point,
    scale: f64,
) -> Option<NotePart> {
    // Short notes get smaller pit targets, so both ends of a tiny note stay apart.
    let pit_radius = capture_radius(scale)
        .min(shape.width() / 4.0)
        .max(MIN_CAPTURE_RADIUS);
    // Outside the note's horizontal bounds the start and end handles take over.
    let is_within = point.x >= shape.start_x && point.x <= shape.end_x;
    if is_within {
        let pit = nearest(
            shape
                .pit_points
                .iter()
                .enumerate()
                .rev()
                .map(|(i, p)| (p.squared_distance(point), NotePart::Pit(i))),
            pit_radius * pit_radius,
        );
        if pit.is_some() {
            return pit;
        }
    }

    let lyric = (0..note.pits.len()).find(|&i| {
        geometry::lyric_rect(note, i, mapper).map_or(false, |rect| rect.contains(point))
    });
    if let Some(i) = lyric {
        return Some(NotePart::Lyric(i));
    }

    let half_sq = NOTE_HALF_HEIGHT * NOTE_HALF_HEIGHT;
    if is_within && geometry::squared_distance_to_polyline(&shape.pointline, point) <= half_sq {
        return Some(NotePart::Body);
    }

    let band = edge_band(scale);
    let is_level_with =
        |end: Option<&Point>| end.map_or(false, |p| (p.y - point.y).abs() <= NOTE_HALF_HEIGHT);
    if point.x >= shape.start_x - band
        && point.x < shape.start_x
        && is_level_with(shape.pointline.first())
    {
        return Some(NotePart::StartBeat);
    }
    if point.x > shape.end_x
        && point.x <= shape.end_x + band
        && is_level_with(shape.pointline.last())
    {
        return Some(NotePart::EndBeat);
    }
    None
}

fn classify_scales(score: &Score, mapper: &Mapper, point: Point, scale: f64) -> Option<Hit> {
    let radius = capture_radius(scale);
    nearest(
        score.scales.iter().enumerate().map(|(i, &pitch)| {
            let dy = mapper.y(pitch) - point.y;
            (dy * dy, Hit::Scale(i))
        }),
        radius * radius,
    )
}
