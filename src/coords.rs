// pitroll -- the interactive editing core of a pitch/beat piano roll
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Mapping between musical space (beat, pitch) and layout space (x, y).
//!
//! Layout space is the content space of the owning view. The view's zoom enters as `scale`,
//! the number of layout units covered by one screen pixel.

use crate::rational::Rational;
use crate::score::{Beat, Score};

/// Fixed visual constants of the surface, in layout units unless noted otherwise.
pub mod metrics {
    /// Width of one beat.
    pub const BEAT_WIDTH: f64 = 96.0;
    /// Height of one semitone.
    pub const PITCH_HEIGHT: f64 = 12.0;
    /// Space left of beat zero.
    pub const PADDING: f64 = 16.0;
    /// Height of the timeline band above the pitch area.
    pub const TIMELINE_HEIGHT: f64 = 40.0;
    /// Highest pitch, drawn at the top of the pitch area.
    pub const MAX_PITCH: i64 = 127;
    /// Capture radius for knobs, in screen pixels.
    pub const KNOB_EDIT_DISTANCE: f64 = 10.0;
    /// Lower bound of the capture radius.
    pub const MIN_CAPTURE_RADIUS: f64 = 0.5;
    /// Widest snapping step, in screen pixels.
    pub const SNAP_WIDTH: f64 = 24.0;
    /// Video frames per second, the finest meaningful time step.
    pub const FRAME_RATE: i64 = 60;
    /// Sampling steps per beat of the pitch curve.
    pub const POINTLINE_RESOLUTION: i64 = 48;
    /// Gap between a note and its tone panel.
    pub const PANEL_PADDING: f64 = 8.0;
    pub const MIN_SPECTLOPE_HEIGHT: f64 = 24.0;
    pub const DEFAULT_SPECTLOPE_HEIGHT: f64 = 48.0;
    pub const MAX_SPECTLOPE_HEIGHT: f64 = 240.0;
    /// Width of the start/end handle bands, before clamping to `EDGE_BAND_PX`.
    pub const EDGE_BAND: f64 = 8.0;
    /// Limits of the handle bands, in screen pixels.
    pub const EDGE_BAND_PX: (f64, f64) = (3.0, 30.0);
    pub const LYRIC_CHAR_WIDTH: f64 = 8.0;
    pub const LYRIC_HEIGHT: f64 = 14.0;
    /// Smallest width of the frame of a pit stacked under a later pit.
    pub const STACK_FRAME_WIDTH: f64 = 24.0;
    /// Side of the spectrogram toggle in the timeline band.
    pub const TOGGLE_SIZE: f64 = 24.0;
}

use metrics::*;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn squared_distance(self, other: Point) -> f64 {
        let (dx, dy) = (self.x - other.x, self.y - other.y);
        dx * dx + dy * dy
    }
}

/// An axis-aligned rectangle, `y` growing downwards.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// A rect spanning the given edges; reversed edges give an empty rect.
    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Rect {
            x: left,
            y: top,
            width: (right - left).max(0.0),
            height: (bottom - top).max(0.0),
        }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Strict containment: points on the border are outside.
    pub fn contains(&self, point: Point) -> bool {
        point.x > self.left()
            && point.x < self.right()
            && point.y > self.top()
            && point.y < self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() <= other.right()
            && other.left() <= self.right()
            && self.top() <= other.bottom()
            && other.top() <= self.bottom()
    }

    /// Squared distance from the point to the closest point of the rect, zero inside.
    pub fn squared_distance(&self, point: Point) -> f64 {
        let x = point.x.max(self.left()).min(self.right());
        let y = point.y.max(self.top()).min(self.bottom());
        point.squared_distance(Point::new(x, y))
    }
}

/// Converts between beats/pitches and layout coordinates for one view of a score.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Mapper {
    /// Horizontal scroll origin of the view.
    pub origin_x: f64,
    /// Top of the timeline band.
    pub timeline_y: f64,
}

impl Mapper {
    pub fn new(origin_x: f64, timeline_y: f64) -> Self {
        Mapper {
            origin_x,
            timeline_y,
        }
    }

    pub fn for_score(score: &Score, origin_x: f64) -> Self {
        Mapper::new(origin_x, score.timeline_y)
    }

    pub fn x(&self, beat: Beat) -> f64 {
        beat.to_f64() * BEAT_WIDTH + PADDING - self.origin_x
    }

    /// The beat at `x`, snapped to a multiple of `interval`.
    ///
    /// ```
    /// # use pitroll::coords::Mapper;
    /// # use pitroll::rational::Rational;
    /// let mapper = Mapper::new(0.0, 0.0);
    /// let quarter = Rational::new(1, 4);
    /// // 1/8 beat right of beat 0 is a tie and goes up.
    /// assert_eq!(mapper.beat(16.0 + 12.0, quarter), quarter);
    /// assert_eq!(mapper.beat(16.0 + 11.9, quarter), Rational::zero());
    /// ```
    pub fn beat(&self, x: f64, interval: Rational) -> Beat {
        Rational::quantize((x - PADDING + self.origin_x) / BEAT_WIDTH, interval)
    }

    /// Top of the pitch area, right below the timeline band.
    pub fn pitch_start_y(&self) -> f64 {
        self.timeline_y + TIMELINE_HEIGHT
    }

    pub fn y(&self, pitch: Rational) -> f64 {
        self.pitch_start_y() + (MAX_PITCH as f64 - pitch.to_f64()) * PITCH_HEIGHT
    }

    /// The pitch at `y`, snapped to a multiple of `interval`.
    pub fn pitch(&self, y: f64, interval: Rational) -> Rational {
        Rational::quantize(
            MAX_PITCH as f64 - (y - self.pitch_start_y()) / PITCH_HEIGHT,
            interval,
        )
    }

    /// Beats covered by a horizontal movement, snapped.
    pub fn beat_delta(&self, dx: f64, interval: Rational) -> Beat {
        Rational::quantize(dx / BEAT_WIDTH, interval)
    }

    /// Pitch covered by a vertical movement, snapped. Moving up raises the pitch.
    pub fn pitch_delta(&self, dy: f64, interval: Rational) -> Rational {
        Rational::quantize(-dy / PITCH_HEIGHT, interval)
    }

    /// Whether a point lies in the timeline band.
    pub fn is_in_timeline(&self, point: Point) -> bool {
        point.y >= self.timeline_y && point.y < self.pitch_start_y()
    }
}

/// Zero, negative and NaN scales all mean "no extent".
fn sanitized_scale(scale: f64) -> f64 {
    if scale > 0.0 {
        scale
    } else {
        0.0
    }
}

/// The distance within which a point is on a knob, a constant number of screen pixels.
pub fn capture_radius(scale: f64) -> f64 {
    (KNOB_EDIT_DISTANCE * sanitized_scale(scale)).max(MIN_CAPTURE_RADIUS)
}

/// Width of the start and end handle bands.
pub fn edge_band(scale: f64) -> f64 {
    let scale = sanitized_scale(scale);
    let (min_px, max_px) = EDGE_BAND_PX;
    EDGE_BAND
        .min(max_px * scale)
        .max(min_px * scale)
        .max(MIN_CAPTURE_RADIUS)
}

/// Coarsest of the power of two subdivisions `1/2^0 ..= 1/2^finest` whose extent
/// `unit * interval` covers at most `SNAP_WIDTH` screen pixels.
fn snapping_interval(unit: f64, scale: f64, finest: u32) -> Rational {
    let limit = SNAP_WIDTH * sanitized_scale(scale);
    (0..=finest)
        .map(|k| Rational::new(1, 1 << k))
        .find(|interval| unit * interval.to_f64() <= limit)
        .unwrap_or_else(|| Rational::new(1, 1 << finest))
}

/// Snapping step for beats at a zoom level, never finer than one video frame at `tempo`.
///
/// ```
/// # use pitroll::coords::beat_interval;
/// # use pitroll::rational::Rational;
/// let tempo = Rational::int(120);
/// assert_eq!(beat_interval(1.0, tempo), Rational::new(1, 4));
/// assert_eq!(beat_interval(8.0, tempo), Rational::one());
/// assert_eq!(beat_interval(0.0, tempo), Rational::new(1, 30));
/// ```
pub fn beat_interval(scale: f64, tempo: Rational) -> Rational {
    let frame = tempo / (60 * FRAME_RATE);
    snapping_interval(BEAT_WIDTH, scale, 6).max(frame)
}

/// Snapping step for pitches at a zoom level.
pub fn pitch_interval(scale: f64) -> Rational {
    snapping_interval(PITCH_HEIGHT, scale, 4)
}
