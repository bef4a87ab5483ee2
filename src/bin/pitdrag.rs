// pitroll -- the interactive editing core of a pitch/beat piano roll
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! `pitdrag` replays a single pointer gesture on a score given on the command line
//! and prints what the gesture did to it.

use std::error::Error;
use std::num::ParseFloatError;

use log::info;
use simple_logger;
use snafu::{ResultExt, Snafu};
use structopt::StructOpt;

use pitroll::collab::{Capture, NotePlayer, PitResult, RectSelection, ScoreChange, UndoLog};
use pitroll::coords::{Point, Rect};
use pitroll::drag::{DragEditor, Modifiers};
use pitroll::note::{Note, Pit, PitchName};
use pitroll::rational::{ParseRationalError, Rational};
use pitroll::score::Score;
use pitroll::tone::{Tone, ToneId};

#[derive(Debug, Snafu)]
enum ArgError {
    #[snafu(display("Expected PITCH:START:END[:BEAT=PITCH...], got {:?}", input))]
    MalformedNote { input: String },
    #[snafu(display("Invalid number {:?}: {}", input, source))]
    InvalidRational {
        input: String,
        source: ParseRationalError,
    },
    #[snafu(display("Invalid coordinate {:?}: {}", input, source))]
    InvalidCoordinate {
        input: String,
        source: ParseFloatError,
    },
    #[snafu(display("Expected {} comma separated coordinates, got {:?}", count, input))]
    WrongCoordinateCount { input: String, count: usize },
}

/// A note as given on the command line, pits relative to its start and pitch.
#[derive(Debug)]
struct NoteArg {
    pitch: Rational,
    start: Rational,
    end: Rational,
    pits: Vec<(Rational, Rational)>,
}

impl NoteArg {
    /// The note, with a pit added at its start unless one was given there.
    fn to_note(&self, tone: ToneId) -> Note {
        let mut pits: Vec<Pit> = self
            .pits
            .iter()
            .map(|&(beat, pitch)| Pit::new(beat, pitch, tone))
            .collect();
        if !pits.iter().any(|pit| pit.beat.is_zero()) {
            pits.push(Pit::new(Rational::zero(), Rational::zero(), tone));
        }
        pits.sort_by_key(|pit| pit.beat);
        Note::new(self.pitch, self.start..self.end, pits)
    }
}

fn parse_rational(input: &str) -> Result<Rational, ArgError> {
    input.parse().context(InvalidRational { input })
}

fn parse_note(input: &str) -> Result<NoteArg, ArgError> {
    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() < 3 {
        return Err(ArgError::MalformedNote {
            input: input.to_string(),
        });
    }
    let mut pits = Vec::new();
    for pit in &parts[3..] {
        let mut halves = pit.splitn(2, '=');
        match (halves.next(), halves.next()) {
            (Some(beat), Some(pitch)) => pits.push((parse_rational(beat)?, parse_rational(pitch)?)),
            _ => {
                return Err(ArgError::MalformedNote {
                    input: input.to_string(),
                })
            }
        }
    }
    Ok(NoteArg {
        pitch: parse_rational(parts[0])?,
        start: parse_rational(parts[1])?,
        end: parse_rational(parts[2])?,
        pits,
    })
}

fn parse_coordinates(input: &str, count: usize) -> Result<Vec<f64>, ArgError> {
    let values = input
        .split(',')
        .map(|part| part.trim().parse::<f64>().context(InvalidCoordinate { input: part }))
        .collect::<Result<Vec<f64>, _>>()?;
    if values.len() == count {
        Ok(values)
    } else {
        Err(ArgError::WrongCoordinateCount {
            input: input.to_string(),
            count,
        })
    }
}

fn parse_point(input: &str) -> Result<Point, ArgError> {
    let values = parse_coordinates(input, 2)?;
    Ok(Point::new(values[0], values[1]))
}

fn parse_rect(input: &str) -> Result<Rect, ArgError> {
    let values = parse_coordinates(input, 4)?;
    Ok(Rect::new(values[0], values[1], values[2], values[3]))
}

#[derive(Debug, StructOpt)]
#[structopt(name = "pitdrag", about = "Replaying a drag gesture on a piano roll")]
struct Opt {
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,

    /// A note as PITCH:START:END, optionally followed by pits as :BEAT=PITCH relative to it.
    #[structopt(long = "note", number_of_values = 1, parse(try_from_str = parse_note))]
    notes: Vec<NoteArg>,

    /// Where the gesture begins, as x,y in layout coordinates.
    #[structopt(long, parse(try_from_str = parse_point))]
    from: Point,

    /// Where the gesture ends, as x,y in layout coordinates.
    #[structopt(long, parse(try_from_str = parse_point))]
    to: Point,

    /// Number of intermediate pointer moves.
    #[structopt(long, default_value = "4")]
    steps: usize,

    /// Zoom factor of the surface.
    #[structopt(long, default_value = "1")]
    scale: f64,

    /// Tempo in beats per minute.
    #[structopt(long, default_value = "120", parse(try_from_str = parse_rational))]
    tempo: Rational,

    /// A selection rectangle as x,y,width,height. Can be given multiple times.
    #[structopt(long = "select", number_of_values = 1, parse(try_from_str = parse_rect))]
    selection: Vec<Rect>,

    /// Lock dragged pits to their neighbor's beat or pitch.
    #[structopt(long)]
    straight: bool,
}

/// Logs what a real player would play.
struct LogPlayer;

impl NotePlayer for LogPlayer {
    fn play(&mut self, pits: Vec<PitResult>) {
        for pit in pits {
            info!(
                "play {} at {}s (beat {}, volume {:.2})",
                PitchName(pit.pitch),
                pit.seconds,
                pit.beat,
                pit.stereo.volm
            );
        }
    }

    fn stop(&mut self) {
        info!("stop");
    }
}

fn build_score(opt: &Opt) -> Score {
    let mut score = Score::new(opt.tempo);
    let tone = score.tones.insert(Tone::default());
    for arg in &opt.notes {
        score.push(arg.to_note(tone));
    }
    score
}

fn print_score(score: &Score) {
    for (index, note) in score.iter().enumerate() {
        println!(
            "note {}: {} {}..{}",
            index,
            PitchName(note.pitch),
            note.start(),
            note.end()
        );
        for (pit_index, pit) in note.pits.iter().enumerate() {
            println!(
                "  pit {}: {} @ {} volume {:.2} tone {}{}",
                pit_index,
                PitchName(note.pitch + pit.pitch),
                note.start() + pit.beat,
                pit.stereo.volm,
                pit.tone.index(),
                if pit.lyric.is_empty() {
                    String::new()
                } else {
                    format!(" {:?}", pit.lyric)
                }
            );
        }
    }
    println!(
        "key beats {:?}, scales {:?}, loop {}, timeline {}..{}",
        score.key_beats.iter().map(|b| b.to_string()).collect::<Vec<_>>(),
        score.scales.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        score.loop_dur_beat,
        score.beat_range.start,
        score.beat_range.end
    );
}

fn print_capture(capture: &Capture) {
    for change in &capture.notes {
        println!(
            "  note {}: {} {}..{} -> {} {}..{}",
            change.index,
            PitchName(change.old.pitch),
            change.old.start(),
            change.old.end(),
            PitchName(change.new.pitch),
            change.new.start(),
            change.new.end()
        );
    }
    for change in &capture.score {
        match change {
            ScoreChange::ToneAdded { id, .. } => println!("  new tone {}", id.index()),
            other => println!("  {:?}", other),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => log::Level::Info,
        1 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    simple_logger::init_with_level(level)?;

    if opt.tempo <= Rational::zero() {
        return Err(format!("tempo must be positive, got {}", opt.tempo).into());
    }
    let mut score = build_score(&opt);
    let mut editor = DragEditor::new(
        UndoLog::new(),
        RectSelection::new(opt.selection.clone()),
        LogPlayer,
    );

    let modifiers = Modifiers {
        straight: opt.straight,
    };
    match editor.begin(&mut score, opt.from, opt.scale, modifiers) {
        None => {
            println!("nothing to drag at {},{}", opt.from.x, opt.from.y);
            return Ok(());
        }
        Some(mode) => println!("dragging {:?}", mode),
    }

    for step in 1..=opt.steps {
        let t = step as f64 / (opt.steps + 1) as f64;
        let point = Point::new(
            opt.from.x + (opt.to.x - opt.from.x) * t,
            opt.from.y + (opt.to.y - opt.from.y) * t,
        );
        editor.changed(&mut score, point);
        if let Some(hint) = editor.cursor_hint(&score) {
            info!("{}", hint);
        }
    }
    editor.changed(&mut score, opt.to);
    if let Some(hint) = editor.cursor_hint(&score) {
        info!("{}", hint);
    }

    match editor.ended(&mut score, opt.to) {
        Some(capture) => {
            println!("captured:");
            print_capture(&capture);
        }
        None => println!("nothing changed"),
    }
    print_score(&score);
    Ok(())
}
