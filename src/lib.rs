// pitroll -- the interactive editing core of a pitch/beat piano roll
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Editing core of a piano roll: mapping beats and pitches to the screen, finding what
//! lies under the pointer, and turning drags into undoable edits of a [`score::Score`].

pub mod collab;
pub mod drag;
pub mod hit;
pub mod note;
pub mod score;
pub mod tone;

// Layout modules
pub mod coords;
pub mod geometry;

// Utility modules
pub mod rational;
