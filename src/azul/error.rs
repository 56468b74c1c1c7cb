//! The core's recoverable error taxonomy.
//!
//! These are real enums, not `anyhow::Error` strings, because callers are
//! expected to match on *which* precondition failed (e.g. to decide whether
//! retrying against a fresh `legal_actions()` call makes sense). The CLI
//! binary and other glue that only needs to propagate-and-log still reaches
//! for `anyhow` instead.

use thiserror::Error;

use crate::azul::consts::{Color, Source};

/// Why a proposed move was rejected by [`crate::azul::position::Position::apply`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalMoveReason {
    #[error("source {0:?} has no tiles of the requested color")]
    NoSuchColorInSource(Source),
    #[error("pattern line already tagged with a different color")]
    LineColorMismatch,
    #[error("wall cell for this row/color is already filled")]
    WallAlreadyHasColor,
    #[error("no such source {0:?}")]
    NoSuchSource(Source),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("illegal move: {reason}")]
pub struct IllegalMove {
    pub reason: IllegalMoveReason,
}

impl IllegalMove {
    pub fn new(reason: IllegalMoveReason) -> Self {
        IllegalMove { reason }
    }
}

/// Which invariant a constructed or deserialized position violated.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantId {
    #[error("tile conservation violated for {0:?}")]
    TileConservation(Color),
    #[error("pattern line color uniqueness violated")]
    PatternLineColorUniqueness,
    #[error("pattern line capacity exceeded")]
    PatternLineCapacity,
    #[error("wall cell does not match the fixed wall pattern")]
    WallPatternMismatch,
    #[error("floor line exceeds capacity")]
    FloorCapacity,
    #[error("score below zero")]
    NonNegativeScore,
    #[error("first-player marker is not in exactly one location")]
    MarkerUniqueness,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("malformed position: {which_invariant}")]
pub struct MalformedPosition {
    pub which_invariant: InvariantId,
}

impl MalformedPosition {
    pub fn new(which_invariant: InvariantId) -> Self {
        MalformedPosition { which_invariant }
    }
}

/// Returned by `endgame_solve` when the position has more than the
/// configured `max_tiles` remaining draftable tiles.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("position has more than the endgame threshold's draftable tiles")]
pub struct EndgameNotApplicable;
