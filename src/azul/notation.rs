//! Textual notation for moves, plus the binary wire format for positions.
//!
//! Moves parse to and print as `take(source=<factory:N|center>,
//! color=cN, dest=<line:N|floor>)`; positions round-trip through `bincode`
//! via [`encode_position`]/[`decode_position`] for cache files and
//! process-to-process transfer.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context, Error};
use regex::Regex;

use crate::azul::board::{FloorEntry, PatternLine, PlayerBoard};
use crate::azul::consts::*;
use crate::azul::movegen::Move;
use crate::azul::position::{CenterPool, Position};

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source() {
            Source::Center => "center".to_string(),
            Source::Factory(idx) => format!("factory:{idx}"),
        };
        let dest = match self.dest() {
            Dest::Floor => "floor".to_string(),
            Dest::Line(line) => format!("line:{line}"),
        };
        write!(f, "take(source={source}, color={}, dest={dest})", self.color())
    }
}

impl FromStr for Move {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pattern = Regex::new(
            r"^take\(source=(?P<source>center|factory:\d+),\s*color=c(?P<color>\d),\s*dest=(?P<dest>floor|line:\d)\)$",
        )
        .expect("static pattern always compiles");
        let captures = pattern.captures(s.trim()).ok_or_else(|| anyhow!("unrecognized move notation: {s}"))?;

        let source = match &captures["source"] {
            "center" => Source::Center,
            other => {
                let idx = other.trim_start_matches("factory:").parse::<u8>().context("parsing factory index")?;
                Source::Factory(idx)
            }
        };
        let color_digit: u8 = captures["color"].parse().context("parsing color digit")?;
        if color_digit as usize >= crate::azul::consts::NUM_COLORS {
            return Err(anyhow!("color out of range: c{color_digit}"));
        }
        let color = Color::from(color_digit);
        let dest = match &captures["dest"] {
            "floor" => Dest::Floor,
            other => {
                let line = other.trim_start_matches("line:").parse::<u8>().context("parsing pattern line index")?;
                Dest::Line(line)
            }
        };

        Ok(Move::new(source, color, dest))
    }
}

/// Serializes a position to its binary wire format.
pub fn encode_position(pos: &Position) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(pos)
}

/// Deserializes a position previously produced by [`encode_position`],
/// rejecting a structurally-decoded-but-invariant-violating value rather
/// than handing the caller a position the rest of the engine never
/// produces on its own.
pub fn decode_position(bytes: &[u8]) -> Result<Position, Error> {
    let pos: Position = bincode::deserialize(bytes).context("decoding binary position")?;
    pos.validate().map_err(Error::from)?;
    Ok(pos)
}

fn counts_to_csv(counts: &[u8; crate::azul::consts::NUM_COLORS]) -> String {
    counts.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(",")
}

fn counts_from_csv(s: &str) -> Result<[u8; NUM_COLORS], Error> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != NUM_COLORS {
        return Err(anyhow!("expected {NUM_COLORS} color counts, found {}", parts.len()));
    }
    let mut out = [0u8; NUM_COLORS];
    for (i, p) in parts.iter().enumerate() {
        out[i] = p.trim().parse::<u8>().with_context(|| format!("parsing color count {i}"))?;
    }
    Ok(out)
}

fn line_to_field(line: &PatternLine) -> String {
    match line.color {
        Some(c) => format!("{}:{}", c.index(), line.fill),
        None => format!("_:{}", line.fill),
    }
}

fn line_from_field(s: &str) -> Result<PatternLine, Error> {
    let (color_part, fill_part) = s.split_once(':').ok_or_else(|| anyhow!("malformed pattern-line field: {s}"))?;
    let fill: u8 = fill_part.trim().parse().with_context(|| format!("parsing pattern-line fill in {s}"))?;
    let color = if color_part.trim() == "_" {
        None
    } else {
        let idx: u8 = color_part.trim().parse().with_context(|| format!("parsing pattern-line color in {s}"))?;
        if idx as usize >= NUM_COLORS {
            return Err(anyhow!("color out of range in pattern-line field: {s}"));
        }
        Some(Color::from(idx))
    };
    Ok(PatternLine { color, fill })
}

fn floor_to_field(board: &PlayerBoard) -> String {
    board
        .floor
        .iter()
        .map(|entry| match entry {
            FloorEntry::Tile(c) => c.index().to_string(),
            FloorEntry::Marker => "M".to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn floor_from_field(s: &str) -> Result<Vec<FloorEntry>, Error> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|tok| {
            if tok == "M" {
                Ok(FloorEntry::Marker)
            } else {
                let idx: u8 = tok.parse().with_context(|| format!("parsing floor entry {tok}"))?;
                if idx as usize >= NUM_COLORS {
                    return Err(anyhow!("color out of range in floor entry: {tok}"));
                }
                Ok(FloorEntry::Tile(Color::from(idx)))
            }
        })
        .collect()
}

fn wall_to_field(wall: &[u8; WALL_SIZE]) -> String {
    wall.iter().map(|row| format!("{row:05b}")).collect::<Vec<_>>().join(",")
}

fn wall_from_field(s: &str) -> Result<[u8; WALL_SIZE], Error> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != WALL_SIZE {
        return Err(anyhow!("expected {WALL_SIZE} wall rows, found {}", parts.len()));
    }
    let mut out = [0u8; WALL_SIZE];
    for (i, p) in parts.iter().enumerate() {
        if p.len() != WALL_SIZE || !p.chars().all(|c| c == '0' || c == '1') {
            return Err(anyhow!("malformed wall row {i}: {p}"));
        }
        out[i] = u8::from_str_radix(p, 2).with_context(|| format!("parsing wall row {i}"))?;
    }
    Ok(out)
}

/// Serializes a position to the human-readable, line-oriented textual wire
/// format: one `key: value` pair per line, `board<seat>.*` keys repeated per
/// seat. Every field §3 lists as part of a position's identity round-trips,
/// including the RNG draw counter (so continuing play from a decoded
/// position reaches the same future draws as the original would have).
pub fn encode_position_text(pos: &Position) -> String {
    let mut lines = Vec::new();
    lines.push("version: 1".to_string());
    lines.push(format!("players: {}", pos.players));
    lines.push(format!("to_move: {}", pos.to_move.index()));
    lines.push(format!(
        "phase: {}",
        match pos.phase {
            Phase::Drafting => "drafting",
            Phase::WallTiling => "wall_tiling",
            Phase::GameOver => "game_over",
        }
    ));
    lines.push(format!("round: {}", pos.round_number));
    lines.push(format!("rng_seed: {}", pos.rng_seed()));
    lines.push(format!("rng_draws: {}", pos.rng_draws()));
    lines.push(format!("bag: {}", counts_to_csv(&pos.bag)));
    lines.push(format!("discard: {}", counts_to_csv(&pos.discard)));
    lines.push(format!(
        "factories: {}",
        pos.factories.iter().map(counts_to_csv).collect::<Vec<_>>().join(";")
    ));
    lines.push(format!("center: {}", counts_to_csv(&pos.center.tiles)));
    lines.push(format!("marker: {}", pos.center.marker_present));
    for (seat, board) in pos.boards.iter().enumerate() {
        lines.push(format!(
            "board{seat}.lines: {}",
            board.lines.iter().map(line_to_field).collect::<Vec<_>>().join(",")
        ));
        lines.push(format!("board{seat}.wall: {}", wall_to_field(&board.wall)));
        lines.push(format!("board{seat}.floor: {}", floor_to_field(board)));
        lines.push(format!("board{seat}.score: {}", board.score));
    }
    lines.join("\n")
}

/// Parses the format written by [`encode_position_text`], validating the
/// result against every invariant in §3 before returning it.
pub fn decode_position_text(text: &str) -> Result<Position, Error> {
    let mut fields = std::collections::HashMap::new();
    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once(':').ok_or_else(|| anyhow!("malformed line: {line}"))?;
        fields.insert(key.trim().to_string(), value.trim().to_string());
    }

    let get = |key: &str| -> Result<&String, Error> { fields.get(key).ok_or_else(|| anyhow!("missing field: {key}")) };

    let players: u8 = get("players")?.parse().context("parsing players")?;
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players) {
        return Err(anyhow!("players out of range: {players}"));
    }
    let to_move: u8 = get("to_move")?.parse().context("parsing to_move")?;
    let phase = match get("phase")?.as_str() {
        "drafting" => Phase::Drafting,
        "wall_tiling" => Phase::WallTiling,
        "game_over" => Phase::GameOver,
        other => return Err(anyhow!("unrecognized phase: {other}")),
    };
    let round_number: u32 = get("round")?.parse().context("parsing round")?;
    let rng_seed: u64 = get("rng_seed")?.parse().context("parsing rng_seed")?;
    let rng_draws: u64 = get("rng_draws")?.parse().context("parsing rng_draws")?;
    let bag = counts_from_csv(get("bag")?)?;
    let discard = counts_from_csv(get("discard")?)?;
    let factories: Vec<[u8; NUM_COLORS]> =
        get("factories")?.split(';').filter(|s| !s.is_empty()).map(counts_from_csv).collect::<Result<_, _>>()?;
    let center_tiles = counts_from_csv(get("center")?)?;
    let marker_present: bool = get("marker")?.parse().context("parsing marker")?;

    let mut boards = Vec::with_capacity(players as usize);
    for seat in 0..players as usize {
        let lines_field = get(&format!("board{seat}.lines"))?;
        let mut lines = [PatternLine::default(); WALL_SIZE];
        for (i, tok) in lines_field.split(',').enumerate() {
            if i >= WALL_SIZE {
                return Err(anyhow!("too many pattern lines for seat {seat}"));
            }
            lines[i] = line_from_field(tok)?;
        }
        let wall = wall_from_field(get(&format!("board{seat}.wall"))?)?;
        let floor_entries = floor_from_field(get(&format!("board{seat}.floor"))?)?;
        let mut floor = arrayvec::ArrayVec::new();
        for entry in floor_entries {
            floor.try_push(entry).map_err(|_| anyhow!("floor line exceeds capacity for seat {seat}"))?;
        }
        let score: i32 = get(&format!("board{seat}.score"))?.parse().context("parsing board score")?;
        boards.push(PlayerBoard { lines, wall, floor, score });
    }

    let pos = Position::from_parts(
        players,
        bag,
        discard,
        factories,
        CenterPool { tiles: center_tiles, marker_present },
        boards,
        PlayerId(to_move),
        phase,
        round_number,
        rng_seed,
        rng_draws,
    );
    pos.validate()?;
    Ok(pos)
}
