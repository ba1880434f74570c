//! # Shared Pong Types
//!
//! Board constants, the directional primitives used by the physics step and the
//! wire protocol spoken between the authoritative server and its clients. Both
//! the server and any Rust client depend on this crate so the two sides always
//! agree on sizes and message shapes.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub mod protocol;

pub use protocol::{
    BallSnapshot, ClientCommand, GameStateSnapshot, PaddleSnapshot, ProtocolError, ServerNotice,
};

pub const BOARD_WIDTH: i32 = 500;
pub const BOARD_HEIGHT: i32 = 500;
pub const PADDLE_HEIGHT: i32 = 60;
pub const PADDLE_WIDTH: i32 = 10;
/// Edge length of the square ball.
pub const BALL_SIZE: i32 = 20;
/// Vertical distance a paddle travels per move command.
pub const PADDLE_SPEED: i32 = 20;
/// Distance the ball travels along each axis per tick.
pub const BALL_SPEED: i32 = 10;
pub const TICK_PERIOD_MS: u64 = 100;

/// Cardinal direction in screen coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Signed unit factor along this direction's axis.
    pub fn factor(self) -> i32 {
        match self {
            Direction::Up | Direction::Left => -1,
            Direction::Down | Direction::Right => 1,
        }
    }

    /// Reverse of this direction on the same axis.
    ///
    /// Used when the ball bounces off a wall or a paddle.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    /// Coin flip between LEFT and RIGHT.
    pub fn random_horizontal() -> Direction {
        if rand::thread_rng().gen_bool(0.5) {
            Direction::Left
        } else {
            Direction::Right
        }
    }

    /// Coin flip between UP and DOWN, used for the vertical motion of a serve.
    pub fn random_vertical() -> Direction {
        if rand::thread_rng().gen_bool(0.5) {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

/// One of the two fixed slots in a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Slot assignment order.
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn random() -> Side {
        if rand::thread_rng().gen_bool(0.5) {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// Horizontal direction a ball travels when this side has to return it.
    pub fn facing(self) -> Direction {
        match self {
            Side::Left => Direction::Left,
            Side::Right => Direction::Right,
        }
    }
}
