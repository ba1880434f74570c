use crate::physics::{clamp_axis, overlaps_paddle, reflect, step};
use log::debug;
use shared::{
    BallSnapshot, Direction, GameStateSnapshot, PaddleSnapshot, Side, BALL_SIZE, BALL_SPEED,
    BOARD_HEIGHT, BOARD_WIDTH, PADDLE_HEIGHT, PADDLE_SPEED, PADDLE_WIDTH,
};
use std::collections::HashMap;

/// Horizontal coordinate at which the ball meets a side's paddle.
pub fn hit_line(side: Side) -> i32 {
    match side {
        Side::Left => PADDLE_WIDTH,
        Side::Right => BOARD_WIDTH - PADDLE_WIDTH - BALL_SIZE,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ball {
    pub x: i32,
    pub y: i32,
    pub motion_x: Direction,
    pub motion_y: Direction,
    pub speed: i32,
}

impl Ball {
    /// Places a fresh ball at the board center, heading for the side that has to return it.
    pub fn serve(turn: Side) -> Self {
        Self {
            x: BOARD_WIDTH / 2 - BALL_SIZE / 2,
            y: BOARD_HEIGHT / 2 - BALL_SIZE / 2,
            motion_x: turn.facing(),
            motion_y: Direction::random_vertical(),
            speed: BALL_SPEED,
        }
    }

    pub fn snapshot(&self) -> BallSnapshot {
        BallSnapshot {
            x: self.x,
            y: self.y,
            motion_direction_x: self.motion_x,
            motion_direction_y: self.motion_y,
            speed: self.speed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paddle {
    pub y: i32,
    pub side: Side,
}

impl Paddle {
    pub fn new(side: Side) -> Self {
        Self {
            y: BOARD_HEIGHT / 2 - PADDLE_HEIGHT / 2,
            side,
        }
    }

    /// Moves the paddle one step and clamps it to the board.
    /// Horizontal directions are ignored; returns whether the command applied.
    pub fn move_by(&mut self, direction: Direction) -> bool {
        if !direction.is_vertical() {
            return false;
        }
        self.y = clamp_axis(
            step(self.y, direction, PADDLE_SPEED),
            0,
            BOARD_HEIGHT - PADDLE_HEIGHT,
        );
        true
    }

    pub fn snapshot(&self) -> PaddleSnapshot {
        PaddleSnapshot {
            y: self.y,
            side: self.side,
        }
    }
}

/// What a single physics step did to the ball.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rally {
    Moved,
    WallBounce,
    Returned(Side),
    Missed(Side),
}

/// Authoritative match state.
#[derive(Debug, Clone)]
pub struct GameState {
    pub ball: Ball,
    pub players: HashMap<Side, Paddle>,
    pub ready: bool,
    /// Side the ball is heading for, which has to return it next.
    pub turn: Side,
}

impl GameState {
    pub fn new() -> Self {
        Self::with_turn(Side::random())
    }

    pub fn with_turn(turn: Side) -> Self {
        Self {
            ball: Ball::serve(turn),
            players: HashMap::new(),
            ready: false,
            turn,
        }
    }

    /// First free slot, LEFT before RIGHT.
    pub fn open_slot(&self) -> Option<Side> {
        Side::ALL
            .into_iter()
            .find(|side| !self.players.contains_key(side))
    }

    /// Seats a paddle at vertical center. Returns false if the slot is taken.
    pub fn add_player(&mut self, side: Side) -> bool {
        if self.players.contains_key(&side) {
            return false;
        }
        self.players.insert(side, Paddle::new(side));
        self.refresh_ready();
        true
    }

    /// Frees a slot. Returns false if nobody occupied it.
    pub fn remove_player(&mut self, side: Side) -> bool {
        let removed = self.players.remove(&side).is_some();
        self.refresh_ready();
        removed
    }

    pub fn move_player(&mut self, side: Side, direction: Direction) -> bool {
        self.players
            .get_mut(&side)
            .is_some_and(|paddle| paddle.move_by(direction))
    }

    fn refresh_ready(&mut self) {
        self.ready = Side::ALL
            .iter()
            .all(|side| self.players.contains_key(side));
    }

    /// Advances the ball by one tick.
    ///
    /// Exactly one outcome applies per tick, checked in order: the paddle line of
    /// the side whose turn it is, the top wall, the bottom wall, and finally free
    /// movement along both axes.
    pub fn move_ball(&mut self) -> Rally {
        let next_x = step(self.ball.x, self.ball.motion_x, self.ball.speed);
        let next_y = step(self.ball.y, self.ball.motion_y, self.ball.speed);

        let reached_paddle = match self.turn {
            Side::Left => next_x <= hit_line(Side::Left),
            Side::Right => next_x >= hit_line(Side::Right),
        };
        if reached_paddle {
            return self.resolve_rally(next_y);
        }

        if let Some((y, motion_y)) = reflect(next_y, 0, BOARD_HEIGHT - BALL_SIZE, self.ball.motion_y)
        {
            self.ball.y = y;
            self.ball.motion_y = motion_y;
            return Rally::WallBounce;
        }

        self.ball.x = next_x;
        self.ball.y = next_y;
        Rally::Moved
    }

    fn resolve_rally(&mut self, next_y: i32) -> Rally {
        let side = self.turn;
        let returned = self
            .players
            .get(&side)
            .is_some_and(|paddle| overlaps_paddle(next_y, paddle.y));

        if returned {
            self.turn = side.opposite();
            self.ball.x = hit_line(side);
            self.ball.motion_x = self.ball.motion_x.opposite();
            debug!("{:?} returned the ball", side);
            Rally::Returned(side)
        } else {
            // The side that missed receives the next serve.
            self.ball = Ball::serve(side);
            debug!("{:?} missed, serving again", side);
            Rally::Missed(side)
        }
    }

    pub fn snapshot(&self) -> GameStateSnapshot {
        GameStateSnapshot {
            ready: self.ready,
            turn: self.turn,
            ball: self.ball.snapshot(),
            players: self
                .players
                .iter()
                .map(|(side, paddle)| (*side, paddle.snapshot()))
                .collect(),
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn full_game(turn: Side) -> GameState {
        let mut game = GameState::with_turn(turn);
        assert!(game.add_player(Side::Left));
        assert!(game.add_player(Side::Right));
        game
    }

    fn assert_ball_on_board(game: &GameState) {
        assert!((0..=BOARD_WIDTH - BALL_SIZE).contains(&game.ball.x), "x = {}", game.ball.x);
        assert!((0..=BOARD_HEIGHT - BALL_SIZE).contains(&game.ball.y), "y = {}", game.ball.y);
    }

    #[test]
    fn test_fresh_state() {
        let game = GameState::new();
        assert!(!game.ready);
        assert!(game.players.is_empty());
        assert_eq!(game.ball.x, 240);
        assert_eq!(game.ball.y, 240);
        assert_eq!(game.ball.speed, BALL_SPEED);
        assert_eq!(game.ball.motion_x, game.turn.facing());
        assert!(game.ball.motion_y.is_vertical());
    }

    #[test]
    fn test_slots_fill_left_then_right() {
        let mut game = GameState::with_turn(Side::Left);
        assert_eq!(game.open_slot(), Some(Side::Left));
        game.add_player(Side::Left);
        assert!(!game.ready);
        assert_eq!(game.players[&Side::Left].y, 220);
        assert_eq!(game.open_slot(), Some(Side::Right));
        game.add_player(Side::Right);
        assert!(game.ready);
        assert_eq!(game.open_slot(), None);
        assert!(!game.add_player(Side::Left));
    }

    #[test]
    fn test_ready_tracks_both_sides() {
        let mut game = full_game(Side::Right);
        assert!(game.remove_player(Side::Left));
        assert!(!game.ready);
        assert_eq!(game.open_slot(), Some(Side::Left));
        assert!(!game.remove_player(Side::Left));
        assert!(!game.ready);
        game.add_player(Side::Left);
        assert!(game.ready);
    }

    #[test]
    fn test_paddle_move_and_clamp() {
        let mut paddle = Paddle::new(Side::Left);
        assert!(paddle.move_by(Direction::Up));
        assert_eq!(paddle.y, 200);
        for _ in 0..20 {
            paddle.move_by(Direction::Up);
        }
        assert_eq!(paddle.y, 0);
        for _ in 0..40 {
            paddle.move_by(Direction::Down);
        }
        assert_eq!(paddle.y, BOARD_HEIGHT - PADDLE_HEIGHT);
    }

    #[test]
    fn test_paddle_ignores_horizontal_commands() {
        let mut paddle = Paddle::new(Side::Right);
        assert!(!paddle.move_by(Direction::Left));
        assert!(!paddle.move_by(Direction::Right));
        assert_eq!(paddle.y, 220);
    }

    #[test]
    fn test_paddle_stays_on_board_for_random_moves() {
        let mut rng = rand::thread_rng();
        let mut paddle = Paddle::new(Side::Left);
        for _ in 0..1000 {
            let direction = if rng.gen_bool(0.5) {
                Direction::Up
            } else {
                Direction::Down
            };
            paddle.move_by(direction);
            assert!((0..=BOARD_HEIGHT - PADDLE_HEIGHT).contains(&paddle.y));
        }
    }

    #[test]
    fn test_move_player_without_paddle() {
        let mut game = GameState::with_turn(Side::Left);
        assert!(!game.move_player(Side::Right, Direction::Up));
    }

    #[test]
    fn test_free_movement() {
        let mut game = full_game(Side::Right);
        game.ball.motion_x = Direction::Right;
        game.ball.motion_y = Direction::Down;
        assert_eq!(game.move_ball(), Rally::Moved);
        assert_eq!((game.ball.x, game.ball.y), (250, 250));
    }

    #[test]
    fn test_top_wall_bounce() {
        let mut game = full_game(Side::Left);
        game.ball.y = 5;
        game.ball.motion_y = Direction::Up;
        assert_eq!(game.move_ball(), Rally::WallBounce);
        assert_eq!(game.ball.y, 0);
        assert_eq!(game.ball.x, 240);
        assert_eq!(game.ball.motion_y, Direction::Down);
    }

    #[test]
    fn test_bottom_wall_bounce() {
        let mut game = full_game(Side::Left);
        game.ball.y = 475;
        game.ball.motion_y = Direction::Down;
        assert_eq!(game.move_ball(), Rally::WallBounce);
        assert_eq!(game.ball.y, BOARD_HEIGHT - BALL_SIZE);
        assert_eq!(game.ball.motion_y, Direction::Up);
    }

    #[test]
    fn test_left_paddle_returns_ball() {
        let mut game = full_game(Side::Left);
        game.ball.x = 15;
        game.ball.y = 230;
        game.ball.motion_y = Direction::Down;
        assert_eq!(game.move_ball(), Rally::Returned(Side::Left));
        assert_eq!(game.ball.x, hit_line(Side::Left));
        assert_eq!(game.ball.y, 230);
        assert_eq!(game.ball.motion_x, Direction::Right);
        assert_eq!(game.turn, Side::Right);
    }

    #[test]
    fn test_right_paddle_returns_ball() {
        let mut game = full_game(Side::Right);
        game.ball.x = 465;
        game.ball.y = 230;
        game.ball.motion_y = Direction::Up;
        assert_eq!(game.move_ball(), Rally::Returned(Side::Right));
        assert_eq!(game.ball.x, hit_line(Side::Right));
        assert_eq!(game.ball.motion_x, Direction::Left);
        assert_eq!(game.turn, Side::Left);
    }

    #[test]
    fn test_miss_serves_to_missing_side() {
        let mut game = full_game(Side::Left);
        for _ in 0..20 {
            game.move_player(Side::Left, Direction::Up);
        }
        game.ball.x = 15;
        game.ball.y = 400;
        game.ball.motion_y = Direction::Down;
        assert_eq!(game.move_ball(), Rally::Missed(Side::Left));
        assert_eq!(game.turn, Side::Left);
        assert_eq!((game.ball.x, game.ball.y), (240, 240));
        assert_eq!(game.ball.motion_x, Direction::Left);
    }

    #[test]
    fn test_paddle_check_wins_over_wall() {
        let mut game = full_game(Side::Left);
        for _ in 0..20 {
            game.move_player(Side::Left, Direction::Up);
        }
        game.ball.x = 15;
        game.ball.y = 5;
        game.ball.motion_y = Direction::Up;
        assert_eq!(game.move_ball(), Rally::Returned(Side::Left));
        assert_eq!(game.ball.y, 5);
    }

    #[test]
    fn test_ball_stays_on_board() {
        let mut rng = rand::thread_rng();
        let mut game = full_game(Side::random());
        for _ in 0..5000 {
            let side = if rng.gen_bool(0.5) { Side::Left } else { Side::Right };
            let direction = if rng.gen_bool(0.5) {
                Direction::Up
            } else {
                Direction::Down
            };
            game.move_player(side, direction);
            game.move_ball();
            assert_ball_on_board(&game);
            assert_eq!(game.ball.motion_x, game.turn.facing());
        }
    }

    #[test]
    fn test_snapshot_mirrors_state() {
        let mut game = GameState::with_turn(Side::Right);
        game.add_player(Side::Left);
        let snapshot = game.snapshot();
        assert!(!snapshot.ready);
        assert_eq!(snapshot.turn, Side::Right);
        assert_eq!(snapshot.ball.x, 240);
        assert_eq!(snapshot.ball.motion_direction_x, Direction::Right);
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[&Side::Left].y, 220);
    }
}
