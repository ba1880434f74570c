use shared::{Direction, BALL_SIZE, PADDLE_HEIGHT};

///Clamps a coordinate into the inclusive range `[lower, upper]`.
pub fn clamp_axis(value: i32, lower: i32, upper: i32) -> i32 {
    value.max(lower).min(upper)
}

///Advances a coordinate one step along its axis.
pub fn step(position: i32, direction: Direction, speed: i32) -> i32 {
    position + direction.factor() * speed
}

///Bounces a proposed coordinate off the range `[lower, upper]`.
/// Returns the clamped coordinate and the flipped direction when the candidate
/// touches or leaves the range, and `None` while it stays strictly inside.
/// Overshoot past the boundary is dropped rather than carried over.
pub fn reflect(
    candidate: i32,
    lower: i32,
    upper: i32,
    direction: Direction,
) -> Option<(i32, Direction)> {
    if candidate <= lower {
        Some((lower, direction.opposite()))
    } else if candidate >= upper {
        Some((upper, direction.opposite()))
    } else {
        None
    }
}

///Checks whether a ball at `ball_y` overlaps the vertical extent of a paddle at `paddle_y`.
pub fn overlaps_paddle(ball_y: i32, paddle_y: i32) -> bool {
    ball_y >= paddle_y - BALL_SIZE && ball_y <= paddle_y + PADDLE_HEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_axis() {
        assert_eq!(clamp_axis(-5, 0, 440), 0);
        assert_eq!(clamp_axis(100, 0, 440), 100);
        assert_eq!(clamp_axis(460, 0, 440), 440);
    }

    #[test]
    fn test_step_uses_direction_factor() {
        assert_eq!(step(100, Direction::Up, 20), 80);
        assert_eq!(step(100, Direction::Down, 20), 120);
        assert_eq!(step(100, Direction::Left, 10), 90);
        assert_eq!(step(100, Direction::Right, 10), 110);
    }

    #[test]
    fn test_reflect_inside_range() {
        assert_eq!(reflect(50, 0, 480, Direction::Up), None);
    }

    #[test]
    fn test_reflect_lower_bound_drops_overshoot() {
        assert_eq!(reflect(-7, 0, 480, Direction::Up), Some((0, Direction::Down)));
        assert_eq!(reflect(0, 0, 480, Direction::Up), Some((0, Direction::Down)));
    }

    #[test]
    fn test_reflect_upper_bound_drops_overshoot() {
        assert_eq!(reflect(495, 0, 480, Direction::Down), Some((480, Direction::Up)));
        assert_eq!(reflect(480, 0, 480, Direction::Down), Some((480, Direction::Up)));
    }

    #[test]
    fn test_overlaps_paddle_extent() {
        let paddle_y = 200;
        assert!(overlaps_paddle(paddle_y - BALL_SIZE, paddle_y));
        assert!(overlaps_paddle(paddle_y + 30, paddle_y));
        assert!(overlaps_paddle(paddle_y + PADDLE_HEIGHT, paddle_y));
        assert!(!overlaps_paddle(paddle_y - BALL_SIZE - 1, paddle_y));
        assert!(!overlaps_paddle(paddle_y + PADDLE_HEIGHT + 1, paddle_y));
    }
}
