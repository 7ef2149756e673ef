use crate::config::model::Direction;

/// Offset accumulator for one animation session.
///
/// `offset` is the horizontal translation of the first repeating unit in logical px. It is
/// reset to `0` whenever a new session starts (config replacement, surface re-attachment).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollState {
    pub offset: f64,
    /// Unit width the offset was last wrapped against; `None` before the first tick.
    pub unit_width: Option<f64>,
}

impl ScrollState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring a stale offset back into the wrap range of `unit_width`.
    ///
    /// Needed when the unit shrinks mid-session; otherwise the next frames would show a gap
    /// wider than one unit before the regular wrap catches up.
    pub fn resync(self, unit_width: f64, direction: Direction) -> Self {
        if self.unit_width == Some(unit_width) {
            return self;
        }
        Self {
            offset: reduce_into_range(self.offset, unit_width, direction),
            unit_width: Some(unit_width),
        }
    }

    /// Advance by one tick.
    pub fn advance(self, speed: f64, direction: Direction, unit_width: f64) -> Self {
        let synced = self.resync(unit_width, direction);
        Self {
            offset: advance_offset(synced.offset, speed, direction, unit_width),
            unit_width: Some(unit_width),
        }
    }
}

/// One tick of the seamless wrap rule.
///
/// The wrap adds or removes exactly one `unit_width` rather than resetting to zero, so
/// sub-pixel phase carries over and the picture never jumps. A step longer than one unit is
/// reduced into range with the same phase.
pub fn advance_offset(offset: f64, speed: f64, direction: Direction, unit_width: f64) -> f64 {
    let next = match direction {
        Direction::Left => {
            let next = offset - speed;
            if next <= -unit_width { next + unit_width } else { next }
        }
        Direction::Right => {
            let next = offset + speed;
            if next >= 0.0 { next - unit_width } else { next }
        }
    };
    if in_range(next, unit_width, direction) {
        next
    } else {
        reduce_into_range(next, unit_width, direction)
    }
}

fn in_range(offset: f64, unit_width: f64, direction: Direction) -> bool {
    match direction {
        Direction::Left => offset > -unit_width && offset <= 0.0,
        Direction::Right => offset >= -unit_width && offset < 0.0,
    }
}

/// Reduce `offset` into the range the wrap rule maintains for `direction`:
/// `(-unit_width, 0]` for left, `[-unit_width, 0)` for right.
pub fn reduce_into_range(offset: f64, unit_width: f64, direction: Direction) -> f64 {
    if !offset.is_finite() || unit_width <= 0.0 {
        return 0.0;
    }
    let phase = offset.rem_euclid(unit_width); // [0, unit_width)
    match direction {
        Direction::Left => {
            if phase == 0.0 {
                0.0
            } else {
                phase - unit_width
            }
        }
        Direction::Right => phase - unit_width,
    }
}

/// Copies of the block needed to cover `surface_width` at any offset phase.
pub fn repetitions(surface_width: f64, unit_width: f64) -> usize {
    (surface_width / unit_width).ceil().max(0.0) as usize + 2
}

/// Whether the block spanning `[block_x, block_x + unit_width)` overlaps `[0, surface_width)`.
pub fn is_block_visible(block_x: f64, unit_width: f64, surface_width: f64) -> bool {
    block_x + unit_width > 0.0 && block_x < surface_width
}

/// Left edges of every visible block for the given offset.
pub fn visible_block_xs(
    offset: f64,
    unit_width: f64,
    surface_width: f64,
) -> impl Iterator<Item = f64> {
    (0..repetitions(surface_width, unit_width))
        .map(move |i| offset + (i as f64) * unit_width)
        .filter(move |&x| is_block_visible(x, unit_width, surface_width))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(direction: Direction, speed: f64, unit: f64, ticks: usize) -> Vec<f64> {
        let mut s = ScrollState::new();
        let mut out = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            s = s.advance(speed, direction, unit);
            out.push(s.offset);
        }
        out
    }

    #[test]
    fn left_scroll_wraps_by_one_unit() {
        let offsets = run(Direction::Left, 2.0, 300.0, 151);
        assert_eq!(offsets[0], -2.0);
        assert_eq!(offsets[148], -298.0);
        // Tick 150 would reach -300 and wraps to 0.
        assert_eq!(offsets[149], 0.0);
        assert_eq!(offsets[150], -2.0);
    }

    #[test]
    fn wrap_preserves_sub_pixel_phase() {
        let next = advance_offset(-299.5, 2.0, Direction::Left, 300.0);
        assert!((next - (-1.5)).abs() < 1e-9);
        let next = advance_offset(-0.5, 2.0, Direction::Right, 300.0);
        assert!((next - (-298.5)).abs() < 1e-9);
    }

    #[test]
    fn right_scroll_stays_negative() {
        let offsets = run(Direction::Right, 7.0, 250.0, 1000);
        assert_eq!(offsets[0], -243.0);
        for o in offsets {
            assert!((-250.0..0.0).contains(&o), "offset {o} out of range");
        }
    }

    #[test]
    fn offsets_stay_in_range_and_move_by_speed() {
        for &unit in &[20.0, 37.5, 100.0, 300.0, 1234.0] {
            for &speed in &[0.0, 0.5, 2.0, 13.0, 36.0, 50.0, 150.0, 1300.0] {
                for dir in [Direction::Left, Direction::Right] {
                    let mut prev = 0.0;
                    let mut s = ScrollState::new();
                    for _ in 0..500 {
                        s = s.advance(speed, dir, unit);
                        match dir {
                            Direction::Left => assert!(s.offset > -unit && s.offset <= 0.0),
                            Direction::Right => assert!(s.offset >= -unit && s.offset < 0.0),
                        }
                        let moved = match dir {
                            Direction::Left => prev - s.offset,
                            Direction::Right => s.offset - prev,
                        };
                        // Movement is the step, up to whole units.
                        let phase = (moved - speed).rem_euclid(unit);
                        assert!(
                            phase < 1e-6 || unit - phase < 1e-6,
                            "unit={unit} speed={speed} {dir:?} moved={moved}"
                        );
                        prev = s.offset;
                    }
                }
            }
        }
    }

    #[test]
    fn step_longer_than_unit_keeps_offset_in_range() {
        let mut s = ScrollState::new();
        for _ in 0..10 {
            s = s.advance(150.0, Direction::Left, 100.0);
            assert!(s.offset > -100.0 && s.offset <= 0.0, "offset {}", s.offset);
        }
        // 10 * 150 = 1500 = 15 units.
        assert_eq!(s.offset, 0.0);
        assert!((advance_offset(-10.0, 150.0, Direction::Left, 100.0) - (-60.0)).abs() < 1e-9);
        assert!((advance_offset(-10.0, 150.0, Direction::Right, 100.0) - (-60.0)).abs() < 1e-9);
    }

    #[test]
    fn zero_speed_is_static() {
        assert!(run(Direction::Left, 0.0, 300.0, 10).iter().all(|&o| o == 0.0));
    }

    #[test]
    fn directions_mirror_each_other() {
        let left = run(Direction::Left, 3.0, 90.0, 200);
        let right = run(Direction::Right, 3.0, 90.0, 200);
        for (l, r) in left.iter().zip(&right) {
            // After k ticks: left ≡ -3k, right ≡ +3k (mod unit).
            let sum = (l + r).rem_euclid(90.0);
            assert!(sum < 1e-9 || 90.0 - sum < 1e-9, "l={l} r={r}");
        }
    }

    #[test]
    fn coverage_leaves_no_gap() {
        for &w in &[1.0, 99.0, 100.0, 101.0, 1280.0, 4096.0] {
            for &unit in &[0.5, 100.0, 333.3, 5000.0] {
                let r = repetitions(w, unit) as f64;
                assert!(r * unit >= w + unit);
            }
        }
    }

    #[test]
    fn culling_drops_fully_offscreen_blocks() {
        assert!(!is_block_visible(-100.0, 100.0, 500.0));
        assert!(is_block_visible(-99.0, 100.0, 500.0));
        assert!(is_block_visible(499.0, 100.0, 500.0));
        assert!(!is_block_visible(500.0, 100.0, 500.0));

        let xs: Vec<f64> = visible_block_xs(-50.0, 200.0, 500.0).collect();
        assert_eq!(xs, vec![-50.0, 150.0, 350.0]);
    }

    #[test]
    fn shrinking_unit_resyncs_stale_offset() {
        let s = ScrollState {
            offset: -950.0,
            unit_width: Some(1000.0),
        };
        let s = s.advance(2.0, Direction::Left, 300.0);
        assert!(s.offset > -300.0 && s.offset <= 0.0);
        // -950 reduces to -50, then moves by -2.
        assert!((s.offset - (-52.0)).abs() < 1e-9);
    }

    #[test]
    fn reduce_into_range_per_direction() {
        assert_eq!(reduce_into_range(-600.0, 300.0, Direction::Left), 0.0);
        assert_eq!(reduce_into_range(-600.0, 300.0, Direction::Right), -300.0);
        assert_eq!(reduce_into_range(10.0, 300.0, Direction::Left), -290.0);
        assert_eq!(reduce_into_range(f64::NAN, 300.0, Direction::Left), 0.0);
    }
}
