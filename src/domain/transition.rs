/// Dual-path interpolation: a point travels a polyline at the speed given
/// by a separate, independently looping speed-over-time profile.
///
/// ## Position path
///
/// Segments run `p0→p1, p1→p2, … p(n-2)→p(n-1)`. Arriving at the last
/// point snaps back to `p0` and starts over, so a path that should look
/// closed repeats its first point at the end.
///
/// ## Speed profile
///
/// Speed is lerped from `s[i].value` to `s[i+1].value` over `s[i].duration`
/// seconds, wrapping from the last point to the first.
///
/// ## Segment crossing
///
/// Distance moved per tick is `speed * dt`. When a tick reaches the target
/// point, the leftover distance is carried onto the next segment (clamped
/// to that segment's length, so at most one boundary is crossed per tick).

use std::sync::Arc;

use glam::Vec2;

use crate::error::DefinitionError;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SpeedPoint {
    pub value: f32,
    /// Seconds to lerp from this point to the next one.
    pub duration: f32,
}

/// Immutable path + speed profile, shared by every prop state that uses it.
#[derive(Clone, PartialEq, Debug)]
pub struct TransitionDef {
    positions: Vec<Vec2>,
    speeds: Vec<SpeedPoint>,
}

impl TransitionDef {
    pub fn new(positions: Vec<Vec2>, speeds: Vec<SpeedPoint>) -> Result<Self, DefinitionError> {
        if positions.is_empty() {
            return Err(DefinitionError::NoPositionPoints);
        }
        if speeds.is_empty() {
            return Err(DefinitionError::NoSpeedPoints);
        }
        for s in &speeds {
            if s.value < 0.0 {
                return Err(DefinitionError::NegativeSpeed(s.value));
            }
            // Durations only matter once there is something to lerp between.
            if speeds.len() > 1 && s.duration <= 0.0 {
                return Err(DefinitionError::NonPositive { what: "speed point duration", value: s.duration });
            }
        }
        Ok(TransitionDef { positions, speeds })
    }

    /// A transition that never moves.
    pub fn fixed(at: Vec2) -> Self {
        TransitionDef { positions: vec![at], speeds: vec![SpeedPoint { value: 0.0, duration: 1.0 }] }
    }

    pub fn positions(&self) -> &[Vec2] { &self.positions }
    pub fn speeds(&self) -> &[SpeedPoint] { &self.speeds }

    /// Length of the traversed polyline (the snap back to `p0` excluded).
    pub fn path_length(&self) -> f32 {
        self.positions.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

#[derive(Clone, Debug)]
pub struct PathTransition {
    def: Arc<TransitionDef>,
    position: Vec2,
    direction: Vec2,
    speed: f32,
    clock: f32,
    from_pos: usize,
    to_pos: usize,
    from_speed: usize,
    to_speed: usize,
    moving: bool,
    accelerating: bool,
}

impl PathTransition {
    pub fn new(def: Arc<TransitionDef>) -> Self {
        let mut t = PathTransition {
            def: Arc::clone(&def),
            position: Vec2::ZERO,
            direction: Vec2::ZERO,
            speed: 0.0,
            clock: 0.0,
            from_pos: 0,
            to_pos: 0,
            from_speed: 0,
            to_speed: 0,
            moving: false,
            accelerating: false,
        };
        t.reset(def);
        t
    }

    /// Re-seed from a (possibly different) definition.
    pub fn reset(&mut self, def: Arc<TransitionDef>) {
        let n = def.positions.len();
        let m = def.speeds.len();

        self.moving = n > 1;
        self.accelerating = m > 1;

        self.from_pos = 0;
        self.to_pos = 1 % n;
        self.position = def.positions[0];
        self.direction = (def.positions[self.to_pos] - self.position).normalize_or_zero();

        self.from_speed = 0;
        self.to_speed = 1 % m;
        self.speed = def.speeds[0].value;
        self.clock = 0.0;

        self.def = def;
    }

    /// Back to the start of the current definition.
    pub fn restart(&mut self) {
        self.reset(Arc::clone(&self.def));
    }

    /// Integrate one tick; returns the offset from the owner's anchor.
    pub fn advance(&mut self, dt: f32) -> Vec2 {
        if self.accelerating {
            self.advance_speed(dt);
        }
        if !self.moving {
            return self.position;
        }

        let step = self.speed * dt;
        let target = self.def.positions[self.to_pos];
        let remaining = target - self.position;

        if remaining.length_squared() > step * step {
            self.position += self.direction * step;
            return self.position;
        }

        // Segment completes within this tick.
        let leftover = step - remaining.length();
        let n = self.def.positions.len();
        if self.to_pos + 1 >= n {
            self.from_pos = 0;
            self.to_pos = 1;
        } else {
            self.from_pos = self.to_pos;
            self.to_pos += 1;
        }
        let from = self.def.positions[self.from_pos];
        let to = self.def.positions[self.to_pos];
        self.direction = (to - from).normalize_or_zero();
        self.position = from + self.direction * leftover.min(from.distance(to));
        self.position
    }

    fn advance_speed(&mut self, dt: f32) {
        self.clock += dt;
        let from = self.def.speeds[self.from_speed];
        let to = self.def.speeds[self.to_speed];
        let phase = (self.clock / from.duration).clamp(0.0, 1.0);
        self.speed = from.value + (to.value - from.value) * phase;
        if phase >= 1.0 {
            self.from_speed = self.to_speed;
            self.to_speed = (self.to_speed + 1) % self.def.speeds.len();
            self.clock = 0.0;
        }
    }

    pub fn position(&self) -> Vec2 { self.position }
    pub fn speed(&self) -> f32 { self.speed }
    pub fn direction(&self) -> Vec2 { self.direction }

    /// `(from, to)` indices of the active position segment.
    pub fn segment(&self) -> (usize, usize) { (self.from_pos, self.to_pos) }

    pub fn def(&self) -> &Arc<TransitionDef> { &self.def }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp(value: f32, duration: f32) -> SpeedPoint {
        SpeedPoint { value, duration }
    }

    fn make(points: &[(f32, f32)], speeds: &[SpeedPoint]) -> PathTransition {
        let positions = points.iter().map(|&(x, y)| Vec2::new(x, y)).collect();
        PathTransition::new(Arc::new(TransitionDef::new(positions, speeds.to_vec()).unwrap()))
    }

    fn square() -> Vec<(f32, f32)> {
        vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]
    }

    #[test]
    fn empty_sequences_rejected() {
        assert_eq!(TransitionDef::new(vec![], vec![sp(1.0, 1.0)]), Err(DefinitionError::NoPositionPoints));
        assert_eq!(TransitionDef::new(vec![Vec2::ZERO], vec![]), Err(DefinitionError::NoSpeedPoints));
        assert!(TransitionDef::new(vec![Vec2::ZERO], vec![sp(1.0, 0.0), sp(2.0, 1.0)]).is_err());
        assert!(TransitionDef::new(vec![Vec2::ZERO], vec![sp(-1.0, 1.0)]).is_err());
        // A lone speed point never lerps, so its duration is irrelevant.
        assert!(TransitionDef::new(vec![Vec2::ZERO], vec![sp(3.0, 0.0)]).is_ok());
    }

    #[test]
    fn path_length_skips_the_closing_snap() {
        let open = TransitionDef::new(vec![Vec2::ZERO, Vec2::new(3.0, 4.0), Vec2::new(3.0, 10.0)], vec![sp(1.0, 1.0)]).unwrap();
        assert!((open.path_length() - 11.0).abs() < 1e-5);
        assert_eq!(TransitionDef::fixed(Vec2::ONE).path_length(), 0.0);
    }

    #[test]
    fn single_point_never_moves() {
        let mut t = make(&[(3.0, -2.0)], &[sp(50.0, 0.3), sp(5.0, 0.7)]);
        for dt in [0.0, 0.001, 0.016, 0.5, 3.0, 100.0] {
            for _ in 0..10 {
                assert_eq!(t.advance(dt), Vec2::new(3.0, -2.0));
            }
        }
    }

    #[test]
    fn speed_lerps_and_wraps() {
        let mut t = make(&[(0.0, 0.0)], &[sp(0.0, 1.0), sp(10.0, 1.0)]);
        t.advance(0.5);
        assert!((t.speed() - 5.0).abs() < 1e-5);
        t.advance(0.5);
        assert!((t.speed() - 10.0).abs() < 1e-5);
        // Now lerping back down from 10 to 0.
        t.advance(0.25);
        assert!((t.speed() - 7.5).abs() < 1e-5);
    }

    #[test]
    fn overshoot_carries_onto_next_segment() {
        let mut t = make(&[(0.0, 0.0), (4.0, 0.0), (10.0, 0.0)], &[sp(3.0, 1.0)]);
        assert_eq!(t.advance(1.0), Vec2::new(3.0, 0.0));
        let p = t.advance(1.0);
        assert!((p - Vec2::new(6.0, 0.0)).length() < 1e-5);
        assert_eq!(t.segment(), (1, 2));
        let p = t.advance(1.0);
        assert!((p - Vec2::new(9.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn last_point_snaps_back_to_first() {
        let mut t = make(&[(0.0, 0.0), (4.0, 0.0), (10.0, 0.0)], &[sp(3.0, 1.0)]);
        for _ in 0..3 {
            t.advance(1.0);
        }
        // At x=9: one unit to the end, two carried from p0.
        let p = t.advance(1.0);
        assert!((p - Vec2::new(2.0, 0.0)).length() < 1e-5);
        assert_eq!(t.segment(), (0, 1));
    }

    #[test]
    fn overshoot_is_clamped_to_next_segment() {
        let mut t = make(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (9.0, 0.0)], &[sp(10.0, 1.0)]);
        let p = t.advance(1.0);
        assert!((p - Vec2::new(2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn turning_a_corner_follows_new_direction() {
        let mut t = make(&square(), &[sp(4.0, 1.0)]);
        t.advance(2.0);
        let p = t.advance(1.0);
        // 8 + 4 = 12 along the path: two units up the right edge.
        assert!((p - Vec2::new(10.0, 2.0)).length() < 1e-5);
        assert!((t.direction() - Vec2::Y).length() < 1e-6);
    }

    #[test]
    fn distance_matches_speed_times_time() {
        let mut t = make(&square(), &[sp(5.0, 0.7), sp(25.0, 1.3), sp(12.0, 0.4)]);
        let dt = 0.001;
        let mut last = t.position();
        let mut travelled = 0.0f64;
        let mut expected = 0.0f64;
        for _ in 0..20_000 {
            let p = t.advance(dt);
            travelled += (p - last).length() as f64;
            expected += (t.speed() * dt) as f64;
            last = p;
        }
        // Corner chords are slightly shorter than the path; 0.5% covers them.
        assert!(expected > 100.0);
        assert!(((travelled - expected) / expected).abs() < 5e-3, "{travelled} vs {expected}");
    }

    fn count_cycles(t: &mut PathTransition, total: f32, dt: f32) -> usize {
        let mut cycles = 0;
        let mut prev = t.segment().0;
        let ticks = (total / dt).round() as usize;
        for _ in 0..ticks {
            t.advance(dt);
            let cur = t.segment().0;
            if cur == 0 && prev != 0 {
                cycles += 1;
            }
            prev = cur;
        }
        cycles
    }

    #[test]
    fn path_cycles_independent_of_speed_period() {
        // Same average speed (20), speed periods 2s and 3s.
        let mut a = make(&square(), &[sp(10.0, 1.0), sp(30.0, 1.0)]);
        let mut b = make(&square(), &[sp(10.0, 1.5), sp(30.0, 1.5)]);
        let total = 60.0;
        let expected = total * 20.0 / 40.0;

        let ca = count_cycles(&mut a, total, 0.01) as f32;
        let cb = count_cycles(&mut b, total, 0.01) as f32;
        assert!((ca - expected).abs() <= 1.0, "a: {ca} cycles, expected {expected}");
        assert!((cb - expected).abs() <= 1.0, "b: {cb} cycles, expected {expected}");
    }

    #[test]
    fn restart_returns_to_first_point() {
        let mut t = make(&square(), &[sp(7.0, 1.0)]);
        t.advance(1.3);
        t.restart();
        assert_eq!(t.position(), Vec2::ZERO);
        assert_eq!(t.segment(), (0, 1));
        assert_eq!(t.speed(), 7.0);
    }
}
