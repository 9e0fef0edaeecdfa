/// Wandering NPC behaviour.
///
/// The NPC walks in a straight line and picks a fresh random heading when:
///   1. its turn timer runs out (180..300 ticks),
///   2. it walks into terrain or a solid object, or
///   3. it has been held up by another actor for more than `STUCK_LIMIT` ticks.
///
/// It never chases anything and never touches world objects.

use rand::Rng;

use super::entity::Direction;

pub const TURN_BASE_TICKS: u32 = 180;
pub const TURN_JITTER_TICKS: u32 = 120;
pub const STUCK_LIMIT: u32 = 5;

#[derive(Clone, Debug)]
pub struct WanderController {
    pub dir: Direction,
    /// Ticks left before the next voluntary turn.
    pub turn_in: u32,
    /// Consecutive ticks spent waiting on an occupied cell.
    pub stuck_ticks: u32,
}

/// What happened when the NPC tried to move this tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WanderResult {
    Moved,
    /// Not enough movement points banked yet.
    Idle,
    /// Terrain or a solid object in the way.
    Collided,
    /// Another actor in the way.
    Waiting,
}

impl WanderController {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut c = WanderController { dir: Direction::Down, turn_in: 0, stuck_ticks: 0 };
        c.turn(rng);
        c
    }

    /// Heading to try this tick.
    pub fn think<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Direction {
        if self.turn_in == 0 {
            self.turn(rng);
        } else {
            self.turn_in -= 1;
        }
        self.dir
    }

    pub fn report<R: Rng + ?Sized>(&mut self, result: WanderResult, rng: &mut R) {
        match result {
            WanderResult::Moved => self.stuck_ticks = 0,
            WanderResult::Idle => {}
            WanderResult::Collided => self.turn(rng),
            WanderResult::Waiting => {
                self.stuck_ticks += 1;
                if self.stuck_ticks > STUCK_LIMIT {
                    self.turn(rng);
                }
            }
        }
    }

    fn turn<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.dir = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
        self.turn_in = TURN_BASE_TICKS + rng.gen_range(0..TURN_JITTER_TICKS);
        self.stuck_ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn turn_timer_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let c = WanderController::new(&mut rng);
            assert!(c.turn_in >= TURN_BASE_TICKS);
            assert!(c.turn_in < TURN_BASE_TICKS + TURN_JITTER_TICKS);
        }
    }

    #[test]
    fn timer_expiry_rerolls_heading_timer() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut c = WanderController::new(&mut rng);
        c.turn_in = 1;
        c.think(&mut rng);
        assert_eq!(c.turn_in, 0);
        c.think(&mut rng);
        assert!(c.turn_in >= TURN_BASE_TICKS);
    }

    #[test]
    fn collision_forces_a_turn() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut c = WanderController::new(&mut rng);
        c.turn_in = 7;
        c.report(WanderResult::Collided, &mut rng);
        assert!(c.turn_in >= TURN_BASE_TICKS);
    }

    #[test]
    fn waiting_turns_only_after_stuck_limit() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut c = WanderController::new(&mut rng);
        c.turn_in = 7;
        for _ in 0..STUCK_LIMIT {
            c.report(WanderResult::Waiting, &mut rng);
        }
        assert_eq!(c.turn_in, 7);
        assert_eq!(c.stuck_ticks, STUCK_LIMIT);
        c.report(WanderResult::Waiting, &mut rng);
        assert_eq!(c.stuck_ticks, 0);
        assert!(c.turn_in >= TURN_BASE_TICKS);
    }
}
