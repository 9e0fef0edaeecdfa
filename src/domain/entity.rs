/// Actors: one `Entity` record shape for the player and the wandering NPC.
/// What differs between them lives in the `Controller` variant.

use super::ai::WanderController;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Neighbouring cell in this direction, if it is inside `width × height`.
    pub fn step_from(self, x: usize, y: usize, width: usize, height: usize) -> Option<(usize, usize)> {
        let (dx, dy) = self.delta();
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
            return None;
        }
        Some((nx as usize, ny as usize))
    }
}

/// Player-only state.
#[derive(Clone, Debug, Default)]
pub struct PlayerController {
    /// Was the player pressing into the repair post last tick?
    pub touching_post: bool,
    /// Speed boost end time, absolute ms.
    pub boost_until_ms: Option<u64>,
}

impl PlayerController {
    pub fn boost_active(&self, now_ms: u64) -> bool {
        matches!(self.boost_until_ms, Some(end) if now_ms < end)
    }

    /// Remaining boost time; 0 when no boost is running.
    pub fn boost_remaining_ms(&self, now_ms: u64) -> u64 {
        self.boost_until_ms.map_or(0, |end| end.saturating_sub(now_ms))
    }

    /// Start a boost or push the current one's end back. Boosts never stack.
    pub fn grant_boost(&mut self, now_ms: u64, duration_ms: u64) {
        self.boost_until_ms = Some(now_ms + duration_ms);
    }
}

#[derive(Clone, Debug)]
pub enum Controller {
    Player(PlayerController),
    Wanderer(WanderController),
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub x: usize,
    pub y: usize,
    pub facing: Direction,
    /// Base movement points gained per tick.
    pub speed: u32,
    /// Movement points banked toward the next tile.
    pub move_progress: u32,
    pub life: u32,
    pub max_life: u32,
    /// Walk-cycle frame, advanced on each completed step.
    pub anim: u8,
    pub controller: Controller,
}

impl Entity {
    pub fn player(x: usize, y: usize, speed: u32, max_life: u32) -> Self {
        Entity {
            x, y,
            facing: Direction::Down,
            speed,
            move_progress: 0,
            life: max_life,
            max_life,
            anim: 0,
            controller: Controller::Player(PlayerController::default()),
        }
    }

    pub fn wanderer(x: usize, y: usize, speed: u32, controller: WanderController) -> Self {
        Entity {
            x, y,
            facing: controller.dir,
            speed,
            move_progress: 0,
            life: 1,
            max_life: 1,
            anim: 0,
            controller: Controller::Wanderer(controller),
        }
    }

    pub fn pos(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    pub fn player_state(&self) -> Option<&PlayerController> {
        match &self.controller {
            Controller::Player(p) => Some(p),
            Controller::Wanderer(_) => None,
        }
    }

    pub fn player_state_mut(&mut self) -> Option<&mut PlayerController> {
        match &mut self.controller {
            Controller::Player(p) => Some(p),
            Controller::Wanderer(_) => None,
        }
    }

    /// Movement points gained this tick, boost included.
    pub fn effective_speed(&self, now_ms: u64, boost_bonus: u32) -> u32 {
        match self.player_state() {
            Some(p) if p.boost_active(now_ms) => self.speed + boost_bonus,
            _ => self.speed,
        }
    }

    /// Lose `amount` life points; returns true if the entity is out of life.
    pub fn damage(&mut self, amount: u32) -> bool {
        self.life = self.life.saturating_sub(amount);
        self.life == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_from_respects_bounds() {
        assert_eq!(Direction::Left.step_from(0, 3, 5, 5), None);
        assert_eq!(Direction::Up.step_from(2, 0, 5, 5), None);
        assert_eq!(Direction::Right.step_from(4, 1, 5, 5), None);
        assert_eq!(Direction::Down.step_from(2, 3, 5, 5), Some((2, 4)));
    }

    #[test]
    fn boost_extends_instead_of_stacking() {
        let mut e = Entity::player(0, 0, 4, 6);
        assert_eq!(e.effective_speed(0, 2), 4);

        e.player_state_mut().unwrap().grant_boost(1_000, 10_000);
        assert_eq!(e.effective_speed(5_000, 2), 6);

        e.player_state_mut().unwrap().grant_boost(6_000, 10_000);
        assert_eq!(e.effective_speed(12_000, 2), 6);
        assert_eq!(e.player_state().unwrap().boost_remaining_ms(12_000), 4_000);
        assert_eq!(e.effective_speed(16_000, 2), 4);
    }

    #[test]
    fn damage_saturates_at_zero() {
        let mut e = Entity::player(0, 0, 4, 2);
        assert!(!e.damage(1));
        assert!(e.damage(5));
        assert_eq!(e.life, 0);
    }
}
