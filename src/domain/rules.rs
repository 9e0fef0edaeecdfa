/// Movement rules: what blocks a step, and how banked speed becomes steps.
///
/// ## Collision Truth Table
///
/// ┌──────────────────────────────┬──────────┐
/// │ Target cell                   │ Collides │
/// ├──────────────────────────────┼──────────┤
/// │ outside the map               │ YES      │
/// │ blocked tile id               │ YES      │
/// │ holds a solid object (post)   │ YES      │
/// │ holds a pickup (tool, boots)  │ NO       │
/// │ otherwise                     │ NO       │
/// └──────────────────────────────┴──────────┘
///
/// Actor-vs-actor blocking is an occupancy question, answered by the
/// simulation step, not here.
///
/// ## Movement accumulator
///
/// Each tick a moving entity banks `speed` points. Once the bank reaches
/// `move_cost` it tries one tile; success spends `move_cost`, a collision
/// empties the bank. Releasing the direction empties the bank too, so a
/// tap never carries over into the next press.

use super::entity::{Direction, Entity};
use super::object::WorldObject;
use super::tile::TileMap;

pub trait CollisionQuery {
    /// Would `entity` hit something by stepping one tile toward `dir`?
    fn collides(&self, entity: &Entity, dir: Direction) -> bool;
}

/// Static world view: tiles plus placed objects.
pub struct Terrain<'a> {
    pub map: &'a TileMap,
    pub objects: &'a [WorldObject],
}

impl<'a> Terrain<'a> {
    pub fn solid_object_at(&self, x: usize, y: usize) -> bool {
        self.objects.iter().any(|o| o.kind.is_solid() && o.x == x && o.y == y)
    }
}

impl<'a> CollisionQuery for Terrain<'a> {
    fn collides(&self, entity: &Entity, dir: Direction) -> bool {
        match dir.step_from(entity.x, entity.y, self.map.width, self.map.height) {
            None => true,
            Some((nx, ny)) => self.map.is_blocked(nx, ny) || self.solid_object_at(nx, ny),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StepOutcome {
    Moved,
    /// Not moving, or still banking points.
    Idle,
    Blocked,
}

/// Run one tick of movement for `entity`.
pub fn advance<Q: CollisionQuery + ?Sized>(
    entity: &mut Entity,
    dir: Option<Direction>,
    points: u32,
    move_cost: u32,
    query: &Q,
) -> StepOutcome {
    let Some(dir) = dir else {
        entity.move_progress = 0;
        return StepOutcome::Idle;
    };
    entity.facing = dir;
    entity.move_progress += points;
    if entity.move_progress < move_cost {
        return StepOutcome::Idle;
    }
    if query.collides(entity, dir) {
        entity.move_progress = 0;
        return StepOutcome::Blocked;
    }
    // Bounds already checked by `collides`.
    let (dx, dy) = dir.delta();
    entity.x = (entity.x as i32 + dx) as usize;
    entity.y = (entity.y as i32 + dy) as usize;
    entity.move_progress = (entity.move_progress - move_cost).min(move_cost - 1);
    entity.anim = entity.anim.wrapping_add(1);
    StepOutcome::Moved
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::object::ObjectKind;
    use crate::domain::tile::Tile;

    /// Helper: build a map from a string diagram.
    /// Legend:  '#'=Wall  '='=Road  ' '=Grass
    fn map_from(rows: &[&str]) -> TileMap {
        let mut m = TileMap::filled(rows[0].len(), rows.len(), Tile::GRASS);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                m.set(x, y, match ch {
                    '#' => Tile::WALL,
                    '=' => Tile::ROAD,
                    _ => Tile::GRASS,
                });
            }
        }
        m
    }

    #[test]
    fn walls_and_edges_collide() {
        let m = map_from(&[
            " #",
            "  ",
        ]);
        let t = Terrain { map: &m, objects: &[] };
        let e = Entity::player(0, 0, 4, 6);
        assert!(t.collides(&e, Direction::Right));
        assert!(t.collides(&e, Direction::Up));
        assert!(t.collides(&e, Direction::Left));
        assert!(!t.collides(&e, Direction::Down));
    }

    #[test]
    fn only_solid_objects_collide() {
        let m = map_from(&["   "]);
        let objs = [
            WorldObject::new(ObjectKind::Post, 0, 0),
            WorldObject::new(ObjectKind::Boots, 2, 0),
        ];
        let t = Terrain { map: &m, objects: &objs };
        let e = Entity::player(1, 0, 4, 6);
        assert!(t.collides(&e, Direction::Left));
        assert!(!t.collides(&e, Direction::Right));
    }

    #[test]
    fn speed_banks_until_move_cost() {
        let m = map_from(&["====="]);
        let t = Terrain { map: &m, objects: &[] };
        let mut e = Entity::player(0, 0, 4, 6);
        assert_eq!(advance(&mut e, Some(Direction::Right), 4, 12, &t), StepOutcome::Idle);
        assert_eq!(advance(&mut e, Some(Direction::Right), 4, 12, &t), StepOutcome::Idle);
        assert_eq!(advance(&mut e, Some(Direction::Right), 4, 12, &t), StepOutcome::Moved);
        assert_eq!(e.pos(), (1, 0));
        assert_eq!(e.move_progress, 0);
        assert_eq!(e.facing, Direction::Right);
    }

    #[test]
    fn release_and_collision_empty_the_bank() {
        let m = map_from(&[" #"]);
        let t = Terrain { map: &m, objects: &[] };
        let mut e = Entity::player(0, 0, 4, 6);
        advance(&mut e, Some(Direction::Right), 8, 12, &t);
        assert_eq!(advance(&mut e, None, 8, 12, &t), StepOutcome::Idle);
        assert_eq!(e.move_progress, 0);

        advance(&mut e, Some(Direction::Right), 8, 12, &t);
        assert_eq!(advance(&mut e, Some(Direction::Right), 8, 12, &t), StepOutcome::Blocked);
        assert_eq!(e.move_progress, 0);
        assert_eq!(e.pos(), (0, 0));
    }

    #[test]
    fn at_most_one_tile_per_tick() {
        let m = map_from(&["====="]);
        let t = Terrain { map: &m, objects: &[] };
        let mut e = Entity::player(0, 0, 40, 6);
        assert_eq!(advance(&mut e, Some(Direction::Right), 40, 12, &t), StepOutcome::Moved);
        assert_eq!(e.pos(), (1, 0));
        assert!(e.move_progress < 12);
    }
}
