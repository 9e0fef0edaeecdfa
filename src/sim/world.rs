/// World: the tile map, placed objects, the actors, and the tool bag.
///
/// ## Camera / Viewport
///
/// World coordinates and screen coordinates are separate:
///   - `camera` is the viewport into the world (top-left corner + size)
///   - Renderer maps: `screen(sx, sy) = world(camera.x + sx, camera.y + sy)`
///   - Camera follows the player with a dead zone
///   - Maps smaller than the viewport are centered

use rand::Rng;
use tracing::info;

use crate::config::PlayerConfig;
use crate::domain::ai::WanderController;
use crate::domain::entity::{Direction, Entity};
use crate::domain::object::{ObjectKind, WorldObject};
use crate::domain::rules::{CollisionQuery, Terrain};
use crate::domain::tile::TileMap;
use crate::domain::tools::ToolInventory;
use crate::sim::maps::{self, LoadedMap, PLAYER_SPAWN};
use crate::sim::setup;

/// Camera: a viewport into the world.
///
/// `(x, y)` is the world coordinate of the top-left visible cell (negative
/// when a small map is centered). `(view_w, view_h)` is set by the renderer
/// from the terminal size.
#[derive(Clone, Debug, Default)]
pub struct Camera {
    pub x: i32,
    pub y: i32,
    pub view_w: usize,
    pub view_h: usize,
}

/// One camera axis. `dead_zone` keeps the current origin while the target
/// stays inside the inner band of the view.
fn place_axis(origin: i32, target: usize, view: usize, world: usize, dead_zone: bool) -> i32 {
    let view_i = view as i32;
    if world <= view {
        return -((view_i - world as i32) / 2);
    }
    let t = target as i32;
    let wanted = if dead_zone {
        let margin = view_i / 5;
        if t < origin + margin {
            t - margin
        } else if t > origin + view_i - margin - 1 {
            t - view_i + margin + 1
        } else {
            origin
        }
    } else {
        t - view_i / 2
    };
    wanted.clamp(0, (world as i32 - view_i).max(0))
}

impl Camera {
    pub fn follow(&mut self, tx: usize, ty: usize, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = place_axis(self.x, tx, self.view_w, world_w, true);
        self.y = place_axis(self.y, ty, self.view_h, world_h, true);
    }

    /// Snap onto a position (level start).
    pub fn center_on(&mut self, tx: usize, ty: usize, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = place_axis(self.x, tx, self.view_w, world_w, false);
        self.y = place_axis(self.y, ty, self.view_h, world_h, false);
    }

    /// World cell to viewport cell, if visible.
    pub fn world_to_view(&self, wx: usize, wy: usize) -> Option<(usize, usize)> {
        let vx = wx as i32 - self.x;
        let vy = wy as i32 - self.y;
        if vx >= 0 && vx < self.view_w as i32 && vy >= 0 && vy < self.view_h as i32 {
            Some((vx as usize, vy as usize))
        } else {
            None
        }
    }
}

/// Terrain plus other actors: what the player bumps into.
pub struct Crowd<'a> {
    pub terrain: Terrain<'a>,
    pub actors: &'a [(usize, usize)],
}

impl<'a> CollisionQuery for Crowd<'a> {
    fn collides(&self, entity: &Entity, dir: Direction) -> bool {
        if self.terrain.collides(entity, dir) {
            return true;
        }
        let t = self.terrain.map;
        dir.step_from(entity.x, entity.y, t.width, t.height)
            .map_or(true, |cell| self.actors.contains(&cell))
    }
}

pub struct World {
    pub map: TileMap,
    pub map_name: String,
    pub objects: Vec<WorldObject>,
    pub player: Entity,
    pub npcs: Vec<Entity>,
    pub inventory: ToolInventory,
    pub spawn: (usize, usize),
    pub camera: Camera,
}

impl World {
    /// An empty generated world, used before the first level starts.
    pub fn new(player: &PlayerConfig) -> Self {
        World {
            map: maps::generated_map(),
            map_name: maps::GENERATED_NAME.to_string(),
            objects: Vec::new(),
            player: Entity::player(PLAYER_SPAWN.0, PLAYER_SPAWN.1, player.base_speed, player.max_life),
            npcs: Vec::new(),
            inventory: ToolInventory::new(),
            spawn: PLAYER_SPAWN,
            camera: Camera::default(),
        }
    }

    /// Set up a fresh level on `loaded`: objects, NPC, player, inventory.
    /// `keep_boost` carries a running speed boost over from the last level.
    pub fn populate<R: Rng + ?Sized>(&mut self, loaded: LoadedMap, cfg: &PlayerConfig, keep_boost: bool, rng: &mut R) {
        let boost = if keep_boost {
            self.player.player_state().and_then(|p| p.boost_until_ms)
        } else {
            None
        };

        self.map = loaded.map;
        self.map_name = loaded.name;
        self.spawn = PLAYER_SPAWN;
        self.objects = setup::place_objects(&self.map, self.spawn, rng);

        self.player = Entity::player(self.spawn.0, self.spawn.1, cfg.base_speed, cfg.max_life);
        if let Some(p) = self.player.player_state_mut() {
            p.boost_until_ms = boost;
        }
        self.inventory.reset();

        let mut taken: Vec<(usize, usize)> = self.objects.iter().map(|o| (o.x, o.y)).collect();
        taken.push(self.spawn);
        let (nx, ny) = setup::place_npc(&self.map, self.spawn, &taken, rng);
        self.npcs = vec![Entity::wanderer(nx, ny, cfg.npc_speed, WanderController::new(rng))];

        self.camera.center_on(self.spawn.0, self.spawn.1, self.map.width, self.map.height);
        info!(map = %self.map_name, objects = self.objects.len(), npc = ?(nx, ny), "world populated");
    }

    pub fn terrain(&self) -> Terrain<'_> {
        Terrain { map: &self.map, objects: &self.objects }
    }

    pub fn object_at(&self, x: usize, y: usize) -> Option<usize> {
        self.objects.iter().position(|o| o.x == x && o.y == y)
    }

    pub fn post(&self) -> Option<&WorldObject> {
        self.objects.iter().find(|o| o.kind == ObjectKind::Post)
    }

    /// Take the repaired post off the map.
    pub fn remove_post(&mut self) -> bool {
        let before = self.objects.len();
        self.objects.retain(|o| o.kind != ObjectKind::Post);
        self.objects.len() != before
    }

    pub fn npc_positions(&self) -> Vec<(usize, usize)> {
        self.npcs.iter().map(Entity::pos).collect()
    }

    pub fn boost_remaining_ms(&self, now_ms: u64) -> u64 {
        self.player.player_state().map_or(0, |p| p.boost_remaining_ms(now_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::tools::ToolType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn loaded() -> LoadedMap {
        LoadedMap { name: "test".into(), map: maps::generated_map() }
    }

    #[test]
    fn populate_resets_player_and_inventory() {
        let cfg = GameConfig::default().player;
        let mut rng = StdRng::seed_from_u64(1);
        let mut w = World::new(&cfg);
        w.inventory.pick_up(ToolType::Tape);
        w.player.life = 1;
        w.player.x = 20;

        w.populate(loaded(), &cfg, false, &mut rng);
        assert_eq!(w.player.pos(), PLAYER_SPAWN);
        assert_eq!(w.player.life, cfg.max_life);
        assert_eq!(w.inventory.count(), 0);
        assert_eq!(w.objects.len(), 6);
        assert_eq!(w.npcs.len(), 1);
        assert!(w.post().is_some());
        assert!(w.object_at(w.npcs[0].x, w.npcs[0].y).is_none());
    }

    #[test]
    fn boost_survives_only_when_kept() {
        let cfg = GameConfig::default().player;
        let mut rng = StdRng::seed_from_u64(2);
        let mut w = World::new(&cfg);
        w.player.player_state_mut().unwrap().grant_boost(0, 10_000);
        w.populate(loaded(), &cfg, true, &mut rng);
        assert_eq!(w.boost_remaining_ms(4_000), 6_000);
        w.populate(loaded(), &cfg, false, &mut rng);
        assert_eq!(w.boost_remaining_ms(4_000), 0);
    }

    #[test]
    fn remove_post_only_once() {
        let cfg = GameConfig::default().player;
        let mut rng = StdRng::seed_from_u64(3);
        let mut w = World::new(&cfg);
        w.populate(loaded(), &cfg, false, &mut rng);
        assert!(w.remove_post());
        assert!(!w.remove_post());
        assert_eq!(w.objects.len(), 5);
    }

    #[test]
    fn crowd_blocks_other_actors() {
        let cfg = GameConfig::default().player;
        let w = World::new(&cfg);
        let mut e = Entity::player(0, 0, 4, 6);
        e.x = PLAYER_SPAWN.0;
        e.y = PLAYER_SPAWN.1;
        let actors = [(PLAYER_SPAWN.0 + 1, PLAYER_SPAWN.1)];
        let crowd = Crowd { terrain: w.terrain(), actors: &actors };
        assert!(crowd.collides(&e, Direction::Right));
        assert!(!w.terrain().collides(&e, Direction::Right));
    }

    #[test]
    fn camera_clamps_and_centers() {
        let mut c = Camera { x: 0, y: 0, view_w: 20, view_h: 10 };
        c.center_on(2, 2, 50, 50);
        assert_eq!((c.x, c.y), (0, 0));
        c.center_on(48, 48, 50, 50);
        assert_eq!((c.x, c.y), (30, 40));
        c.follow(40, 45, 50, 50);
        assert_eq!((c.x, c.y), (30, 40));
        c.center_on(5, 5, 10, 6);
        assert_eq!((c.x, c.y), (-5, -2));
        assert_eq!(c.world_to_view(0, 0), Some((5, 2)));
        assert_eq!(c.world_to_view(20, 0), None);
    }
}
