/// Level population: where tools, the post, the boots, and the NPC go.
///
/// All positions are inside the 5-tile placement margin, never on the
/// player spawn, and never on top of each other.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::domain::object::{ObjectKind, WorldObject};
use crate::domain::tile::TileMap;
use crate::domain::tools::ToolType;

/// Distance kept from the map edge when placing anything.
pub const PLACEMENT_MARGIN: usize = 5;
/// Minimum distance between a fallback post and every tool.
pub const POST_TOOL_DISTANCE: f64 = 5.0;
/// Random NPC spawn attempts before scanning for a fallback.
pub const NPC_ATTEMPTS: u32 = 1000;
/// NPC spawn samples are drawn from `[NPC_RANGE_START, width - NPC_RANGE_START)`.
const NPC_RANGE_START: usize = 10;
/// Tile next to the spawn that the stock maps keep clear.
const RESERVED_CELL: (usize, usize) = (2, 43);

fn is_valid_position(map: &TileMap, x: usize, y: usize, spawn: (usize, usize)) -> bool {
    if (x, y) == RESERVED_CELL || (x, y) == spawn {
        return false;
    }
    x >= PLACEMENT_MARGIN
        && x + PLACEMENT_MARGIN < map.width
        && y >= PLACEMENT_MARGIN
        && y + PLACEMENT_MARGIN < map.height
}

fn distance(a: (usize, usize), b: (usize, usize)) -> f64 {
    let dx = a.0 as f64 - b.0 as f64;
    let dy = a.1 as f64 - b.1 as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Place one tool of each type, the post, and the boots.
///
/// Tools take the first shuffled pathway cells. The post takes a free post
/// site if there is one, else a pathway cell at least
/// `POST_TOOL_DISTANCE` from every tool. The boots take the next unused
/// pathway cell. Objects that cannot be placed are skipped with a warning.
pub fn place_objects<R: Rng + ?Sized>(map: &TileMap, spawn: (usize, usize), rng: &mut R) -> Vec<WorldObject> {
    let valid = |&(x, y): &(usize, usize)| is_valid_position(map, x, y, spawn) && !map.is_blocked(x, y);
    let mut post_sites: Vec<_> = map.cells_where(|t| t.is_post_site()).into_iter().filter(valid).collect();
    let mut pathway: Vec<_> = map.cells_where(|t| t.is_pathway()).into_iter().filter(valid).collect();
    post_sites.shuffle(rng);
    pathway.shuffle(rng);

    let mut objects: Vec<WorldObject> = Vec::with_capacity(6);
    let used = |objects: &[WorldObject], p: (usize, usize)| objects.iter().any(|o| (o.x, o.y) == p);

    for (tool, &(x, y)) in ToolType::ALL.iter().zip(pathway.iter()) {
        objects.push(WorldObject::new(ObjectKind::Tool(*tool), x, y));
    }
    if objects.len() < ToolType::ALL.len() {
        warn!(placed = objects.len(), "not enough pathway tiles for every tool");
    }

    let post = post_sites.iter().copied().find(|&p| !used(&objects, p)).or_else(|| {
        warn!("no free post site, placing post on the pathway");
        pathway.iter().copied().find(|&p| {
            !used(&objects, p) && objects.iter().all(|o| distance(p, (o.x, o.y)) >= POST_TOOL_DISTANCE)
        })
    });
    match post {
        Some((x, y)) => objects.push(WorldObject::new(ObjectKind::Post, x, y)),
        None => warn!("no position found for the post"),
    }

    match pathway.iter().copied().find(|&p| !used(&objects, p)) {
        Some((x, y)) => objects.push(WorldObject::new(ObjectKind::Boots, x, y)),
        None => warn!("no free pathway tile for the boots"),
    }

    debug!(count = objects.len(), "objects placed");
    objects
}

/// Pick an NPC spawn: random walkable cells first, then a row-major scan.
/// `occupied` holds cells already taken (objects, player).
pub fn place_npc<R: Rng + ?Sized>(
    map: &TileMap,
    spawn: (usize, usize),
    occupied: &[(usize, usize)],
    rng: &mut R,
) -> (usize, usize) {
    let ok = |x: usize, y: usize| {
        let t = map.get(x, y);
        t.is_npc_walkable() && !t.is_blocked() && is_valid_position(map, x, y, spawn) && !occupied.contains(&(x, y))
    };

    if map.width > 2 * NPC_RANGE_START && map.height > 2 * NPC_RANGE_START {
        for _ in 0..NPC_ATTEMPTS {
            let x = rng.gen_range(NPC_RANGE_START..map.width - NPC_RANGE_START);
            let y = rng.gen_range(NPC_RANGE_START..map.height - NPC_RANGE_START);
            if ok(x, y) {
                debug!(x, y, "npc placed");
                return (x, y);
            }
        }
    }

    warn!("npc spawn attempts exhausted, scanning for a fallback cell");
    for y in 0..map.height {
        for x in 0..map.width {
            if ok(x, y) {
                return (x, y);
            }
        }
    }
    (map.width / 2, map.height / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::{Tile, WORLD_SIZE};
    use crate::sim::maps::{generated_map, PLAYER_SPAWN};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn positions(objs: &[WorldObject]) -> Vec<(usize, usize)> {
        objs.iter().map(|o| (o.x, o.y)).collect()
    }

    #[test]
    fn places_four_tools_post_and_boots_without_overlap() {
        let map = generated_map();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let objs = place_objects(&map, PLAYER_SPAWN, &mut rng);
            assert_eq!(objs.len(), 6);

            let mut tools: Vec<_> = objs
                .iter()
                .filter_map(|o| match o.kind { ObjectKind::Tool(t) => Some(t.index()), _ => None })
                .collect();
            tools.sort();
            assert_eq!(tools, vec![0, 1, 2, 3]);

            let mut ps = positions(&objs);
            ps.sort();
            ps.dedup();
            assert_eq!(ps.len(), 6, "objects overlap");
            for o in &objs {
                assert!(is_valid_position(&map, o.x, o.y, PLAYER_SPAWN));
                assert!(!map.is_blocked(o.x, o.y));
            }
            let post = objs.iter().find(|o| o.kind == ObjectKind::Post).unwrap();
            assert!(map.get(post.x, post.y).is_post_site());
        }
    }

    #[test]
    fn post_falls_back_away_from_tools() {
        let mut map = TileMap::filled(WORLD_SIZE, WORLD_SIZE, Tile::GRASS);
        for x in 5..45 {
            map.set(x, 20, Tile::ROAD);
        }
        let mut rng = StdRng::seed_from_u64(7);
        let objs = place_objects(&map, PLAYER_SPAWN, &mut rng);
        let post = objs.iter().find(|o| o.kind == ObjectKind::Post).unwrap();
        assert!(map.get(post.x, post.y).is_pathway());
        for o in objs.iter().filter(|o| matches!(o.kind, ObjectKind::Tool(_))) {
            assert!(distance((post.x, post.y), (o.x, o.y)) >= POST_TOOL_DISTANCE);
        }
    }

    #[test]
    fn npc_lands_on_walkable_free_cell() {
        let map = generated_map();
        let mut rng = StdRng::seed_from_u64(11);
        let objs = place_objects(&map, PLAYER_SPAWN, &mut rng);
        let taken = positions(&objs);
        for _ in 0..20 {
            let (x, y) = place_npc(&map, PLAYER_SPAWN, &taken, &mut rng);
            assert!(map.get(x, y).is_npc_walkable());
            assert!(!taken.contains(&(x, y)));
            assert!((x, y) != PLAYER_SPAWN);
        }
    }

    #[test]
    fn npc_fallback_scans_when_sampling_range_is_walled() {
        let mut map = TileMap::filled(WORLD_SIZE, WORLD_SIZE, Tile::WALL);
        map.set(6, 7, Tile::GRASS);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(place_npc(&map, PLAYER_SPAWN, &[], &mut rng), (6, 7));
    }
}
