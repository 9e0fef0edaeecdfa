/// The play step: advances the world by one tick while the game is Playing.
///
/// Processing order:
///   1. Player movement (terrain + solid objects + NPC occupancy)
///   2. Pickups on the player's cell (tools, boots)
///   3. Post contact, edge-triggered
///   4. NPC wandering
///   5. Camera follow
///
/// Whether a post bump opens the puzzle is the state machine's call; the
/// step only reports it.

use rand::Rng;
use tracing::debug;

use crate::config::PlayerConfig;
use crate::domain::ai::WanderResult;
use crate::domain::entity::{Controller, Direction};
use crate::domain::object::ObjectKind;
use crate::domain::rules::{self, StepOutcome};
use super::event::GameEvent;
use super::world::{Crowd, World};

pub fn step_play<R: Rng + ?Sized>(
    world: &mut World,
    movement: Option<Direction>,
    now_ms: u64,
    cfg: &PlayerConfig,
    boost_duration_ms: u64,
    rng: &mut R,
) -> Vec<GameEvent> {
    let mut events = Vec::new();

    move_player(world, movement, now_ms, cfg);
    if let Some(idx) = world.object_at(world.player.x, world.player.y) {
        if let Some(ev) = touch_object(world, idx, now_ms, boost_duration_ms) {
            events.push(ev);
        }
    }
    if check_post_contact(world, movement) {
        events.push(GameEvent::PostBumped);
    }
    move_npcs(world, cfg, rng);

    let (px, py) = world.player.pos();
    world.camera.follow(px, py, world.map.width, world.map.height);
    events
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn move_player(world: &mut World, movement: Option<Direction>, now_ms: u64, cfg: &PlayerConfig) {
    let actors = world.npc_positions();
    let points = world.player.effective_speed(now_ms, cfg.boost_bonus);
    let crowd = Crowd {
        terrain: rules::Terrain { map: &world.map, objects: &world.objects },
        actors: &actors,
    };
    rules::advance(&mut world.player, movement, points, cfg.move_cost, &crowd);
}

/// Apply the effect of stepping onto object `idx`.
/// Pickups are consumed; solid objects are never stood on.
fn touch_object(world: &mut World, idx: usize, now_ms: u64, boost_duration_ms: u64) -> Option<GameEvent> {
    match world.objects[idx].kind {
        ObjectKind::Tool(tool) => {
            world.objects.remove(idx);
            if world.inventory.pick_up(tool) {
                debug!(tool = tool.name(), count = world.inventory.count(), "tool collected");
                Some(GameEvent::ToolPicked(tool))
            } else {
                Some(GameEvent::ToolAlreadyHeld(tool))
            }
        }
        ObjectKind::Boots => {
            world.objects.remove(idx);
            if let Some(p) = world.player.player_state_mut() {
                p.grant_boost(now_ms, boost_duration_ms);
            }
            Some(GameEvent::BoostPicked)
        }
        ObjectKind::Post => None,
    }
}

/// True on the tick the player starts pressing into the post.
fn check_post_contact(world: &mut World, movement: Option<Direction>) -> bool {
    let (w, h) = (world.map.width, world.map.height);
    let touching = movement
        .and_then(|d| d.step_from(world.player.x, world.player.y, w, h))
        .and_then(|(x, y)| world.object_at(x, y))
        .map_or(false, |i| world.objects[i].kind == ObjectKind::Post);

    let Some(state) = world.player.player_state_mut() else { return false };
    let rising = touching && !state.touching_post;
    state.touching_post = touching;
    rising
}

// ══════════════════════════════════════════════════════════════
// NPC
// ══════════════════════════════════════════════════════════════

fn move_npcs<R: Rng + ?Sized>(world: &mut World, cfg: &PlayerConfig, rng: &mut R) {
    let player_pos = world.player.pos();
    let (w, h) = (world.map.width, world.map.height);
    let terrain = rules::Terrain { map: &world.map, objects: &world.objects };

    for npc in world.npcs.iter_mut() {
        let Controller::Wanderer(wander) = &mut npc.controller else { continue };
        let dir = wander.think(rng);

        let would_step = npc.move_progress + npc.speed >= cfg.move_cost;
        let result = if would_step && dir.step_from(npc.x, npc.y, w, h) == Some(player_pos) {
            npc.facing = dir;
            npc.move_progress = 0;
            WanderResult::Waiting
        } else {
            let speed = npc.speed;
            match rules::advance(npc, Some(dir), speed, cfg.move_cost, &terrain) {
                StepOutcome::Moved => WanderResult::Moved,
                StepOutcome::Idle => WanderResult::Idle,
                StepOutcome::Blocked => WanderResult::Collided,
            }
        };

        if let Controller::Wanderer(wander) = &mut npc.controller {
            wander.report(result, rng);
        }
    }
}
