/// Wire restoration puzzle: generation, drag-to-connect, undo/redo, and
/// the timed resolution.
///
/// ## Board
///
/// A 4×4 grid of 80-unit cells (320×320 board units). Eight terminals sit
/// in the top and bottom rows:
///
/// ```text
///   col:  0    1    2    3
///   row 0 [0]  [2]  [4]  [6]
///   row 3 [1]  [3]  [5]  [7]
/// ```
///
/// Node centre = `(col·80 + 40, row·80 + 40)`. Hit tests compare each axis
/// separately (square hit boxes): 25 units to pick up a wire at its start
/// terminal, 40 units to drop it on its end terminal.
///
/// ## History
///
/// The top of the undo stack is always the current connection snapshot;
/// the stack never drops below the initial all-disconnected snapshot.
/// Every state-changing action pushes one snapshot and clears redo.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

pub const WIRE_COUNT: usize = 4;
pub const NODE_COUNT: usize = 2 * WIRE_COUNT;
pub const GRID_CELLS: usize = 4;
pub const CELL_UNITS: i32 = 80;
pub const BOARD_UNITS: i32 = GRID_CELLS as i32 * CELL_UNITS;
pub const SELECT_RADIUS: i32 = 25;
pub const DROP_RADIUS: i32 = 40;

/// Terminal cells as `(col, row)`, indexed by node id.
pub const NODE_CELLS: [(usize, usize); NODE_COUNT] =
    [(0, 0), (0, 3), (1, 0), (1, 3), (2, 0), (2, 3), (3, 0), (3, 3)];

pub const WIRE_COLOR_NAMES: [&str; WIRE_COUNT] = ["red", "blue", "green", "yellow"];

pub type Snapshot = [bool; WIRE_COUNT];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WireNode {
    pub id: usize,
    pub col: usize,
    pub row: usize,
    /// Color of the wire ending here; `None` until generated.
    pub color: Option<usize>,
}

impl WireNode {
    /// Centre in board units.
    pub fn centre(&self) -> (i32, i32) {
        (
            self.col as i32 * CELL_UNITS + CELL_UNITS / 2,
            self.row as i32 * CELL_UNITS + CELL_UNITS / 2,
        )
    }

    /// Within `radius` of the centre on both axes?
    pub fn hit(&self, x: i32, y: i32, radius: i32) -> bool {
        let (cx, cy) = self.centre();
        (x - cx).abs() < radius && (y - cy).abs() < radius
    }

    /// Terminal label: color letter, then 1 for the left half, 2 for the right.
    pub fn label(&self) -> Option<String> {
        let color = self.color?;
        let letter = (b'A' + color as u8) as char;
        let side = if self.col < GRID_CELLS / 2 { 1 } else { 2 };
        Some(format!("{}{}", letter, side))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Wire {
    pub color: usize,
    pub start: usize,
    pub end: usize,
    pub connected: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    InProgress,
    Solved,
    Failed,
}

/// A wire being dragged from its start terminal.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Drag {
    pub wire: usize,
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug)]
pub struct WirePuzzle {
    nodes: [WireNode; NODE_COUNT],
    wires: Vec<Wire>,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    drag: Option<Drag>,

    time_limit_ms: u64,
    deadline_ms: u64,
    outcome: Outcome,
    resolved_at_ms: Option<u64>,
    life_penalty_applied: bool,
}

// ── Construction / generation ──

impl WirePuzzle {
    pub fn new<R: Rng + ?Sized>(time_limit_ms: u64, rng: &mut R) -> Self {
        let mut nodes = [WireNode { id: 0, col: 0, row: 0, color: None }; NODE_COUNT];
        for (id, node) in nodes.iter_mut().enumerate() {
            let (col, row) = NODE_CELLS[id];
            *node = WireNode { id, col, row, color: None };
        }
        let mut p = WirePuzzle {
            nodes,
            wires: Vec::with_capacity(WIRE_COUNT),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            drag: None,
            time_limit_ms,
            deadline_ms: time_limit_ms,
            outcome: Outcome::InProgress,
            resolved_at_ms: None,
            life_penalty_applied: false,
        };
        p.reset_puzzle(rng);
        p
    }

    /// Fresh session: new matching, clean history, countdown from `now_ms`.
    pub fn start<R: Rng + ?Sized>(&mut self, now_ms: u64, rng: &mut R) {
        self.reset_puzzle(rng);
        self.deadline_ms = now_ms + self.time_limit_ms;
        info!(deadline_ms = self.deadline_ms, "wire puzzle started");
    }

    /// Disconnect everything, drop selection and history, and regenerate.
    pub fn reset_puzzle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.drag = None;
        self.outcome = Outcome::InProgress;
        self.resolved_at_ms = None;
        self.life_penalty_applied = false;
        self.undo_stack.clear();
        self.redo_stack.clear();
        for node in self.nodes.iter_mut() {
            node.color = None;
        }
        self.generate(rng);
        self.undo_stack.push(self.snapshot());
    }

    /// Shuffle the node ids and pair neighbours: positions `2k, 2k+1`
    /// become wire `k` with color `k`.
    fn generate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut ids: Vec<usize> = (0..NODE_COUNT).collect();
        ids.shuffle(rng);

        self.wires.clear();
        for (color, pair) in ids.chunks_exact(2).enumerate() {
            let wire = Wire { color, start: pair[0], end: pair[1], connected: false };
            self.nodes[wire.start].color = Some(color);
            self.nodes[wire.end].color = Some(color);
            debug!(
                color = WIRE_COLOR_NAMES[color],
                from = ?self.nodes[wire.start].label(),
                to = ?self.nodes[wire.end].label(),
                "wire generated"
            );
            self.wires.push(wire);
        }
    }
}

// ── Read accessors ──

impl WirePuzzle {
    pub fn nodes(&self) -> &[WireNode] {
        &self.nodes
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    pub fn drag(&self) -> Option<Drag> {
        self.drag
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome != Outcome::InProgress
    }

    pub fn connected_count(&self) -> usize {
        self.wires.iter().filter(|w| w.connected).count()
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut s = [false; WIRE_COUNT];
        for (slot, wire) in s.iter_mut().zip(&self.wires) {
            *slot = wire.connected;
        }
        s
    }

    /// Countdown, frozen at the moment of resolution.
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        let at = self.resolved_at_ms.unwrap_or(now_ms);
        self.deadline_ms.saturating_sub(at)
    }
}

// ── Interaction ──

impl WirePuzzle {
    /// Pick up an unconnected wire by its start terminal.
    pub fn pointer_down(&mut self, x: i32, y: i32) -> bool {
        if self.is_resolved() {
            return false;
        }
        let picked = self
            .wires
            .iter()
            .position(|w| !w.connected && self.nodes[w.start].hit(x, y, SELECT_RADIUS));
        self.drag = picked.map(|wire| Drag { wire, x, y });
        picked.is_some()
    }

    pub fn pointer_move(&mut self, x: i32, y: i32) {
        if self.is_resolved() {
            return;
        }
        if let Some(d) = self.drag.as_mut() {
            d.x = x;
            d.y = y;
        }
    }

    /// Drop the dragged wire. Connects only on its own end terminal.
    pub fn pointer_up(&mut self, x: i32, y: i32) -> bool {
        if self.is_resolved() {
            return false;
        }
        let Some(drag) = self.drag.take() else { return false };
        let wire = &mut self.wires[drag.wire];
        if wire.connected || !self.nodes[wire.end].hit(x, y, DROP_RADIUS) {
            return false;
        }
        wire.connected = true;
        self.record();
        true
    }

    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    /// Disconnect every wire as one undoable step. False if nothing was connected.
    pub fn disconnect_all(&mut self) -> bool {
        if self.is_resolved() {
            return false;
        }
        self.drag = None;
        let mut changed = false;
        for wire in self.wires.iter_mut() {
            changed |= wire.connected;
            wire.connected = false;
        }
        if changed {
            self.record();
        }
        changed
    }

    pub fn undo(&mut self) -> bool {
        if self.is_resolved() || !self.can_undo() {
            return false;
        }
        if let Some(current) = self.undo_stack.pop() {
            self.redo_stack.push(current);
        }
        if let Some(&previous) = self.undo_stack.last() {
            self.restore(previous);
        }
        self.drag = None;
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.is_resolved() {
            return false;
        }
        let Some(next) = self.redo_stack.pop() else { return false };
        self.undo_stack.push(next);
        self.restore(next);
        self.drag = None;
        true
    }

    fn record(&mut self) {
        self.undo_stack.push(self.snapshot());
        self.redo_stack.clear();
    }

    fn restore(&mut self, snapshot: Snapshot) {
        for (wire, &connected) in self.wires.iter_mut().zip(snapshot.iter()) {
            wire.connected = connected;
        }
    }
}

// ── Resolution ──

impl WirePuzzle {
    /// Resolve the session. Returns the outcome on the tick it is decided.
    /// Running out of time wins over a board completed on the same tick.
    pub fn tick(&mut self, now_ms: u64) -> Option<Outcome> {
        if self.is_resolved() {
            return None;
        }
        let outcome = if self.remaining_ms(now_ms) == 0 {
            Outcome::Failed
        } else if self.wires.iter().all(|w| w.connected) {
            Outcome::Solved
        } else {
            return None;
        };
        self.outcome = outcome;
        self.resolved_at_ms = Some(now_ms);
        self.drag = None;
        info!(?outcome, "wire puzzle resolved");
        Some(outcome)
    }

    /// The life penalty for a failed session, handed out at most once.
    pub fn claim_life_penalty(&mut self) -> bool {
        if self.outcome != Outcome::Failed || self.life_penalty_applied {
            return false;
        }
        self.life_penalty_applied = true;
        true
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
