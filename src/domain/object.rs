/// World objects: things the player walks into.
/// One closed enum, one handler per variant (see `sim::step::touch_object`).

use super::tools::ToolType;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ObjectKind {
    Tool(ToolType),
    /// The broken power post; starts the wire puzzle.
    Post,
    /// Speed boost pickup.
    Boots,
}

impl ObjectKind {
    /// Solid objects are bumped, not walked over.
    pub fn is_solid(self) -> bool {
        matches!(self, ObjectKind::Post)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WorldObject {
    pub kind: ObjectKind,
    pub x: usize,
    pub y: usize,
}

impl WorldObject {
    pub fn new(kind: ObjectKind, x: usize, y: usize) -> Self {
        WorldObject { kind, x, y }
    }
}
