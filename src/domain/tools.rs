/// Tool collection: which of the four repair tools the player carries.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ToolType {
    Wrench,
    Pliers,
    Screwdriver,
    Tape,
}

impl ToolType {
    pub const ALL: [ToolType; 4] = [ToolType::Wrench, ToolType::Pliers, ToolType::Screwdriver, ToolType::Tape];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ToolType::Wrench => "Wrench",
            ToolType::Pliers => "Pliers",
            ToolType::Screwdriver => "Screwdriver",
            ToolType::Tape => "Tape",
        }
    }
}

/// Tools needed before the post can be repaired.
pub const TOOLS_REQUIRED: usize = ToolType::ALL.len();

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolInventory {
    held: [bool; TOOLS_REQUIRED],
}

impl ToolInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pickup. Returns true only the first time a type is collected.
    pub fn pick_up(&mut self, tool: ToolType) -> bool {
        let slot = &mut self.held[tool.index()];
        let fresh = !*slot;
        *slot = true;
        fresh
    }

    pub fn has(&self, tool: ToolType) -> bool {
        self.held[tool.index()]
    }

    pub fn count(&self) -> usize {
        self.held.iter().filter(|h| **h).count()
    }

    pub fn is_complete(&self) -> bool {
        self.count() >= TOOLS_REQUIRED
    }

    /// How many more distinct tools are needed.
    pub fn missing(&self) -> usize {
        TOOLS_REQUIRED - self.count()
    }

    pub fn reset(&mut self) {
        self.held = [false; TOOLS_REQUIRED];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_up_is_idempotent() {
        let mut inv = ToolInventory::new();
        assert!(inv.pick_up(ToolType::Pliers));
        assert!(!inv.pick_up(ToolType::Pliers));
        assert_eq!(inv.count(), 1);
        assert!(inv.has(ToolType::Pliers));
        assert!(!inv.has(ToolType::Tape));
    }

    #[test]
    fn complete_after_all_four_in_any_order() {
        let mut inv = ToolInventory::new();
        for t in [ToolType::Tape, ToolType::Wrench, ToolType::Tape, ToolType::Screwdriver] {
            inv.pick_up(t);
        }
        assert!(!inv.is_complete());
        assert_eq!(inv.missing(), 1);
        inv.pick_up(ToolType::Pliers);
        assert!(inv.is_complete());
        assert_eq!(inv.missing(), 0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut inv = ToolInventory::new();
        for t in ToolType::ALL {
            inv.pick_up(t);
        }
        inv.reset();
        assert_eq!(inv, ToolInventory::new());
        assert_eq!(inv.count(), 0);
    }
}
