/// Tile ids and the grid that holds them.
/// Map files store raw ids 0..49; every property is answered here so the
/// rest of the game never looks at a bare number.

/// Width and height of every world map, in tiles.
pub const WORLD_SIZE: usize = 50;

/// Number of distinct tile ids a map may contain.
pub const TILE_KINDS: u8 = 50;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Tile(pub u8);

impl Tile {
    pub const GRASS: Tile = Tile(0);
    pub const WALL: Tile = Tile(1);
    pub const ROCK: Tile = Tile(4);
    pub const POST_SITE: Tile = Tile(12);
    pub const ROAD: Tile = Tile(13);

    /// Parse a raw id; `None` for ids outside the tile table.
    pub fn from_id(id: u8) -> Option<Tile> {
        (id < TILE_KINDS).then_some(Tile(id))
    }

    /// Does this tile stop the player and the NPC?
    pub fn is_blocked(self) -> bool {
        match self.0 {
            1 | 2 | 4..=11 | 14 | 15 | 20..=22 | 25..=28 | 30..=33 | 37..=43 => true,
            id => id >= TILE_KINDS,
        }
    }

    /// Road tiles: tools and boots are dropped here.
    pub fn is_pathway(self) -> bool {
        matches!(self.0, 12 | 13 | 16 | 17 | 18 | 19 | 23 | 24)
    }

    /// The tile a repair post prefers to stand on.
    pub fn is_post_site(self) -> bool {
        self.0 == 12
    }

    /// Tiles the wandering NPC may be spawned on.
    pub fn is_npc_walkable(self) -> bool {
        matches!(self.0, 0 | 3 | 12 | 13 | 16..=19 | 23 | 24 | 29 | 34..=36 | 44..=49)
    }
}

/// A rectangular grid of tiles, row-major (`tiles[y][x]`).
#[derive(Clone, Debug)]
pub struct TileMap {
    pub tiles: Vec<Vec<Tile>>,
    pub width: usize,
    pub height: usize,
}

impl TileMap {
    pub fn filled(width: usize, height: usize, tile: Tile) -> Self {
        TileMap { tiles: vec![vec![tile; width]; height], width, height }
    }

    /// Tile at (x, y); out of bounds reads as wall.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Tile {
        if x < self.width && y < self.height {
            self.tiles[y][x]
        } else {
            Tile::WALL
        }
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, tile: Tile) {
        if x < self.width && y < self.height {
            self.tiles[y][x] = tile;
        }
    }

    #[inline]
    pub fn is_blocked(&self, x: usize, y: usize) -> bool {
        self.get(x, y).is_blocked()
    }

    /// All cells matching `pred`, in row-major order.
    pub fn cells_where(&self, pred: impl Fn(Tile) -> bool) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for (y, row) in self.tiles.iter().enumerate() {
            for (x, &t) in row.iter().enumerate() {
                if pred(t) {
                    out.push((x, y));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_table_matches_tile_groups() {
        let open = [0u8, 3, 12, 13, 16, 17, 18, 19, 23, 24, 29, 34, 35, 36, 44, 49];
        for id in open {
            assert!(!Tile(id).is_blocked(), "tile {id} should be open");
        }
        let solid = [1u8, 2, 4, 11, 14, 15, 20, 22, 25, 28, 30, 33, 37, 43];
        for id in solid {
            assert!(Tile(id).is_blocked(), "tile {id} should block");
        }
    }

    #[test]
    fn unknown_ids_are_rejected_and_block() {
        assert_eq!(Tile::from_id(49), Some(Tile(49)));
        assert_eq!(Tile::from_id(50), None);
        assert!(Tile(77).is_blocked());
    }

    #[test]
    fn every_pathway_tile_is_open() {
        for id in 0..TILE_KINDS {
            let t = Tile(id);
            if t.is_pathway() || t.is_post_site() {
                assert!(!t.is_blocked());
                assert!(t.is_npc_walkable());
            }
        }
    }

    #[test]
    fn out_of_bounds_reads_as_wall() {
        let m = TileMap::filled(3, 2, Tile::GRASS);
        assert_eq!(m.get(1, 1), Tile::GRASS);
        assert!(m.is_blocked(3, 0));
        assert!(m.is_blocked(0, 2));
    }

    #[test]
    fn cells_where_scans_row_major() {
        let mut m = TileMap::filled(3, 3, Tile::GRASS);
        m.set(2, 0, Tile::ROAD);
        m.set(0, 2, Tile::ROAD);
        assert_eq!(m.cells_where(Tile::is_pathway), vec![(2, 0), (0, 2)]);
    }
}
