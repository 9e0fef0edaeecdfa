/// World maps: file loading, parsing, and the generated fallback.
///
/// ## Map file format (`maps/<name>.txt`)
///   50 lines of 50 whitespace-separated tile ids (0..49).
///   Row `y` is line `y`; column `x` is the `x`-th id on that line.
///   Extra lines after row 49 and trailing whitespace are ignored.
///
/// A fresh level picks one map at random from the library. A missing or
/// malformed file is logged and replaced by `generated_map()`, so level
/// entry never fails.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::tile::{Tile, TileMap, WORLD_SIZE};

/// Map names tried when the maps directory has no `.txt` files.
pub const DEFAULT_MAPS: [&str; 3] = ["worldmap001", "worldmap002", "worldmap02"];

/// Name reported for the generated fallback map.
pub const GENERATED_NAME: &str = "generated";

/// Where the player starts on every map.
pub const PLAYER_SPAWN: (usize, usize) = (6, 43);

#[derive(Debug, Error)]
pub enum MapError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}, column {col}: `{token}` is not a tile id")]
    BadTile { line: usize, col: usize, token: String },
    #[error("line {line} has {found} tiles, expected {expected}")]
    ShortRow { line: usize, found: usize, expected: usize },
    #[error("map has {found} rows, expected {expected}")]
    ShortMap { found: usize, expected: usize },
}

/// A map chosen for a level.
#[derive(Clone, Debug)]
pub struct LoadedMap {
    pub name: String,
    pub map: TileMap,
}

pub struct MapLibrary {
    dir: PathBuf,
    names: Vec<String>,
}

impl MapLibrary {
    /// Index the `.txt` files in `dir`, or fall back to the stock names.
    pub fn scan(dir: &Path) -> Self {
        let mut names = list_map_files(dir);
        if names.is_empty() {
            warn!(dir = %dir.display(), "no map files found, using stock names");
            names = DEFAULT_MAPS.iter().map(|s| s.to_string()).collect();
        } else {
            debug!(count = names.len(), dir = %dir.display(), "maps indexed");
        }
        MapLibrary { dir: dir.to_path_buf(), names }
    }

    /// Library without any files; every level uses the generated map.
    pub fn empty() -> Self {
        MapLibrary { dir: PathBuf::new(), names: Vec::new() }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Pick a random map for a fresh level. Never fails.
    pub fn load_level<R: Rng + ?Sized>(&self, rng: &mut R) -> LoadedMap {
        let Some(name) = self.names.choose(rng) else {
            return LoadedMap { name: GENERATED_NAME.to_string(), map: generated_map() };
        };
        match self.load(name) {
            Ok(map) => LoadedMap { name: name.clone(), map },
            Err(e) => {
                warn!(map = %name, error = %e, "map unusable, using generated map");
                LoadedMap { name: GENERATED_NAME.to_string(), map: generated_map() }
            }
        }
    }

    pub fn load(&self, name: &str) -> Result<TileMap, MapError> {
        let path = self.dir.join(format!("{}.txt", name));
        let text = std::fs::read_to_string(&path)
            .map_err(|source| MapError::Io { path: path.clone(), source })?;
        parse_map(&text)
    }
}

fn list_map_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else { return vec![] };
    let mut names: Vec<String> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "txt"))
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
        .collect();
    names.sort();
    names
}

/// Parse a map document. See the module docs for the format.
pub fn parse_map(text: &str) -> Result<TileMap, MapError> {
    let mut map = TileMap::filled(WORLD_SIZE, WORLD_SIZE, Tile::GRASS);
    let mut rows = 0;

    for (i, line) in text.lines().take(WORLD_SIZE).enumerate() {
        let mut cols = 0;
        for (x, token) in line.split_whitespace().take(WORLD_SIZE).enumerate() {
            let tile = token
                .parse::<u8>()
                .ok()
                .and_then(Tile::from_id)
                .ok_or_else(|| MapError::BadTile { line: i + 1, col: x + 1, token: token.to_string() })?;
            map.set(x, i, tile);
            cols += 1;
        }
        if cols < WORLD_SIZE {
            return Err(MapError::ShortRow { line: i + 1, found: cols, expected: WORLD_SIZE });
        }
        rows += 1;
    }

    if rows < WORLD_SIZE {
        return Err(MapError::ShortMap { found: rows, expected: WORLD_SIZE });
    }
    Ok(map)
}

// ── Generated fallback ──

const ROAD_LINES: [usize; 5] = [8, 16, 24, 32, 40];
const POST_SITES: [(usize, usize); 3] = [(16, 16), (32, 24), (40, 40)];

/// A playable map built without any files:
/// wall border, grass, a road grid with post sites, and scattered rocks.
pub fn generated_map() -> TileMap {
    let n = WORLD_SIZE;
    let mut map = TileMap::filled(n, n, Tile::GRASS);

    for y in 0..n {
        for x in 0..n {
            if x == 0 || y == 0 || x == n - 1 || y == n - 1 {
                map.set(x, y, Tile::WALL);
            } else if ROAD_LINES.contains(&x) || ROAD_LINES.contains(&y) {
                map.set(x, y, Tile::ROAD);
            } else if (x * 7 + y * 13) % 23 == 0 {
                map.set(x, y, Tile::ROCK);
            }
        }
    }
    for &(x, y) in &POST_SITES {
        map.set(x, y, Tile::POST_SITE);
    }
    map.set(PLAYER_SPAWN.0, PLAYER_SPAWN.1, Tile::GRASS);
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn uniform_doc(id: u8, rows: usize, cols: usize) -> String {
        let row = vec![id.to_string(); cols].join(" ");
        vec![row; rows].join("\n")
    }

    #[test]
    fn parses_full_document() {
        let mut doc = uniform_doc(0, WORLD_SIZE, WORLD_SIZE);
        doc.push_str("\n\ntrailing notes are ignored\n");
        let map = parse_map(&doc).unwrap();
        assert_eq!((map.width, map.height), (WORLD_SIZE, WORLD_SIZE));
        assert_eq!(map.get(49, 49), Tile::GRASS);
    }

    #[test]
    fn column_is_position_on_line() {
        let mut lines: Vec<String> = (0..WORLD_SIZE).map(|_| uniform_doc(0, 1, WORLD_SIZE)).collect();
        let mut ids = vec!["0"; WORLD_SIZE];
        ids[7] = "13";
        lines[3] = ids.join("  ");
        let map = parse_map(&lines.join("\n")).unwrap();
        assert_eq!(map.get(7, 3), Tile::ROAD);
        assert_eq!(map.get(3, 7), Tile::GRASS);
    }

    #[test]
    fn rejects_unknown_ids() {
        let doc = uniform_doc(50, WORLD_SIZE, WORLD_SIZE);
        assert!(matches!(parse_map(&doc), Err(MapError::BadTile { line: 1, col: 1, .. })));
        let doc = uniform_doc(0, WORLD_SIZE, WORLD_SIZE).replacen('0', "x", 1);
        assert!(matches!(parse_map(&doc), Err(MapError::BadTile { .. })));
    }

    #[test]
    fn rejects_short_rows_and_maps() {
        let doc = uniform_doc(0, WORLD_SIZE, WORLD_SIZE - 1);
        assert!(matches!(parse_map(&doc), Err(MapError::ShortRow { line: 1, found: 49, .. })));
        let doc = uniform_doc(0, 10, WORLD_SIZE);
        assert!(matches!(parse_map(&doc), Err(MapError::ShortMap { found: 10, .. })));
    }

    #[test]
    fn generated_map_is_playable() {
        let map = generated_map();
        assert!(!map.is_blocked(PLAYER_SPAWN.0, PLAYER_SPAWN.1));
        assert!(map.is_blocked(0, 10));
        assert!(map.is_blocked(49, 10));
        assert!(!map.cells_where(Tile::is_post_site).is_empty());
        assert!(map.cells_where(Tile::is_pathway).len() > 20);
    }

    #[test]
    fn missing_files_fall_back_to_generated_map() {
        let lib = MapLibrary::scan(Path::new("/nonexistent/linefix-maps"));
        assert_eq!(lib.names().len(), DEFAULT_MAPS.len());
        let mut rng = StdRng::seed_from_u64(1);
        let loaded = lib.load_level(&mut rng);
        assert_eq!(loaded.name, GENERATED_NAME);
        assert!(!loaded.map.is_blocked(PLAYER_SPAWN.0, PLAYER_SPAWN.1));
    }
}
