// tests/common/mod.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "tile_skirmish_{tag}_{}_{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

/// gid 1 floor, gid 2 solid wall, gids 3-4 a two-frame water animation.
pub const TILESET_JSON: &str = r#"{
  "name": "dungeon",
  "tilewidth": 16,
  "tileheight": 16,
  "tilecount": 4,
  "columns": 2,
  "image": "dungeon.png",
  "tiles": [
    {
      "id": 1,
      "objectgroup": {"objects": [
        {"id": 1, "type": "collision", "x": 0, "y": 0, "width": 16, "height": 16}
      ]}
    },
    {
      "id": 2,
      "animation": [{"tileid": 2, "duration": 200}, {"tileid": 3, "duration": 200}]
    }
  ]
}"#;

/// 10x6 map with a wall column at x = 4, a player at (16, 32) and a slime
/// far enough away to stay idle.
pub const MAP_JSON: &str = r#"{
  "width": 10,
  "height": 6,
  "tilewidth": 16,
  "tileheight": 16,
  "tilesets": [{"firstgid": 1, "source": "dungeon.json"}],
  "layers": [
    {
      "name": "ground",
      "type": "tilelayer",
      "width": 10,
      "height": 6,
      "encoding": "csv",
      "data": "1,1,1,1,2,1,1,1,1,1,\n1,1,1,1,2,1,1,1,1,1,\n1,1,1,1,2,1,1,1,1,1,\n1,1,1,1,2,1,1,1,1,3,\n1,1,1,1,2,1,1,1,1,1,\n1,1,1,1,2,1,1,1,1,1"
    },
    {
      "name": "spawns",
      "type": "objectgroup",
      "objects": [
        {"id": 7, "name": "hero", "type": "PlayerSpawn", "x": 16, "y": 32, "width": 16, "height": 16},
        {"id": 8, "name": "", "class": "SlimeSpawn", "x": 144, "y": 64, "width": 16, "height": 16}
      ]
    }
  ]
}"#;

pub fn write_fixture(dir: &Path, map_json: &str) -> PathBuf {
    fs::write(dir.join("dungeon.json"), TILESET_JSON).expect("write tileset");
    let map_path = dir.join("map.json");
    fs::write(&map_path, map_json).expect("write map");
    map_path
}
