// src/loader/json_loader.rs
use crate::error::LoadError;
use crate::ir_map::*;
use crate::spatial::GID_MASK;
use macroquad::prelude::Rect;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

/// Tag a tile's collision object must carry (as `type` or `class`).
const COLLISION_TAG: &str = "collision";

/// Tiled writes `data` either as an id array or, with CSV encoding, as one string
/// that may contain newlines.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonLayerData {
    Gids(Vec<u32>),
    Csv(String),
}

impl Default for JsonLayerData {
    fn default() -> Self {
        JsonLayerData::Gids(Vec::new())
    }
}

#[derive(Deserialize)]
struct JsonLayer {
    #[serde(default)]
    data: JsonLayerData,
    #[serde(default)]
    width: usize,
    #[serde(default)]
    height: usize,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>, // "tilelayer" expected here
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    objects: Vec<JsonObject>,
}

#[derive(Deserialize)]
struct JsonMap {
    #[serde(default)]
    width: usize,
    #[serde(default)]
    height: usize,
    tilewidth: u32,
    tileheight: u32,
    layers: Vec<JsonLayer>,
    #[serde(default)]
    tilesets: Vec<JsonValue>,
}

#[derive(Deserialize)]
struct JsonTilesetRef {
    firstgid: u32,
    source: Option<String>,
}

#[derive(Deserialize)]
struct JsonTileset {
    #[serde(default)]
    name: String,
    tilewidth: u32,
    tileheight: u32,
    tilecount: u32,
    columns: u32,
    #[serde(default)]
    image: String,
    #[serde(default)]
    spacing: u32,
    #[serde(default)]
    margin: u32,
    #[serde(default)]
    tiles: Vec<JsonTile>,
}

#[derive(Deserialize)]
struct JsonObject {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    class: String,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
}

impl JsonObject {
    fn class_name(&self) -> &str {
        if !self.class.is_empty() {
            &self.class
        } else {
            &self.kind
        }
    }

    fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Deserialize, Default)]
struct JsonObjectGroup {
    #[serde(default)]
    objects: Vec<JsonObject>,
}

#[derive(Deserialize)]
struct JsonFrame {
    tileid: u32,
    /// Milliseconds
    duration: u32,
}

#[derive(Deserialize)]
struct JsonTile {
    id: u32,
    #[serde(default)]
    objectgroup: JsonObjectGroup,
    #[serde(default)]
    animation: Vec<JsonFrame>,
}

fn tile_to_ir(tile: JsonTile) -> IrTileMetadata {
    let collision = tile
        .objectgroup
        .objects
        .iter()
        .find(|o| o.class_name() == COLLISION_TAG)
        .map(JsonObject::rect);

    IrTileMetadata {
        id: tile.id,
        collision,
        animation: tile
            .animation
            .into_iter()
            .map(|f| IrFrame {
                tile_id: f.tileid,
                duration: f.duration as f32 / 1000.0,
            })
            .collect(),
    }
}

fn tileset_to_ir(ts: JsonTileset, first_gid: u32) -> IrTileset {
    IrTileset {
        name: ts.name,
        first_gid,
        image: ts.image,
        tile_w: ts.tilewidth,
        tile_h: ts.tileheight,
        tilecount: ts.tilecount,
        columns: ts.columns,
        spacing: ts.spacing,
        margin: ts.margin,
        tiles: ts.tiles.into_iter().map(tile_to_ir).collect(),
    }
}

/// `width * height`, or an error when the product does not fit in memory indexing.
pub(crate) fn layer_cell_count(layer: &str, width: usize, height: usize) -> Result<usize, LoadError> {
    width.checked_mul(height).ok_or_else(|| {
        LoadError::InvalidMap(format!(
            "Layer '{}' is too large: {}x{}",
            layer, width, height
        ))
    })
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode a standalone tileset document, assigning it `first_gid`.
pub fn decode_tileset_file(path: &Path, first_gid: u32) -> Result<IrTileset, LoadError> {
    let txt = read_file(path)?;
    let ts: JsonTileset = serde_json::from_str(&txt).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(tileset_to_ir(ts, first_gid))
}

fn parse_csv(layer: &str, csv: &str) -> Result<Vec<u32>, LoadError> {
    csv.split(',')
        .map(str::trim)
        .filter(|tok| !tok.is_empty())
        .map(|tok| {
            tok.parse::<u32>().map_err(|_| LoadError::InvalidTileData {
                layer: layer.to_owned(),
                token: tok.to_owned(),
            })
        })
        .collect()
}

fn decode_tilesets(
    refs: Vec<JsonValue>,
    map_dir: &Path,
    doc_path: &Path,
) -> Result<Vec<IrTileset>, LoadError> {
    let json_err = |source| LoadError::Json {
        path: doc_path.to_path_buf(),
        source,
    };

    let mut tilesets = Vec::with_capacity(refs.len());
    for value in refs {
        let r: JsonTilesetRef = serde_json::from_value(value.clone()).map_err(json_err)?;
        let ts = match r.source {
            Some(source) => {
                if !source.ends_with(".json") {
                    return Err(LoadError::InvalidMap(format!(
                        "External tileset must be JSON: {}",
                        source
                    )));
                }
                decode_tileset_file(&map_dir.join(&source), r.firstgid)?
            }
            None => {
                let embedded: JsonTileset = serde_json::from_value(value).map_err(json_err)?;
                tileset_to_ir(embedded, r.firstgid)
            }
        };
        tilesets.push(ts);
    }

    // Sort by first_gid so gid lookup is a single binary search
    sort_and_check_tilesets(&mut tilesets)?;

    Ok(tilesets)
}

fn spawn_from_object(obj: JsonObject) -> Result<IrSpawn, LoadError> {
    let kind = obj
        .class_name()
        .parse::<SpawnKind>()
        .map_err(|_| LoadError::UnknownSpawnType {
            object_id: obj.id,
            kind: obj.class_name().to_owned(),
        })?;
    Ok(IrSpawn {
        id: obj.id,
        kind,
        rect: obj.rect(),
        name: obj.name,
    })
}

/// Decode map JSON already in memory. External tilesets are resolved relative to `map_dir`.
pub fn decode_map_str(txt: &str, map_dir: &Path) -> Result<IrMap, LoadError> {
    decode_map(txt, map_dir, &map_dir.join("<memory>"))
}

/// Decode a `.json` map file. External tilesets are resolved next to it.
pub fn decode_map_file_to_ir(path: impl AsRef<Path>) -> Result<IrMap, LoadError> {
    let p = path.as_ref();
    if p.extension().and_then(|e| e.to_str()) != Some("json") {
        return Err(LoadError::InvalidMap(format!(
            "Map file must be a JSON file: {}",
            p.display()
        )));
    }

    let txt = read_file(p)?;
    let map_dir = p
        .parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./"));

    decode_map(&txt, &map_dir, p)
}

fn decode_map(txt: &str, map_dir: &Path, doc_path: &Path) -> Result<IrMap, LoadError> {
    let j: JsonMap = serde_json::from_str(txt).map_err(|source| LoadError::Json {
        path: doc_path.to_path_buf(),
        source,
    })?;

    if j.tilewidth == 0 || j.tileheight == 0 {
        return Err(LoadError::InvalidMap("tile size must be non-zero".into()));
    }

    let tilesets = decode_tilesets(j.tilesets, map_dir, doc_path)?;
    let max_gid = tilesets
        .last()
        .and_then(IrTileset::gid_end)
        .map_or(0, |end| end.saturating_sub(1));

    let mut width = j.width;
    let mut height = j.height;

    let mut layers = Vec::with_capacity(j.layers.len());
    let mut spawns = Vec::new();
    for l in j.layers {
        match l.kind.as_deref().unwrap_or("tilelayer") {
            "tilelayer" => {
                if let Some(enc) = l.encoding.as_deref().filter(|e| *e != "csv") {
                    return Err(LoadError::InvalidMap(format!(
                        "Layer '{}' uses unsupported encoding '{}'",
                        l.name, enc
                    )));
                }
                let data = match l.data {
                    JsonLayerData::Gids(gids) => gids,
                    JsonLayerData::Csv(csv) => parse_csv(&l.name, &csv)?,
                };

                if width == 0 && height == 0 {
                    width = l.width;
                    height = l.height;
                }
                if l.width != width || l.height != height {
                    return Err(LoadError::InvalidMap(format!(
                        "Layer '{}' is {}x{} but the map is {}x{}",
                        l.name, l.width, l.height, width, height
                    )));
                }
                let expected = layer_cell_count(&l.name, l.width, l.height)?;
                if data.len() != expected {
                    return Err(LoadError::InvalidLayerSize {
                        layer: l.name,
                        expected,
                        found: data.len(),
                    });
                }
                for &raw_gid in &data {
                    let gid = raw_gid & GID_MASK;
                    if gid != 0 && gid > max_gid {
                        return Err(LoadError::InvalidTileGid {
                            layer: l.name.clone(),
                            gid,
                            max_gid,
                        });
                    }
                }

                layers.push(IrLayer {
                    name: l.name,
                    width: l.width,
                    height: l.height,
                    data,
                });
            }
            "objectgroup" => {
                for obj in l.objects {
                    spawns.push(spawn_from_object(obj)?);
                }
            }
            other => {
                log::warn!("[MapLoad] skipping layer '{}' of type '{}'", l.name, other);
            }
        }
    }

    if layers.is_empty() {
        return Err(LoadError::InvalidMap("map has no tile layers".into()));
    }

    Ok(IrMap {
        width,
        height,
        tile_w: j.tilewidth,
        tile_h: j.tileheight,
        tilesets,
        layers,
        spawns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock went backwards")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "tile_skirmish_loader_{}_{nanos}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir
    }

    const TILESET_JSON: &str = r#"{
      "name":"walls",
      "tilewidth":16,
      "tileheight":16,
      "tilecount":4,
      "columns":2,
      "image":"walls.png",
      "tiles":[
        {
          "id":1,
          "objectgroup":{"objects":[
            {"id":1,"type":"decor","x":0,"y":0,"width":4,"height":4},
            {"id":2,"type":"collision","x":-1,"y":0,"width":17,"height":16}
          ]}
        },
        {
          "id":2,
          "animation":[{"tileid":2,"duration":150},{"tileid":3,"duration":250}]
        }
      ]
    }"#;

    fn write_map(dir: &Path, map_json: &str) -> PathBuf {
        let map_path = dir.join("map.json");
        fs::write(&map_path, map_json).expect("failed to write map");
        fs::write(dir.join("walls.json"), TILESET_JSON).expect("failed to write tileset");
        map_path
    }

    #[test]
    fn parses_csv_data_with_embedded_newlines() {
        let dir = temp_dir();
        let map_path = write_map(
            &dir,
            r#"{
              "width":3, "height":2, "tilewidth":16, "tileheight":16,
              "layers":[{"type":"tilelayer","name":"ground","width":3,"height":2,
                         "encoding":"csv","data":"1,2,0,\n0,4,\n3"}],
              "tilesets":[{"firstgid":1,"source":"walls.json"}]
            }"#,
        );

        let ir = decode_map_file_to_ir(&map_path).expect("decode");
        assert_eq!(ir.layers[0].data, vec![1, 2, 0, 0, 4, 3]);
    }

    #[test]
    fn reads_collision_and_animation_metadata() {
        let dir = temp_dir();
        let map_path = write_map(
            &dir,
            r#"{
              "width":1, "height":1, "tilewidth":16, "tileheight":16,
              "layers":[{"type":"tilelayer","name":"ground","width":1,"height":1,"data":[2]}],
              "tilesets":[{"firstgid":1,"source":"walls.json"}]
            }"#,
        );

        let ir = decode_map_file_to_ir(&map_path).expect("decode");
        let tiles = &ir.tilesets[0].tiles;
        assert_eq!(tiles[0].collision, Some(Rect::new(-1.0, 0.0, 17.0, 16.0)));
        assert!(tiles[1].collision.is_none());
        assert_eq!(tiles[1].animation.len(), 2);
        assert!((tiles[1].animation[0].duration - 0.15).abs() < 1e-6);
        assert!((tiles[1].animation[1].duration - 0.25).abs() < 1e-6);
    }

    #[test]
    fn reads_spawn_objects() {
        let dir = temp_dir();
        let map_path = write_map(
            &dir,
            r#"{
              "width":2, "height":1, "tilewidth":16, "tileheight":16,
              "layers":[
                {"type":"tilelayer","name":"ground","width":2,"height":1,"data":[0,0]},
                {"type":"objectgroup","name":"spawns","objects":[
                  {"id":3,"name":"hero","type":"PlayerSpawn","x":4,"y":2,"width":8,"height":8},
                  {"id":4,"class":"SlimeSpawn","x":20,"y":0,"width":8,"height":8}
                ]}
              ],
              "tilesets":[{"firstgid":1,"source":"walls.json"}]
            }"#,
        );

        let ir = decode_map_file_to_ir(&map_path).expect("decode");
        assert_eq!(ir.spawns.len(), 2);
        assert_eq!(ir.spawns[0].kind, SpawnKind::Player);
        assert_eq!(ir.spawns[0].rect, Rect::new(4.0, 2.0, 8.0, 8.0));
        assert_eq!(ir.spawns[1].kind, SpawnKind::Slime);
    }

    #[test]
    fn rejects_unknown_spawn_type() {
        let dir = temp_dir();
        let map_path = write_map(
            &dir,
            r#"{
              "width":1, "height":1, "tilewidth":16, "tileheight":16,
              "layers":[
                {"type":"tilelayer","name":"ground","width":1,"height":1,"data":[0]},
                {"type":"objectgroup","name":"spawns","objects":[{"id":9,"type":"DragonSpawn"}]}
              ],
              "tilesets":[{"firstgid":1,"source":"walls.json"}]
            }"#,
        );

        let err = decode_map_file_to_ir(&map_path)
            .err()
            .expect("expected decode error");
        assert!(
            matches!(err, LoadError::UnknownSpawnType { object_id: 9, ref kind } if kind == "DragonSpawn")
        );
    }

    #[test]
    fn rejects_overlapping_tileset_ranges() {
        let dir = temp_dir();
        let map_path = write_map(
            &dir,
            r#"{
              "width":1, "height":1, "tilewidth":16, "tileheight":16,
              "layers":[{"type":"tilelayer","name":"ground","width":1,"height":1,"data":[0]}],
              "tilesets":[
                {"firstgid":3,"name":"inline","tilewidth":16,"tileheight":16,"tilecount":2,"columns":2,"image":"x.png"},
                {"firstgid":1,"source":"walls.json"}
              ]
            }"#,
        );

        let err = decode_map_file_to_ir(&map_path)
            .err()
            .expect("expected decode error");
        assert!(matches!(err, LoadError::OverlappingTilesets { gid: 3, .. }));
    }

    #[test]
    fn accepts_embedded_tilesets_and_sorts_by_first_gid() {
        let dir = temp_dir();
        let map_path = write_map(
            &dir,
            r#"{
              "width":1, "height":1, "tilewidth":16, "tileheight":16,
              "layers":[{"type":"tilelayer","name":"ground","width":1,"height":1,"data":[6]}],
              "tilesets":[
                {"firstgid":5,"name":"inline","tilewidth":16,"tileheight":16,"tilecount":2,"columns":2,"image":"x.png"},
                {"firstgid":1,"source":"walls.json"}
              ]
            }"#,
        );

        let ir = decode_map_file_to_ir(&map_path).expect("decode");
        let firsts: Vec<u32> = ir.tilesets.iter().map(|t| t.first_gid).collect();
        assert_eq!(firsts, vec![1, 5]);
        assert_eq!(ir.tilesets[1].name, "inline");
    }

    #[test]
    fn returns_typed_error_for_malformed_json() {
        let dir = temp_dir();
        let map_path = dir.join("map.json");
        fs::write(&map_path, "{ not json").expect("failed to write map");

        let err = decode_map_file_to_ir(&map_path)
            .err()
            .expect("expected decode error");
        assert!(matches!(err, LoadError::Json { .. }));
    }

    #[test]
    fn returns_typed_error_for_missing_tileset_file() {
        let dir = temp_dir();
        let map_path = dir.join("map.json");
        let map_json = r#"{
          "tilewidth": 16,
          "tileheight": 16,
          "layers": [],
          "tilesets":[{"firstgid":1,"source":"missing_tileset.json"}]
        }"#;
        fs::write(&map_path, map_json).expect("failed to write map");

        let err = decode_map_file_to_ir(&map_path)
            .err()
            .expect("expected decode error");
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn returns_typed_error_for_invalid_gid_reference() {
        let dir = temp_dir();
        let map_path = write_map(
            &dir,
            r#"{
              "width":1, "height":1, "tilewidth":16, "tileheight":16,
              "layers":[{"type":"tilelayer","name":"ground","width":1,"height":1,"data":[99]}],
              "tilesets":[{"firstgid":1,"source":"walls.json"}]
            }"#,
        );

        let err = decode_map_file_to_ir(&map_path)
            .err()
            .expect("expected decode error");
        assert!(matches!(err, LoadError::InvalidTileGid { gid: 99, max_gid: 4, .. }));
    }

    #[test]
    fn returns_typed_error_for_layer_size_mismatch() {
        let dir = temp_dir();
        let map_path = write_map(
            &dir,
            r#"{
              "width":2, "height":2, "tilewidth":16, "tileheight":16,
              "layers":[{"type":"tilelayer","name":"oops","width":2,"height":2,"data":[1,2,3]}],
              "tilesets":[{"firstgid":1,"source":"walls.json"}]
            }"#,
        );

        let err = decode_map_file_to_ir(&map_path)
            .err()
            .expect("expected decode error");
        assert!(
            matches!(err, LoadError::InvalidLayerSize { ref layer, expected: 4, found: 3 } if layer == "oops")
        );
    }

    #[test]
    fn returns_typed_error_for_bad_csv_token() {
        let dir = temp_dir();
        let map_path = write_map(
            &dir,
            r#"{
              "width":2, "height":1, "tilewidth":16, "tileheight":16,
              "layers":[{"type":"tilelayer","name":"ground","width":2,"height":1,"data":"1,x"}],
              "tilesets":[{"firstgid":1,"source":"walls.json"}]
            }"#,
        );

        let err = decode_map_file_to_ir(&map_path)
            .err()
            .expect("expected decode error");
        assert!(matches!(err, LoadError::InvalidTileData { ref token, .. } if token == "x"));
    }

    #[test]
    fn rejects_non_json_extension() {
        let err = decode_map_file_to_ir("level.tmx")
            .err()
            .expect("expected decode error");
        assert!(matches!(err, LoadError::InvalidMap(_)));
    }

    #[test]
    fn rejects_tileset_ranges_past_the_gid_space() {
        let dir = temp_dir();
        for (first_gid, tilecount) in [(4294967290u64, 10u64), (536870911, 2), (1, 4294967295)] {
            let json = format!(
                r#"{{
                  "width":1, "height":1, "tilewidth":16, "tileheight":16,
                  "layers":[{{"type":"tilelayer","name":"ground","width":1,"height":1,"data":[0]}}],
                  "tilesets":[{{"firstgid":{first_gid},"name":"huge","tilewidth":16,"tileheight":16,
                                "tilecount":{tilecount},"columns":1,"image":"x.png"}}]
                }}"#
            );
            let err = decode_map_str(&json, &dir)
                .err()
                .expect("expected decode error");
            assert!(
                matches!(err, LoadError::InvalidMap(ref msg) if msg.contains("huge")),
                "firstgid {first_gid}, tilecount {tilecount}: {err:?}"
            );
        }
    }

    #[test]
    fn accepts_a_tileset_ending_on_the_last_gid() {
        let dir = temp_dir();
        let ir = decode_map_str(
            r#"{
              "width":1, "height":1, "tilewidth":16, "tileheight":16,
              "layers":[{"type":"tilelayer","name":"ground","width":1,"height":1,"data":[536870911]}],
              "tilesets":[{"firstgid":536870910,"name":"top","tilewidth":16,"tileheight":16,
                           "tilecount":2,"columns":2,"image":"x.png"}]
            }"#,
            &dir,
        )
        .expect("decode");
        assert_eq!(ir.tilesets[0].gid_end(), Some(536870912));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn rejects_layer_dimensions_that_overflow() {
        let dir = temp_dir();
        let err = decode_map_str(
            r#"{
              "width":18446744073709551615, "height":2, "tilewidth":16, "tileheight":16,
              "layers":[{"type":"tilelayer","name":"ground",
                         "width":18446744073709551615,"height":2,"data":[0]}]
            }"#,
            &dir,
        )
        .err()
        .expect("expected decode error");
        assert!(matches!(err, LoadError::InvalidMap(ref msg) if msg.contains("ground")), "{err:?}");
    }
}
