use std::path::PathBuf;
use std::{error, fmt, io};

/// Error type for map, tileset and config loading.
#[derive(Debug)]
pub enum LoadError {
    /// File I/O error
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// JSON parse error
    Json {
        /// Document that failed to parse
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
    /// Structurally valid JSON that does not describe a usable map
    InvalidMap(String),
    /// A layer's data length does not match width * height
    InvalidLayerSize {
        /// Layer name
        layer: String,
        /// width * height
        expected: usize,
        /// Number of ids present
        found: usize,
    },
    /// A CSV tile-id token that is not an unsigned integer
    InvalidTileData {
        /// Layer name
        layer: String,
        /// The offending token
        token: String,
    },
    /// A layer references a gid that no tileset covers
    InvalidTileGid {
        /// Layer name
        layer: String,
        /// The gid, flip flags removed
        gid: u32,
        /// Last gid covered by any tileset
        max_gid: u32,
    },
    /// Two tilesets claim the same gid range
    OverlappingTilesets {
        /// Tileset with the lower firstgid
        first: String,
        /// Tileset whose firstgid falls inside `first`'s range
        second: String,
        /// `second`'s firstgid
        gid: u32,
    },
    /// Spawn object with a type this game does not know
    UnknownSpawnType {
        /// Tiled object id
        object_id: u32,
        /// Its `type`/`class`
        kind: String,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io { path, source } => {
                write!(f, "I/O error reading {}: {}", path.display(), source)
            }
            LoadError::Json { path, source } => {
                write!(f, "Failed to parse JSON {}: {}", path.display(), source)
            }
            LoadError::InvalidMap(msg) => write!(f, "Invalid map: {}", msg),
            LoadError::InvalidLayerSize {
                layer,
                expected,
                found,
            } => write!(
                f,
                "Invalid layer size for layer '{}': expected {} tiles, found {}",
                layer, expected, found
            ),
            LoadError::InvalidTileData { layer, token } => {
                write!(f, "Invalid tile id '{}' in layer '{}'", token, layer)
            }
            LoadError::InvalidTileGid {
                layer,
                gid,
                max_gid,
            } => write!(
                f,
                "Layer '{}' references gid {} but tilesets end at {}",
                layer, gid, max_gid
            ),
            LoadError::OverlappingTilesets { first, second, gid } => write!(
                f,
                "Tilesets '{}' and '{}' overlap at gid {}",
                first, second, gid
            ),
            LoadError::UnknownSpawnType { object_id, kind } => {
                write!(f, "Object {} has unknown spawn type '{}'", object_id, kind)
            }
        }
    }
}

impl error::Error for LoadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}
