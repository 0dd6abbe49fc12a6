use crate::ir_map::IrLayer;
use crate::spatial::TileCoord;

/// One grid of global tile ids, row-major. 0 means no tile.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Layer name
    pub name: String,
    /// Width in cells
    pub width: usize,
    /// Height in cells
    pub height: usize,
    /// Row-major raw gids
    pub data: Vec<u32>,
}

impl Layer {
    /// Build from its intermediate form.
    pub fn from_ir(ir: IrLayer) -> Self {
        Layer {
            name: ir.name,
            width: ir.width,
            height: ir.height,
            data: ir.data,
        }
    }

    /// Raw gid stored at `cell`, flip flags included. `None` when off-grid.
    #[inline]
    pub fn gid_at(&self, cell: TileCoord) -> Option<u32> {
        if cell.x < 0 || cell.y < 0 {
            return None;
        }
        let (x, y) = (cell.x as usize, cell.y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }
}
