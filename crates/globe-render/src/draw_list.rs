//! Recorded draw commands.
//!
//! The engine emits a frame's draws into a [`DrawList`]; whoever owns the
//! render pass and pipeline reads the commands back in order.

use globe_geo::TileKey;
use globe_mesh::SplitCenter;

use crate::{GpuBufferHandle, RenderBackend, TextureHandle};

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    BeginTile {
        key: TileKey,
        origin: SplitCenter,
        blend: f32,
    },
    BindTexture {
        handle: TextureHandle,
        slot: u32,
    },
    DrawIndexed {
        vertices: GpuBufferHandle,
        indices: GpuBufferHandle,
        index_count: u32,
    },
    DrawStrip {
        vertices: GpuBufferHandle,
        vertex_count: u32,
    },
}

/// A [`RenderBackend`] that records commands for later replay.
#[derive(Clone, Debug, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Tiles begun, in draw order.
    #[must_use]
    pub fn tiles(&self) -> Vec<TileKey> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::BeginTile { key, .. } => Some(*key),
                _ => None,
            })
            .collect()
    }

    /// Number of draw calls (surface and skirt).
    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::DrawIndexed { .. } | DrawCommand::DrawStrip { .. }))
            .count()
    }

    /// Every buffer handle referenced by a draw.
    #[must_use]
    pub fn referenced_buffers(&self) -> Vec<GpuBufferHandle> {
        let mut out = Vec::new();
        for c in &self.commands {
            match c {
                DrawCommand::DrawIndexed {
                    vertices, indices, ..
                } => out.extend([*vertices, *indices]),
                DrawCommand::DrawStrip { vertices, .. } => out.push(*vertices),
                _ => {}
            }
        }
        out
    }
}

impl RenderBackend for DrawList {
    fn begin_tile(&mut self, key: TileKey, origin: SplitCenter, blend: f32) {
        self.commands.push(DrawCommand::BeginTile { key, origin, blend });
    }

    fn bind_texture(&mut self, handle: TextureHandle, slot: u32) {
        self.commands.push(DrawCommand::BindTexture { handle, slot });
    }

    fn draw_indexed(&mut self, vertices: GpuBufferHandle, indices: GpuBufferHandle, index_count: u32) {
        self.commands.push(DrawCommand::DrawIndexed {
            vertices,
            indices,
            index_count,
        });
    }

    fn draw_strip(&mut self, vertices: GpuBufferHandle, vertex_count: u32) {
        self.commands.push(DrawCommand::DrawStrip {
            vertices,
            vertex_count,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_tile(list: &mut DrawList, key: TileKey, base: u64) {
        list.begin_tile(key, SplitCenter::default(), 1.0);
        list.bind_texture(TextureHandle(base), 0);
        list.draw_indexed(GpuBufferHandle(base), GpuBufferHandle(base + 1), 9);
        list.draw_strip(GpuBufferHandle(base + 2), 16);
    }

    #[test]
    fn test_records_in_call_order() {
        let mut list = DrawList::new();
        record_tile(&mut list, TileKey::ROOT, 10);
        assert_eq!(list.commands().len(), 4);
        assert!(matches!(
            list.commands()[2],
            DrawCommand::DrawIndexed { index_count: 9, .. }
        ));
        assert_eq!(list.draw_count(), 2);
    }

    #[test]
    fn test_tiles_and_referenced_buffers() {
        let mut list = DrawList::new();
        let a = TileKey::new(1, 0, 0);
        let b = TileKey::new(1, 1, 0);
        record_tile(&mut list, a, 10);
        record_tile(&mut list, b, 20);
        assert_eq!(list.tiles(), vec![a, b]);
        let handles: Vec<u64> = list.referenced_buffers().iter().map(|h| h.0).collect();
        assert_eq!(handles, vec![10, 11, 12, 20, 21, 22]);
    }

    #[test]
    fn test_clear_empties_the_list() {
        let mut list = DrawList::new();
        record_tile(&mut list, TileKey::ROOT, 1);
        list.clear();
        assert!(list.commands().is_empty());
        assert_eq!(list.draw_count(), 0);
    }
}
