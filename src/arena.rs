use crate::value::{Object, Value};

const DEFAULT_BLOCK_OBJECTS: usize = 4096;

/// Append-only arena for [`Object`]s. Allocation bumps a cursor in the newest
/// block; when that block is full a fresh one is linked ahead of it. Objects
/// never move and are never freed individually, so a [`Value`] handle stays
/// valid until the arena drops as one chain at teardown.
pub struct Arena {
    block_objects: usize,
    blocks: Vec<Vec<Object>>,
    len: usize,
}

impl Arena {
    pub fn new() -> Self {
        Self::with_block_objects(DEFAULT_BLOCK_OBJECTS)
    }

    pub fn with_block_objects(block_objects: usize) -> Self {
        assert!(block_objects > 0);
        Self {
            block_objects,
            blocks: vec![Vec::with_capacity(block_objects)],
            len: 0,
        }
    }

    /// Number of live objects. Monotonically increasing.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn alloc(&mut self, object: Object) -> Value {
        debug_assert!(self.len < u32::MAX as usize, "arena handle space exhausted");
        if self
            .blocks
            .last()
            .map(|block| block.len() == self.block_objects)
            .unwrap_or(true)
        {
            self.blocks.push(Vec::with_capacity(self.block_objects));
        }
        let newest = self.blocks.len() - 1;
        self.blocks[newest].push(object);
        let handle = Value(self.len as u32);
        self.len += 1;
        handle
    }

    pub fn get(&self, handle: Value) -> &Object {
        let index = handle.index();
        &self.blocks[index / self.block_objects][index % self.block_objects]
    }

    pub fn get_mut(&mut self, handle: Value) -> &mut Object {
        let index = handle.index();
        &mut self.blocks[index / self.block_objects][index % self.block_objects]
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}
