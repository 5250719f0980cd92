use crate::params::Dimensions;

/// Physical identity of one of the two feedback buffers.
///
/// Identity never changes for the lifetime of a session; the *role* a slot
/// plays (current vs next) flips on every [`DualSurface::swap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferSlot {
    A,
    B,
}

impl BufferSlot {
    pub fn other(self) -> Self {
        match self {
            BufferSlot::A => BufferSlot::B,
            BufferSlot::B => BufferSlot::A,
        }
    }

    fn index(self) -> usize {
        match self {
            BufferSlot::A => 0,
            BufferSlot::B => 1,
        }
    }
}

impl std::fmt::Display for BufferSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferSlot::A => f.write_str("A"),
            BufferSlot::B => f.write_str("B"),
        }
    }
}

/// Owns the two equally sized feedback buffers and tracks which one is read.
///
/// `current()` is the input of the next compute pass and `next()` its output.
/// Swapping only flips the role index; buffer contents are never copied.
pub struct DualSurface<B> {
    buffers: [B; 2],
    current: BufferSlot,
    dimensions: Dimensions,
}

impl<B> DualSurface<B> {
    /// Wraps an already allocated pair. `a` starts out as the current buffer.
    pub fn new(a: B, b: B, dimensions: Dimensions) -> Self {
        Self {
            buffers: [a, b],
            current: BufferSlot::A,
            dimensions,
        }
    }

    /// Allocates both buffers through `allocate`, failing the whole pair if
    /// either allocation fails.
    pub fn allocate<E, F>(dimensions: Dimensions, mut allocate: F) -> Result<Self, E>
    where
        F: FnMut(BufferSlot, Dimensions) -> Result<B, E>,
    {
        let a = allocate(BufferSlot::A, dimensions)?;
        let b = allocate(BufferSlot::B, dimensions)?;
        Ok(Self::new(a, b, dimensions))
    }

    pub fn current(&self) -> &B {
        &self.buffers[self.current.index()]
    }

    pub fn next(&self) -> &B {
        &self.buffers[self.current.other().index()]
    }

    pub fn current_slot(&self) -> BufferSlot {
        self.current
    }

    pub fn next_slot(&self) -> BufferSlot {
        self.current.other()
    }

    pub fn get(&self, slot: BufferSlot) -> &B {
        &self.buffers[slot.index()]
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn swap(&mut self) {
        self.current = self.current.other();
    }
}
