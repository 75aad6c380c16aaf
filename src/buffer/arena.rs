//! Fixed-capacity block arena with index-addressed cells.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io::Read;
use std::ops::Deref;
use std::sync::Arc;

use crate::error::SigError;

/// A fixed set of reusable block buffers.
///
/// Cells are allocated once in [`BlockArena::new`] and never grown or
/// shrunk. A block index maps to a cell between a successful
/// [`try_fill`](BlockArena::try_fill) and its [`release`](BlockArena::release).
///
/// The arena holds no lock of its own. Callers that share it across threads
/// must guard `try_fill`, `release` and `available` with the same lock.
///
/// # Example
///
/// ```
/// use blocksig::BlockArena;
/// use std::io::Cursor;
///
/// let mut arena = BlockArena::new(2, 4)?;
/// let mut input = Cursor::new(b"abcdefgh".to_vec());
///
/// assert!(arena.try_fill(0, &mut input)?);
/// assert!(arena.try_fill(1, &mut input)?);
/// assert!(!arena.try_fill(2, &mut input)?);
///
/// assert_eq!(&*arena.view(1)?, b"efgh");
/// arena.release(0)?;
/// assert_eq!(arena.available(), 1);
/// # Ok::<(), blocksig::SigError>(())
/// ```
pub struct BlockArena {
    cells: Vec<Arc<Vec<u8>>>,
    block_size: usize,
    mapped: HashMap<u64, usize>,
    free: VecDeque<usize>,
}

impl BlockArena {
    /// Allocates `capacity` cells of `block_size` bytes, all free.
    pub fn new(capacity: usize, block_size: usize) -> Result<Self, SigError> {
        if capacity == 0 {
            return Err(SigError::InvalidConfig {
                message: "arena capacity must be at least 1",
            });
        }
        if block_size == 0 {
            return Err(SigError::InvalidConfig {
                message: "block size must be non-zero",
            });
        }

        Ok(Self {
            cells: (0..capacity).map(|_| Arc::new(vec![0u8; block_size])).collect(),
            block_size,
            mapped: HashMap::with_capacity(capacity),
            free: (0..capacity).collect(),
        })
    }

    /// Reads the next `block_size` bytes of `source` into a free cell.
    ///
    /// Returns `Ok(false)` without touching `source` when every cell is in
    /// use. On a read failure the cell goes back to the free set.
    pub fn try_fill<R: Read + ?Sized>(
        &mut self,
        index: u64,
        source: &mut R,
    ) -> Result<bool, SigError> {
        if self.mapped.contains_key(&index) {
            return Err(SigError::StorageOverflow { index });
        }
        let Some(cell) = self.free.pop_front() else {
            return Ok(false);
        };

        // A view from the previous occupant is still alive somewhere.
        let Some(buf) = Arc::get_mut(&mut self.cells[cell]) else {
            self.free.push_front(cell);
            return Err(SigError::StorageOverflow { index });
        };

        if let Err(e) = source.read_exact(buf) {
            self.free.push_front(cell);
            return Err(SigError::Read(e));
        }

        self.mapped.insert(index, cell);
        Ok(true)
    }

    /// Returns a read-only view of a mapped block.
    pub fn view(&self, index: u64) -> Result<BlockView, SigError> {
        let cell = self
            .mapped
            .get(&index)
            .ok_or(SigError::UnknownBlock { index })?;
        Ok(BlockView {
            data: Arc::clone(&self.cells[*cell]),
        })
    }

    /// Unmaps `index` and returns its cell to the free set.
    pub fn release(&mut self, index: u64) -> Result<(), SigError> {
        let cell = self
            .mapped
            .remove(&index)
            .ok_or(SigError::UnknownBlock { index })?;
        self.free.push_back(cell);
        Ok(())
    }

    /// Returns the number of free cells.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Returns the number of cells holding a block.
    pub fn mapped(&self) -> usize {
        self.mapped.len()
    }

    /// Returns the total number of cells.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Returns the size of every cell in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns true if `index` currently occupies a cell.
    pub fn contains(&self, index: u64) -> bool {
        self.mapped.contains_key(&index)
    }
}

impl fmt::Debug for BlockArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockArena")
            .field("capacity", &self.capacity())
            .field("block_size", &self.block_size)
            .field("available", &self.available())
            .field("mapped", &self.mapped())
            .finish()
    }
}

/// Shared read-only bytes of a block held by a [`BlockArena`].
///
/// The cell cannot be refilled while a view of it is alive, so views must
/// be dropped before the block is released.
#[derive(Clone)]
pub struct BlockView {
    data: Arc<Vec<u8>>,
}

impl Deref for BlockView {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl AsRef<[u8]> for BlockView {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for BlockView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockView({} bytes)", self.data.len())
    }
}
