//! State shared by the intake loop and the writer thread.
//!
//! Two locks, never held together:
//! - `storage` guards the arena; `cell_freed` wakes intake after a release.
//! - `pending` guards the index -> handle map; `result_ready` wakes the
//!   writer after a submit.
//!
//! Either side can abort the run, which wakes the other one.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use parking_lot::{Condvar, Mutex};

use crate::buffer::{BlockArena, BlockView};
use crate::error::SigError;
use crate::pool::JobHandle;

struct Storage {
    arena: BlockArena,
    aborted: bool,
}

struct Pending {
    handles: BTreeMap<u64, JobHandle>,
    aborted: bool,
}

pub(crate) struct RunState {
    storage: Mutex<Storage>,
    cell_freed: Condvar,
    pending: Mutex<Pending>,
    result_ready: Condvar,
}

impl RunState {
    pub(crate) fn new(arena: BlockArena) -> Self {
        Self {
            storage: Mutex::new(Storage {
                arena,
                aborted: false,
            }),
            cell_freed: Condvar::new(),
            pending: Mutex::new(Pending {
                handles: BTreeMap::new(),
                aborted: false,
            }),
            result_ready: Condvar::new(),
        }
    }

    /// Waits for a free cell and reads block `index` into it.
    ///
    /// Returns `Ok(None)` if the run was aborted while waiting.
    pub(crate) fn fill<R: Read + ?Sized>(
        &self,
        index: u64,
        source: &mut R,
    ) -> Result<Option<BlockView>, SigError> {
        let mut storage = self.storage.lock();
        while storage.arena.available() == 0 && !storage.aborted {
            self.cell_freed.wait(&mut storage);
        }
        if storage.aborted {
            return Ok(None);
        }

        if !storage.arena.try_fill(index, source)? {
            return Err(SigError::StorageOverflow { index });
        }
        debug_assert_eq!(
            storage.arena.available() + storage.arena.mapped(),
            storage.arena.capacity()
        );
        storage.arena.view(index).map(Some)
    }

    /// Hands the handle for block `index` to the writer.
    pub(crate) fn publish(&self, index: u64, handle: JobHandle) {
        self.pending.lock().handles.insert(index, handle);
        self.result_ready.notify_one();
    }

    /// Waits until block `index` has been published and removes it.
    ///
    /// Returns `None` if the run was aborted.
    fn take(&self, index: u64) -> Option<JobHandle> {
        let mut pending = self.pending.lock();
        loop {
            if pending.aborted {
                return None;
            }
            if let Some(handle) = pending.handles.remove(&index) {
                return Some(handle);
            }
            self.result_ready.wait(&mut pending);
        }
    }

    fn release(&self, index: u64) -> Result<(), SigError> {
        self.storage.lock().arena.release(index)?;
        self.cell_freed.notify_one();
        Ok(())
    }

    /// Writes the results of blocks `0..blocks` to `out` in index order.
    ///
    /// Returns the number of bytes written. Stops early without error if the
    /// intake side aborted.
    pub(crate) fn drain<W: Write + ?Sized>(
        &self,
        blocks: u64,
        out: &mut W,
    ) -> Result<u64, SigError> {
        let mut written = 0u64;
        for index in 0..blocks {
            let Some(handle) = self.take(index) else {
                tracing::debug!(index, "writer stopping, intake aborted");
                return Ok(written);
            };

            let digest = handle
                .wait()
                .map_err(|source| SigError::Processing { index, source })?;
            self.release(index)?;

            out.write_all(&digest).map_err(SigError::Write)?;
            written += digest.len() as u64;
            tracing::debug!(index, len = digest.len(), "block written");
        }
        Ok(written)
    }

    /// Marks the run failed and wakes both sides.
    pub(crate) fn abort(&self) {
        self.storage.lock().aborted = true;
        self.cell_freed.notify_all();
        self.pending.lock().aborted = true;
        self.result_ready.notify_all();
    }

    /// Returns `(available, mapped, capacity)` of the arena.
    #[cfg(test)]
    pub(crate) fn arena_counts(&self) -> (usize, usize, usize) {
        let storage = self.storage.lock();
        (
            storage.arena.available(),
            storage.arena.mapped(),
            storage.arena.capacity(),
        )
    }
}
