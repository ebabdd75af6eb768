//! Wait-for graph of singleton initializations

use super::{Error, resolver::ResolutionFrame};
use crate::{ServiceKey, graph::Cycle};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::Arc,
    thread::{self, ThreadId},
};

/// Identity of a singleton init lock, the address of its cell
pub(crate) type CellId = usize;

#[derive(Debug, Default)]
struct Waits {
    /// Init locks currently held, with the holding thread and the key being initialized
    owners: HashMap<CellId, (ThreadId, ServiceKey)>,
    /// Threads blocked on an init lock, with the frame of the key they wait for
    waiting: HashMap<ThreadId, (CellId, Arc<ResolutionFrame>)>,
}

/// Tracks which thread initializes which singleton and which thread waits for which.
///
/// Resolution chains on different threads can close a cycle that no single chain sees,
/// e.g. one thread initializing `A -> B` while another initializes `B -> A`.
/// Before blocking on a contended init lock a thread walks the graph; reaching itself
/// means it would never wake up, so it fails with [`Error::CycleDetected`] instead.
#[derive(Debug, Default)]
pub(crate) struct WaitGraph {
    waits: Mutex<Waits>,
}

/// Keeps an init lock registered as owned until dropped
pub(crate) struct OwnerGuard<'a> {
    graph: &'a WaitGraph,
    cell: CellId,
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        self.graph.waits.lock().owners.remove(&self.cell);
    }
}

/// Keeps the current thread registered as waiting until dropped
pub(crate) struct WaitGuard<'a> {
    graph: &'a WaitGraph,
    thread: ThreadId,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.graph.waits.lock().waiting.remove(&self.thread);
    }
}

impl WaitGraph {
    /// Records that the current thread holds the init lock of `cell` for `key`
    pub(crate) fn own(&self, cell: CellId, key: &ServiceKey) -> OwnerGuard<'_> {
        self.waits
            .lock()
            .owners
            .insert(cell, (thread::current().id(), key.clone()));
        OwnerGuard { graph: self, cell }
    }

    /// Records that the current thread is about to block on the init lock of `cell`.
    ///
    /// `frame` is the frame of the key being waited for. Fails if the holder of `cell`
    /// waits, directly or through other threads, for a lock held by the current thread.
    pub(crate) fn wait_for(&self, cell: CellId, frame: &Arc<ResolutionFrame>) -> Result<WaitGuard<'_>, Error> {
        let me = thread::current().id();
        let mut waits = self.waits.lock();

        if let Some(cycle) = waits.cycle_through(me, cell, frame) {
            tracing::debug!(key = %frame.key(), %cycle, "singleton initializations wait for each other");
            return Err(Error::CycleDetected(cycle));
        }

        waits.waiting.insert(me, (cell, frame.clone()));
        Ok(WaitGuard { graph: self, thread: me })
    }
}

impl Waits {
    fn cycle_through(&self, me: ThreadId, cell: CellId, frame: &ResolutionFrame) -> Option<Cycle> {
        let mut path: Vec<ServiceKey> = Vec::new();
        let mut cell = cell;

        // each step moves to another waiting thread, so the walk is bounded by their number
        for _ in 0..=self.waiting.len() {
            let (owner, owned_key) = self.owners.get(&cell)?;
            if *owner == me {
                extend(&mut path, segment(frame, owned_key));
                return Some(Cycle::new(path));
            }

            let (next, owner_frame) = self.waiting.get(owner)?;
            extend(&mut path, segment(owner_frame, owned_key));
            cell = *next;
        }
        None
    }
}

/// Keys of `frame`'s chain from `from` to the end, `from` first
fn segment(frame: &ResolutionFrame, from: &ServiceKey) -> Vec<ServiceKey> {
    let mut chain = frame.chain();
    match chain.iter().position(|key| key == from) {
        Some(start) => chain.split_off(start),
        None => {
            chain.insert(0, from.clone());
            chain
        }
    }
}

/// Appends `segment`, skipping its first key when it repeats the last one of `path`
fn extend(path: &mut Vec<ServiceKey>, segment: Vec<ServiceKey>) {
    let skip = usize::from(path.last().is_some_and(|last| segment.first() == Some(last)));
    path.extend(segment.into_iter().skip(skip));
}
