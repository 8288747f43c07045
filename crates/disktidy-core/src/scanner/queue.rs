/// Shared FIFO of pending directories.
///
/// Every worker is both a consumer (it lists one directory at a time) and a
/// producer (it pushes each subdirectory it finds). Because the total number
/// of directories is unknown up front, completion is detected with an
/// **outstanding-task counter**: incremented on push, decremented when a
/// worker finishes a task. Children are always pushed before their parent's
/// task completes, so the counter can only reach zero once the whole tree
/// has been listed. At that moment the queue fires its drained signal.
///
/// Shutdown is a broadcast: [`ScanQueue::close`] drops the only sender of a
/// dedicated shutdown channel, which disconnects every worker's receiver at
/// once. No sentinel value ever travels through the task channel.
use crate::model::DirectoryTask;
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What a worker got when it asked for work.
#[derive(Debug, PartialEq, Eq)]
pub enum Pop {
    /// A directory to list. The worker must call [`ScanQueue::task_done`]
    /// once it has finished with it.
    Task(DirectoryTask),
    /// Nothing arrived within the timeout; poll cancellation and retry.
    Idle,
    /// The queue has been closed; the worker should exit.
    Closed,
}

pub struct ScanQueue {
    task_tx: Sender<DirectoryTask>,
    task_rx: Receiver<DirectoryTask>,
    /// Outstanding = pushed and not yet completed.
    outstanding: AtomicUsize,
    drained_tx: Sender<()>,
    drained_rx: Receiver<()>,
    /// Held until `close`; dropping it is the broadcast.
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,
}

impl Default for ScanQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanQueue {
    pub fn new() -> Self {
        let (task_tx, task_rx) = unbounded();
        let (drained_tx, drained_rx) = bounded(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        Self {
            task_tx,
            task_rx,
            outstanding: AtomicUsize::new(0),
            drained_tx,
            drained_rx,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shutdown_rx,
        }
    }

    /// Enqueue a directory. Counted as outstanding immediately.
    pub fn push(&self, task: DirectoryTask) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if self.task_tx.send(task).is_err() {
            // Unreachable while `self` owns the receiver; keep the count honest.
            self.task_done();
        }
    }

    /// Wait up to `timeout` for a task, returning early if the queue closes.
    pub fn pop(&self, timeout: Duration) -> Pop {
        select! {
            recv(self.task_rx) -> task => match task {
                Ok(task) => Pop::Task(task),
                Err(_) => Pop::Closed,
            },
            recv(self.shutdown_rx) -> _ => Pop::Closed,
            default(timeout) => Pop::Idle,
        }
    }

    /// Mark one previously popped task as finished.
    pub fn task_done(&self) {
        let previous = self.outstanding.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "task_done called more often than push");
        if previous == 1 {
            let _ = self.drained_tx.try_send(());
        }
    }

    /// Number of tasks pushed and not yet completed.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    pub fn is_drained(&self) -> bool {
        self.outstanding() == 0
    }

    /// Block up to `timeout` for the drained signal.
    ///
    /// Returns `true` once every pushed task has completed.
    pub fn wait_drained(&self, timeout: Duration) -> bool {
        if self.is_drained() {
            return true;
        }
        match self.drained_rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(_) => self.is_drained(),
        }
    }

    /// Wake every waiting worker and make all further pops return `Closed`.
    pub fn close(&self) {
        self.shutdown_tx.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown_tx.lock().is_none()
    }
}
