//! Bounded hand-off of PCM frames from the capture side to the transport.
//!
//! The capture side runs at hardware cadence and must never wait, so the
//! queue drops its oldest frame when full: stale realtime audio is worth
//! less than the newest frame. Drops are counted on the sink.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

struct Shared {
    queue: Mutex<Queue>,
    notify: Notify,
    capacity: usize,
    pushed: AtomicU64,
    dropped: AtomicU64,
}

struct Queue {
    frames: VecDeque<Vec<u8>>,
    closed: bool,
}

/// Producer half; cheap to clone, never blocks
#[derive(Clone)]
pub struct FrameSink {
    shared: Arc<Shared>,
}

/// Consumer half; single reader
pub struct FrameStream {
    shared: Arc<Shared>,
}

/// Create a drop-oldest frame queue holding at most `capacity` frames
pub fn frame_channel(capacity: usize) -> (FrameSink, FrameStream) {
    let shared = Arc::new(Shared {
        queue: Mutex::new(Queue {
            frames: VecDeque::with_capacity(capacity.max(1)),
            closed: false,
        }),
        notify: Notify::new(),
        capacity: capacity.max(1),
        pushed: AtomicU64::new(0),
        dropped: AtomicU64::new(0),
    });
    (
        FrameSink {
            shared: Arc::clone(&shared),
        },
        FrameStream { shared },
    )
}

impl FrameSink {
    /// Queue a frame. Returns false if the queue is closed.
    pub fn push(&self, frame: Vec<u8>) -> bool {
        {
            let Ok(mut queue) = self.shared.queue.lock() else {
                return false;
            };
            if queue.closed {
                return false;
            }
            if queue.frames.len() >= self.shared.capacity {
                queue.frames.pop_front();
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            }
            queue.frames.push_back(frame);
        }
        self.shared.pushed.fetch_add(1, Ordering::Relaxed);
        self.shared.notify.notify_one();
        true
    }

    /// Stop accepting frames and wake the reader
    pub fn close(&self) {
        if let Ok(mut queue) = self.shared.queue.lock() {
            queue.closed = true;
        }
        self.shared.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.queue.lock().map(|q| q.closed).unwrap_or(true)
    }

    /// Frames accepted so far
    pub fn pushed(&self) -> u64 {
        self.shared.pushed.load(Ordering::Relaxed)
    }

    /// Frames discarded to make room for newer ones
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl FrameStream {
    /// Next frame, or `None` once the sink is closed and the queue drained
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        loop {
            {
                let Ok(mut queue) = self.shared.queue.lock() else {
                    return None;
                };
                if let Some(frame) = queue.frames.pop_front() {
                    return Some(frame);
                }
                if queue.closed {
                    return None;
                }
            }
            self.shared.notify.notified().await;
        }
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        if let Ok(mut queue) = self.shared.queue.lock() {
            queue.closed = true;
            queue.frames.clear();
        }
    }
}
