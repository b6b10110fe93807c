//! Per-topic delivery lanes.
//!
//! One lane per topic name, created on first use by either side. A lane is a
//! bounded channel of [`LANE_CAPACITY`] whose receiver is shared by every
//! drain task subscribed to that name (competing consumers).
//!
//! Backpressure hazard: once a lane holds [`LANE_CAPACITY`] undelivered
//! messages, further pushes wait until a subscriber drains it. A process
//! that pushes without ever subscribing stalls its publishers.

use std::collections::HashMap;
use std::sync::Arc;

use bus_driver::Message;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::debug;

/// Messages a lane buffers before pushes start waiting for a reader.
pub const LANE_CAPACITY: usize = 1;

lazy_static! {
    /// Lanes shared by every default `MemoryDriver` in the process.
    pub(crate) static ref SHARED_LANES: Arc<LaneTable> = Arc::new(LaneTable::new());
}

pub(crate) struct Lane {
    tx: mpsc::Sender<Message>,
    rx: AsyncMutex<mpsc::Receiver<Message>>,
}

impl Lane {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel(LANE_CAPACITY);
        Self {
            tx,
            rx: AsyncMutex::new(rx),
        }
    }

    pub(crate) async fn send(&self, message: Message) {
        // The lane owns its receiver, so the channel never closes.
        let _ = self.tx.send(message).await;
    }

    pub(crate) async fn recv(&self) -> Option<Message> {
        self.rx.lock().await.recv().await
    }
}

/// Table of lanes keyed by topic name.
#[derive(Default)]
pub struct LaneTable {
    lanes: Mutex<HashMap<String, Arc<Lane>>>,
}

impl LaneTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the lane for `topic`, creating it atomically if missing.
    pub(crate) fn lane(&self, topic: &str) -> Arc<Lane> {
        let mut lanes = self.lanes.lock();
        Arc::clone(lanes.entry(topic.to_string()).or_insert_with(|| {
            debug!(topic, "Memory lane created");
            Arc::new(Lane::new())
        }))
    }

    /// Number of lanes created so far.
    pub fn len(&self) -> usize {
        self.lanes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.lock().is_empty()
    }
}
