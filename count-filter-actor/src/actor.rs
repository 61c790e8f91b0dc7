use anyhow::Result;
use count_filter::{CountFilter, Counter, CounterSnapshot, Decision};
use tokio::sync::{mpsc, oneshot};

/// Message types for the count filter actor
pub enum CountFilterMessage {
    PageFetched {
        request_url: String,
    },
    ItemProduced {
        response_url: String,
    },
    ShouldAllow {
        request_url: String,
        response_tx: oneshot::Sender<Decision>,
    },
    Snapshot {
        response_tx: oneshot::Sender<CounterSnapshot>,
    },
}

/// Handle to communicate with the count filter actor
#[derive(Clone)]
pub struct CountFilterHandle {
    tx: mpsc::Sender<CountFilterMessage>,
}

impl CountFilterHandle {
    /// Report a completed fetch
    pub async fn page_fetched(&self, request_url: impl Into<String>) -> Result<()> {
        self.send(CountFilterMessage::PageFetched {
            request_url: request_url.into(),
        })
        .await
    }

    /// Report an extracted item
    pub async fn item_produced(&self, response_url: impl Into<String>) -> Result<()> {
        self.send(CountFilterMessage::ItemProduced {
            response_url: response_url.into(),
        })
        .await
    }

    /// Ask whether a request may be dispatched
    ///
    /// Events sent earlier through the same handle are counted before the
    /// decision is made.
    pub async fn should_allow(&self, request_url: impl Into<String>) -> Result<Decision> {
        let (response_tx, response_rx) = oneshot::channel();

        self.send(CountFilterMessage::ShouldAllow {
            request_url: request_url.into(),
            response_tx,
        })
        .await?;

        response_rx
            .await
            .map_err(|_| anyhow::anyhow!("Count filter actor dropped response channel"))
    }

    /// Copy of the current counters
    pub async fn snapshot(&self) -> Result<CounterSnapshot> {
        let (response_tx, response_rx) = oneshot::channel();

        self.send(CountFilterMessage::Snapshot { response_tx }).await?;

        response_rx
            .await
            .map_err(|_| anyhow::anyhow!("Count filter actor dropped response channel"))
    }

    async fn send(&self, msg: CountFilterMessage) -> Result<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| anyhow::anyhow!("Count filter actor has shut down"))
    }
}

/// The count filter actor
///
/// Owns a [`CountFilter`] on a single task, so events and decisions are
/// applied in the order they arrive.
pub struct CountFilterActor;

impl CountFilterActor {
    /// Spawn a new actor around `filter`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(buffer_size: usize, filter: CountFilter) -> CountFilterHandle {
        let (tx, rx) = mpsc::channel(buffer_size);

        tokio::spawn(async move {
            run_actor(rx, filter).await;
        });

        CountFilterHandle { tx }
    }
}

async fn run_actor(mut rx: mpsc::Receiver<CountFilterMessage>, filter: CountFilter) {
    while let Some(msg) = rx.recv().await {
        match msg {
            CountFilterMessage::PageFetched { request_url } => {
                filter.on_page_fetched(&request_url);
            }
            CountFilterMessage::ItemProduced { response_url } => {
                filter.on_item_produced(&response_url);
            }
            CountFilterMessage::ShouldAllow {
                request_url,
                response_tx,
            } => {
                let decision = filter.should_allow(&request_url);
                // Ignore send errors - the caller may have given up waiting
                let _ = response_tx.send(decision);
            }
            CountFilterMessage::Snapshot { response_tx } => {
                let _ = response_tx.send(filter.store().snapshot());
            }
        }
    }

    tracing::info!(
        page_count = filter.store().global(Counter::Page),
        item_count = filter.store().global(Counter::Item),
        "Count filter actor shutting down"
    );
}
