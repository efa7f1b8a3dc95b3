//! User-facing progress events.

use tokio::sync::mpsc::UnboundedSender;

use webcontext_shared::WebSearchUpdate;

/// Receives progress events from a run.
///
/// Fire-and-forget: implementations must not block and the pipeline never
/// waits for delivery.
pub trait UpdateSink: Send + Sync {
    fn notify(&self, update: WebSearchUpdate);
}

/// No-op sink for headless/test usage.
pub struct SilentSink;

impl UpdateSink for SilentSink {
    fn notify(&self, _update: WebSearchUpdate) {}
}

/// Forwards events into a tokio channel.
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<WebSearchUpdate>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<WebSearchUpdate>) -> Self {
        Self { tx }
    }
}

impl UpdateSink for ChannelSink {
    fn notify(&self, update: WebSearchUpdate) {
        let _ = self.tx.send(update);
    }
}
