use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use crate::transport::{RoomEvent, RoomMessage};

const LOG_TARGET: &str = "p2p_tables::session::pump";

/// Receives room events for one session, one at a time.
#[async_trait]
pub(crate) trait RoomEventHandler: Send + Sync + 'static {
    async fn handle(&self, event: RoomEvent);
}

/// Drives `handler` until the room closes or `cancel` fires. Each event is
/// handled to completion before the next is read.
pub(crate) fn spawn_event_pump<H: RoomEventHandler>(
    name: String,
    mut events: mpsc::UnboundedReceiver<RoomEvent>,
    cancel: CancellationToken,
    handler: Arc<H>,
) -> JoinHandle<()> {
    let span = info_span!("session", task_name = %name);
    let pump = async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => handler.handle(event).await,
                    None => break,
                },
            }
        }
        debug!(target: LOG_TARGET, session = %name, "event pump stopped");
    };
    tokio::spawn(pump.instrument(span))
}

/// Parses a message payload, logging and dropping anything malformed.
pub(crate) fn decode_payload<T: DeserializeOwned>(message: &RoomMessage) -> Option<T> {
    match serde_json::from_value(message.payload.clone()) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(
                target: LOG_TARGET,
                from = %message.from,
                tag = %message.tag,
                %error,
                "dropping malformed room message"
            );
            None
        }
    }
}

/// Owns a session's event pump. Dropping it cancels the pump.
pub(crate) struct PumpHandle {
    cancel: CancellationToken,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl PumpHandle {
    pub(crate) fn spawn<H: RoomEventHandler>(
        name: String,
        events: mpsc::UnboundedReceiver<RoomEvent>,
        handler: Arc<H>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let task = spawn_event_pump(name, events, cancel.clone(), handler);
        Self {
            cancel,
            task: parking_lot::Mutex::new(Some(task)),
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels the pump and waits for the event being handled to finish.
    pub(crate) async fn stop(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(error) = task.await {
                warn!(target: LOG_TARGET, %error, "event pump ended abnormally");
            }
        }
    }
}

impl Drop for PumpHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
