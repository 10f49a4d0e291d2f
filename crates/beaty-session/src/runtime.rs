//! Async driver: wires a transport, the tokio scheduler and the coordinator
//! around one inbox.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use beaty_core::types::{QueryRequest, SessionId};
use beaty_stream::{QueryTransport, StreamEvent, INCOMPLETE_STREAM};

use crate::camera::CameraCoordinator;
use crate::coordinator::SessionQueryCoordinator;
use crate::error::SessionError;
use crate::input::Input;
use crate::observer::SessionObserver;
use crate::orchestrator::SessionSettings;
use crate::scheduler::TokioScheduler;
use crate::surface::Surface;

/// Runs sessions against a live transport.
///
/// All session state is touched only from [`SessionRuntime::step`]; transport
/// tasks and timers merely post inputs.
pub struct SessionRuntime {
    coordinator: SessionQueryCoordinator,
    inbox_tx: UnboundedSender<Input>,
    inbox_rx: UnboundedReceiver<Input>,
    transport: Arc<dyn QueryTransport>,
    stream_task: Option<JoinHandle<()>>,
}

impl SessionRuntime {
    /// Must be called inside a tokio runtime.
    pub fn new(
        transport: Arc<dyn QueryTransport>,
        camera: impl CameraCoordinator + 'static,
        observer: impl SessionObserver + 'static,
        settings: SessionSettings,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(inbox_tx.clone());
        let surface = Surface::new(camera, observer, scheduler, inbox_tx.clone());
        Self {
            coordinator: SessionQueryCoordinator::new(surface, settings),
            inbox_tx,
            inbox_rx,
            transport,
            stream_task: None,
        }
    }

    /// Supersede the current session and start streaming `request`.
    pub fn submit(&mut self, request: QueryRequest) -> Result<SessionId, SessionError> {
        let id = self.coordinator.submit(request.clone())?;
        if let Some(previous) = self.stream_task.take() {
            previous.abort();
        }

        let transport = Arc::clone(&self.transport);
        let inbox = self.inbox_tx.clone();
        self.stream_task = Some(tokio::spawn(async move {
            forward_stream(transport, request, id, inbox).await;
        }));
        Ok(id)
    }

    /// Wait for one input and apply it. Returns `false` once the inbox is closed.
    pub async fn step(&mut self) -> bool {
        match self.inbox_rx.recv().await {
            Some(input) => {
                self.coordinator.handle(input);
                true
            }
            None => false,
        }
    }

    /// Process inputs until the current session has finished and nothing is
    /// left to reveal.
    pub async fn run_until_settled(&mut self) {
        while !self.coordinator.is_idle() {
            if !self.step().await {
                break;
            }
        }
    }

    /// Supersede the current session without starting another.
    pub fn cancel(&mut self) {
        if let Some(task) = self.stream_task.take() {
            task.abort();
        }
        self.coordinator.cancel();
    }

    pub fn coordinator(&self) -> &SessionQueryCoordinator {
        &self.coordinator
    }
}

impl Drop for SessionRuntime {
    fn drop(&mut self) {
        if let Some(task) = self.stream_task.take() {
            task.abort();
        }
    }
}

async fn forward_stream(
    transport: Arc<dyn QueryTransport>,
    request: QueryRequest,
    session: SessionId,
    inbox: UnboundedSender<Input>,
) {
    let send = |event: StreamEvent| inbox.send(Input::Stream { session, event }).is_ok();

    let mut events = match transport.open(&request).await {
        Ok(events) => events,
        Err(e) => {
            warn!(session = %session, error = %e, "Query transport failed");
            send(StreamEvent::Error {
                message: e.to_string(),
            });
            return;
        }
    };

    while let Some(event) = events.next().await {
        let terminal = event.is_terminal();
        if !send(event) {
            debug!(session = %session, "Inbox closed, stream abandoned");
            return;
        }
        if terminal {
            return;
        }
    }
    send(StreamEvent::Error {
        message: INCOMPLETE_STREAM.to_string(),
    });
}
