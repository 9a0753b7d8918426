//! The viewer's event loop.
//!
//! One task owns the store, the dispatcher and the reducer. Host commands arrive on the
//! bridge; local tool invocations and loader completions are queued as [`SessionEvent`]s.
//! The two queues are merged by send stamp and processed one item at a time, so no two
//! mutations interleave and whichever writer sent first is applied first.

use pdf_bridge::{HostMessage, RequestId, ToolResponse, UiMessage};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::channel::{Inbox, Outbox, Stamped, UiChannel, send_stamped};
use crate::dispatcher::{Dispatch, ToolDispatcher, ToolPayload};
use crate::loader::{DocumentLoader, LoadError};
use crate::notify::{Notification, Notifier, Severity};
use crate::reducer::{LoadTicket, SyncReducer};
use crate::state::{ViewState, ViewStore};
use crate::{Result, ViewError, ViewerConfig};

#[derive(Debug)]
pub enum SessionEvent {
    Invoke {
        tool_id: String,
        payload: ToolPayload,
    },
    SelectText(Option<String>),
    DismissError,
    Cancel(RequestId),
    LoadFinished {
        generation: u64,
        result: std::result::Result<(), LoadError>,
    },
    /// Acknowledged once everything queued ahead of it has been processed
    Flush(oneshot::Sender<()>),
    Shutdown,
}

pub struct ViewerSession {
    config: ViewerConfig,
    store: ViewStore,
    dispatcher: ToolDispatcher,
    reducer: SyncReducer,
    outbox: Outbox<UiMessage>,
    inbox: Option<Inbox<HostMessage>>,
    host_tx: mpsc::UnboundedSender<HostMessage>,
    host_rx: mpsc::UnboundedReceiver<HostMessage>,
    loader: Arc<dyn DocumentLoader>,
    notifier: Arc<dyn Notifier>,
    events_tx: mpsc::UnboundedSender<Stamped<SessionEvent>>,
    events_rx: mpsc::UnboundedReceiver<Stamped<SessionEvent>>,
    /// Next local event, taken off the queue but not yet processed
    held: Option<Stamped<SessionEvent>>,
}

impl ViewerSession {
    pub fn new(
        config: ViewerConfig,
        outbox: Outbox<UiMessage>,
        loader: Arc<dyn DocumentLoader>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (host_tx, host_rx) = mpsc::unbounded_channel();
        Self {
            store: ViewStore::new(ViewState::new(&config)),
            dispatcher: ToolDispatcher::new(&config, outbox.clone()),
            reducer: SyncReducer::new(&config),
            config,
            outbox,
            inbox: None,
            host_tx,
            host_rx,
            loader,
            notifier,
            events_tx,
            events_rx,
            held: None,
        }
    }

    /// Bind the inbound half of the bridge
    pub fn attach(&mut self, mut inbox: Inbox<HostMessage>) -> Result<()> {
        let host = self.host_tx.clone();
        inbox.on_receive(move |message| {
            if host.send(message).is_err() {
                log::debug!("Session gone, dropping host command");
            }
        })?;
        self.inbox = Some(inbox);
        Ok(())
    }

    pub fn handle(&self) -> ViewerHandle {
        ViewerHandle {
            events: self.events_tx.clone(),
            state: self.store.subscribe(),
        }
    }

    pub fn state(&self) -> &ViewState {
        self.store.get()
    }

    pub fn store(&self) -> &ViewStore {
        &self.store
    }

    pub fn pending_calls(&self) -> usize {
        self.dispatcher.pending_count()
    }

    /// Drive the session until shutdown or until the host hangs up
    pub async fn run(mut self) {
        log::info!("Viewer session started");
        let mut sweep = self.config.delegate_timeout().map(|timeout| {
            let mut interval = tokio::time::interval(timeout);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            match self.step() {
                Some(ControlFlow::Break(())) => break,
                Some(ControlFlow::Continue(())) => continue,
                None => {}
            }

            tokio::select! {
                biased;
                event = self.events_rx.recv() => {
                    let Some(event) = event else { break };
                    self.held = Some(event);
                }
                open = ready(&mut self.inbox) => {
                    if !open {
                        log::info!("Bridge closed by host");
                        break;
                    }
                }
                () = tick(&mut sweep) => self.sweep_expired(Instant::now()),
            }
        }

        log::info!("Viewer session stopped");
    }

    /// Wait for the next host command or local event and process it
    pub async fn process_next(&mut self) -> ControlFlow<()> {
        loop {
            if let Some(flow) = self.step() {
                return flow;
            }

            tokio::select! {
                biased;
                event = self.events_rx.recv() => match event {
                    Some(event) => self.held = Some(event),
                    None => return ControlFlow::Break(()),
                },
                open = ready(&mut self.inbox) => {
                    if !open {
                        return ControlFlow::Break(());
                    }
                }
            }
        }
    }

    /// Process everything already queued on either side. Returns how many items were taken.
    pub fn process_ready(&mut self) -> usize {
        let mut processed = 0;
        while let Some(flow) = self.step() {
            processed += 1;
            if flow.is_break() {
                break;
            }
        }
        processed
    }

    /// Process whichever queued item was sent first. `None` when both queues are empty.
    fn step(&mut self) -> Option<ControlFlow<()>> {
        if self.held.is_none() {
            self.held = self.events_rx.try_recv().ok();
        }
        let host = self.inbox.as_mut().and_then(Inbox::next_stamp);
        let local = self.held.as_ref().map(|event| event.stamp);

        match (host, local) {
            (None, None) => None,
            (Some(host), local) if local.is_none_or(|local| host < local) => {
                self.deliver_host();
                Some(ControlFlow::Continue(()))
            }
            _ => self.held.take().map(|event| self.process(event.item)),
        }
    }

    fn deliver_host(&mut self) {
        if let Some(inbox) = &mut self.inbox {
            inbox.pump_one();
        }
        while let Ok(message) = self.host_rx.try_recv() {
            self.apply_host(message);
        }
    }

    pub fn process(&mut self, event: SessionEvent) -> ControlFlow<()> {
        match event {
            SessionEvent::Invoke { tool_id, payload } => {
                self.invoke(&tool_id, payload);
            }
            SessionEvent::SelectText(text) => {
                self.store.select_text(text);
            }
            SessionEvent::DismissError => {
                self.store.dismiss_error();
            }
            SessionEvent::Cancel(request_id) => {
                self.cancel(request_id);
            }
            SessionEvent::LoadFinished { generation, result } => {
                self.finish_load(generation, result);
            }
            SessionEvent::Flush(ack) => {
                // Anything queued meanwhile, such as a finished load, goes ahead of the ack
                let waiting = self.inbox.as_mut().and_then(Inbox::next_stamp).is_some();
                if waiting || !self.events_rx.is_empty() {
                    let _ = send_stamped(&self.events_tx, SessionEvent::Flush(ack));
                } else {
                    let _ = ack.send(());
                }
            }
            SessionEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    pub fn apply_host(&mut self, message: HostMessage) {
        log::debug!("Host command: {:?}", message);
        self.track_page(|session| match message {
            HostMessage::ToolResult(response) => session.resolve_tool(response),
            other => {
                if let Some(ticket) = session.reducer.apply(&mut session.store, &other) {
                    let dropped = session.dispatcher.clear_pending();
                    if dropped > 0 {
                        log::info!("Dropped {} tool calls made on the previous document", dropped);
                    }
                    session.spawn_load(ticket);
                }
            }
        });
    }

    pub fn invoke(&mut self, tool_id: &str, payload: ToolPayload) -> Dispatch {
        let dispatch = self.track_page(|session| {
            session
                .dispatcher
                .invoke(&mut session.store, tool_id, payload)
        });
        if let Dispatch::Rejected(reason) = &dispatch {
            self.notifier
                .notify(Notification::new(Severity::Warning, format!("{}: {}", tool_id, reason)));
        }
        dispatch
    }

    pub fn cancel(&mut self, request_id: RequestId) -> bool {
        match self.dispatcher.cancel(request_id) {
            Some(call) => {
                log::info!("Cancelled {} {}", call.tool_id, request_id);
                true
            }
            None => false,
        }
    }

    /// Fail delegated calls that have waited longer than the configured timeout
    pub fn sweep_expired(&mut self, now: Instant) {
        let Some(timeout) = self.config.delegate_timeout() else {
            return;
        };
        for (request_id, call) in self.dispatcher.expire(now, timeout) {
            log::warn!("Tool {} {} timed out", call.tool_id, request_id);
            self.notifier.notify(Notification::error(format!(
                "Tool {} timed out after {} ms",
                call.tool_id,
                timeout.as_millis()
            )));
        }
    }

    fn resolve_tool(&mut self, response: ToolResponse) {
        let Some((request_id, call)) = self.dispatcher.resolve(&response) else {
            log::debug!(
                "Ignoring tool result {:?} with no pending call",
                response.request_id
            );
            return;
        };

        if response.success {
            log::info!("Tool {} {} succeeded", call.tool_id, request_id);
            if let Some(patch) = &response.result {
                self.reducer.apply_patch(&mut self.store, patch);
            }
            let message = response
                .message
                .or_else(|| response.result.and_then(|result| result.message));
            if let Some(message) = message {
                self.notifier.notify(Notification::info(message));
            }
        } else {
            let error = response
                .error
                .unwrap_or_else(|| "unknown error".to_string());
            log::warn!("Tool {} {} failed: {}", call.tool_id, request_id, error);
            self.notifier
                .notify(Notification::error(format!("Tool error: {}", error)));
        }
    }

    fn spawn_load(&self, ticket: LoadTicket) {
        let loader = Arc::clone(&self.loader);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = loader.load_document(&ticket.path).await;
            let finished = SessionEvent::LoadFinished {
                generation: ticket.generation,
                result,
            };
            let _ = send_stamped(&events, finished);
        });
    }

    fn finish_load(&mut self, generation: u64, result: std::result::Result<(), LoadError>) {
        let failure = result.as_ref().err().map(ToString::to_string);
        let applied = self.track_page(|session| {
            session
                .reducer
                .finish_load(&mut session.store, generation, &result)
        });

        if let (true, Some(error)) = (applied, failure) {
            self.notifier
                .notify(Notification::error(format!("PDF load error: {}", error)));
        }
    }

    /// Run `f` and tell the host if it moved the current page
    fn track_page<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let before = self.store.current_page();
        let result = f(self);
        let after = self.store.current_page();
        if after != before && self.store.get().has_document() {
            self.outbox.send(UiMessage::PageChanged { page_number: after });
        }
        result
    }
}

async fn ready(inbox: &mut Option<Inbox<HostMessage>>) -> bool {
    match inbox {
        Some(inbox) => inbox.ready().await,
        None => std::future::pending().await,
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Cheap, cloneable handle for driving a running session: the named operations a
/// presentation layer or embedding application needs.
#[derive(Clone)]
pub struct ViewerHandle {
    events: mpsc::UnboundedSender<Stamped<SessionEvent>>,
    state: watch::Receiver<ViewState>,
}

impl ViewerHandle {
    pub fn invoke(&self, tool_id: impl Into<String>, payload: ToolPayload) -> Result<()> {
        self.send(SessionEvent::Invoke {
            tool_id: tool_id.into(),
            payload,
        })
    }

    pub fn zoom_in(&self) -> Result<()> {
        self.invoke("zoom-in", ToolPayload::new())
    }

    pub fn zoom_out(&self) -> Result<()> {
        self.invoke("zoom-out", ToolPayload::new())
    }

    pub fn reset_zoom(&self) -> Result<()> {
        self.invoke("reset-zoom", ToolPayload::new())
    }

    pub fn rotate_page(&self) -> Result<()> {
        self.invoke("rotate", ToolPayload::new())
    }

    pub fn go_to_page(&self, page: i64) -> Result<()> {
        self.invoke("go-to-page", ToolPayload::new().with("page", page))
    }

    pub fn select_text(&self, text: Option<String>) -> Result<()> {
        self.send(SessionEvent::SelectText(text))
    }

    pub fn dismiss_error(&self) -> Result<()> {
        self.send(SessionEvent::DismissError)
    }

    pub fn cancel(&self, request_id: RequestId) -> Result<()> {
        self.send(SessionEvent::Cancel(request_id))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionEvent::Shutdown)
    }

    /// Resolves once every event sent before it has been processed
    pub async fn flush(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.send(SessionEvent::Flush(ack))?;
        done.await.map_err(|_| ViewError::SessionClosed)
    }

    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn current_page(&self) -> u32 {
        self.state.borrow().current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.state.borrow().total_pages
    }

    pub fn zoom(&self) -> u32 {
        self.state.borrow().zoom
    }

    pub fn rotation(&self) -> u32 {
        self.state.borrow().rotation
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.clone()
    }

    /// Wait until the published state satisfies `predicate`
    pub async fn wait_for(&self, predicate: impl FnMut(&ViewState) -> bool) -> Result<ViewState> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(predicate)
            .await
            .map_err(|_| ViewError::SessionClosed)?;
        Ok(state.clone())
    }

    fn send(&self, event: SessionEvent) -> Result<()> {
        send_stamped(&self.events, event).map_err(|_| ViewError::SessionClosed)
    }
}

/// Create a session on a ready bridge and spawn its loop
pub fn start(
    config: ViewerConfig,
    channel: UiChannel,
    loader: Arc<dyn DocumentLoader>,
    notifier: Arc<dyn Notifier>,
) -> Result<(ViewerHandle, JoinHandle<()>)> {
    config.validate()?;
    let (outbox, inbox) = channel.split();
    let mut session = ViewerSession::new(config, outbox, loader, notifier);
    session.attach(inbox)?;
    let handle = session.handle();
    let task = tokio::spawn(session.run());
    Ok((handle, task))
}
