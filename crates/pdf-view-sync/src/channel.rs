//! Ordered, in-process transport between the host and the viewer.
//!
//! Each side of the bridge is a [`CommandChannel`]: an [`Outbox`] for fire-and-forget sends
//! and an [`Inbox`] that hands every inbound message, in send order, to a single handler.
//!
//! Every send is stamped from one process-wide clock, so a receiver reading several queues
//! can merge them back into the order the sends happened.

use pdf_bridge::{HostMessage, UiMessage};
use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

use crate::{Result, ViewError};

/// Viewer side of the bridge: sends [`UiMessage`], receives [`HostMessage`]
pub type UiChannel = CommandChannel<UiMessage, HostMessage>;
/// Host side of the bridge: sends [`HostMessage`], receives [`UiMessage`]
pub type HostChannel = CommandChannel<HostMessage, UiMessage>;

type Handler<T> = Box<dyn FnMut(T) + Send>;

static CLOCK: Mutex<u64> = Mutex::new(0);

/// A queued item and its position in the global send order
#[derive(Debug)]
pub struct Stamped<T> {
    pub stamp: u64,
    pub item: T,
}

/// Stamp and enqueue under one lock: stamp order and queue order never disagree
pub fn send_stamped<T>(
    tx: &mpsc::UnboundedSender<Stamped<T>>,
    item: T,
) -> std::result::Result<(), T> {
    let mut clock = CLOCK.lock().unwrap_or_else(PoisonError::into_inner);
    *clock += 1;
    tx.send(Stamped {
        stamp: *clock,
        item,
    })
    .map_err(|mpsc::error::SendError(rejected)| rejected.item)
}

/// Sending half. A detached outbox models a bridge that isn't established yet.
#[derive(Debug)]
pub struct Outbox<T> {
    tx: Option<mpsc::UnboundedSender<Stamped<T>>>,
}

impl<T> Clone for Outbox<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Debug> Outbox<T> {
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn is_ready(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Enqueue a command for the peer. Never blocks and never fails loudly:
    /// returns `false` if the bridge isn't there to take it.
    pub fn send(&self, command: T) -> bool {
        let Some(tx) = &self.tx else {
            log::warn!("Bridge not ready, dropping outbound {:?}", command);
            return false;
        };

        match send_stamped(tx, command) {
            Ok(()) => true,
            Err(command) => {
                log::warn!("Bridge closed, dropping outbound {:?}", command);
                false
            }
        }
    }
}

/// Receiving half
pub struct Inbox<T> {
    rx: mpsc::UnboundedReceiver<Stamped<T>>,
    /// Received but not yet delivered
    held: Option<Stamped<T>>,
    handler: Option<Handler<T>>,
    dropped: usize,
}

impl<T: Debug> Inbox<T> {
    /// Register the one handler that sees inbound commands
    pub fn on_receive<F>(&mut self, handler: F) -> Result<()>
    where
        F: FnMut(T) + Send + 'static,
    {
        if self.handler.is_some() {
            return Err(ViewError::HandlerAlreadyRegistered);
        }
        self.handler = Some(Box::new(handler));
        Ok(())
    }

    pub fn clear_handler(&mut self) {
        self.handler = None;
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Wait for the next inbound command and deliver it.
    /// Returns `false` once the peer has hung up.
    pub async fn pump(&mut self) -> bool {
        self.ready().await && self.pump_one()
    }

    /// Deliver the next command if one is already queued
    pub fn pump_one(&mut self) -> bool {
        self.fill();
        match self.held.take() {
            Some(command) => {
                self.deliver(command.item);
                true
            }
            None => false,
        }
    }

    /// Deliver everything already queued without waiting. Returns how many were taken.
    pub fn pump_ready(&mut self) -> usize {
        let mut taken = 0;
        while self.pump_one() {
            taken += 1;
        }
        taken
    }

    /// Wait until a command is queued without delivering it.
    /// Returns `false` once the peer has hung up and nothing is left.
    pub async fn ready(&mut self) -> bool {
        if self.held.is_none() {
            self.held = self.rx.recv().await;
        }
        self.held.is_some()
    }

    /// Send-order stamp of the next queued command
    pub fn next_stamp(&mut self) -> Option<u64> {
        self.fill();
        self.held.as_ref().map(|command| command.stamp)
    }

    /// Raw receive, bypassing the handler
    pub async fn recv(&mut self) -> Option<T> {
        if let Some(command) = self.held.take() {
            return Some(command.item);
        }
        self.rx.recv().await.map(|command| command.item)
    }

    pub fn try_recv(&mut self) -> Option<T> {
        self.fill();
        self.held.take().map(|command| command.item)
    }

    /// Take everything queued, bypassing the handler
    pub fn drain(&mut self) -> Vec<T> {
        let mut commands = Vec::new();
        while let Some(command) = self.try_recv() {
            commands.push(command);
        }
        commands
    }

    /// Commands that arrived while no handler was registered
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn fill(&mut self) {
        if self.held.is_none() {
            self.held = self.rx.try_recv().ok();
        }
    }

    fn deliver(&mut self, command: T) {
        match &mut self.handler {
            Some(handler) => handler(command),
            None => {
                log::debug!("No receive handler registered, dropping {:?}", command);
                self.dropped += 1;
            }
        }
    }
}

/// One end of the bridge
pub struct CommandChannel<O, I> {
    outbox: Outbox<O>,
    inbox: Inbox<I>,
}

impl<O: Debug, I: Debug> CommandChannel<O, I> {
    pub fn send(&self, command: O) -> bool {
        self.outbox.send(command)
    }

    pub fn on_receive<F>(&mut self, handler: F) -> Result<()>
    where
        F: FnMut(I) + Send + 'static,
    {
        self.inbox.on_receive(handler)
    }

    pub fn outbox(&self) -> &Outbox<O> {
        &self.outbox
    }

    pub fn inbox_mut(&mut self) -> &mut Inbox<I> {
        &mut self.inbox
    }

    pub fn split(self) -> (Outbox<O>, Inbox<I>) {
        (self.outbox, self.inbox)
    }
}

/// Create both ends of a bridge. Messages sent on one end arrive at the other in send order.
pub fn connect<A, B>() -> (CommandChannel<A, B>, CommandChannel<B, A>) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();

    let a = CommandChannel {
        outbox: Outbox { tx: Some(a_tx) },
        inbox: Inbox {
            rx: b_rx,
            held: None,
            handler: None,
            dropped: 0,
        },
    };
    let b = CommandChannel {
        outbox: Outbox { tx: Some(b_tx) },
        inbox: Inbox {
            rx: a_rx,
            held: None,
            handler: None,
            dropped: 0,
        },
    };
    (a, b)
}
