// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Async session driver.
//!
//! Runs the controller on a tokio runtime. Service calls and the
//! forced-logout timer are spawned as tasks that report back through
//! the driver's event channel; every other effect is handed to the host.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use super::controller::{ConversationController, Effect, SessionEvent};
use crate::service::CompositionService;

/// Owns a controller and its pending async work
pub struct SessionDriver<S> {
    controller: ConversationController,
    service: Arc<S>,
    event_tx: UnboundedSender<SessionEvent>,
    event_rx: UnboundedReceiver<SessionEvent>,
}

impl<S: CompositionService> SessionDriver<S> {
    /// Create a driver
    pub fn new(controller: ConversationController, service: Arc<S>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            service,
            event_tx,
            event_rx,
        }
    }

    /// Sender for host events
    pub fn sender(&self) -> UnboundedSender<SessionEvent> {
        self.event_tx.clone()
    }

    /// Controller state
    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    /// Mutable controller access for synchronous calls such as downloads
    pub fn controller_mut(&mut self) -> &mut ConversationController {
        &mut self.controller
    }

    /// Apply an event now and return the effects meant for the host
    pub fn dispatch(&mut self, event: SessionEvent) -> Vec<Effect> {
        self.controller.handle_event(event);
        self.route_effects()
    }

    /// Wait for the next queued event, apply it, and return host effects
    pub async fn step(&mut self) -> Vec<Effect> {
        match self.event_rx.recv().await {
            Some(event) => self.dispatch(event),
            None => Vec::new(),
        }
    }

    fn route_effects(&mut self) -> Vec<Effect> {
        let mut host = Vec::new();
        for effect in self.controller.take_effects() {
            match effect {
                Effect::Dispatch { id, request } => {
                    debug!(%id, "spawning compose request");
                    let service = Arc::clone(&self.service);
                    let tx = self.event_tx.clone();
                    tokio::spawn(async move {
                        let result = service.compose(request).await;
                        if tx.send(SessionEvent::ComposeSettled { id, result }).is_err() {
                            warn!(%id, "session closed before compose request settled");
                        }
                    });
                }
                Effect::ScheduleLogout { generation, after } => {
                    let tx = self.event_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        // Receiver gone means the session already ended
                        let _ = tx.send(SessionEvent::LogoutTimerElapsed { generation });
                    });
                }
                other => host.push(other),
            }
        }
        host
    }
}
