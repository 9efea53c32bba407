use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::event::error::EventSystemError;
use crate::event::types::{Configuration, ControlEvent, EventResult};
use crate::kernel::descriptor::DescriptorTable;
use crate::kernel::error::Result;
use crate::kernel::orchestrator::ServiceOrchestrator;
use crate::plugin_system::traits::{OverlayPlugin, PluginContext};

//--------------------------------------------------
// EventSender (Public API, safe to use from any thread)
//--------------------------------------------------

/// Cloneable handle that marshals events onto the control loop.
#[derive(Clone)]
pub struct EventSender {
    tx: UnboundedSender<ControlEvent>,
}

impl fmt::Debug for EventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl EventSender {
    /// Queue an event for the control loop.
    pub fn send(&self, event: ControlEvent) -> std::result::Result<(), EventSystemError> {
        let event_name = event.name();
        self.tx
            .send(event)
            .map_err(|_| EventSystemError::LoopClosed { event_name })
    }

    pub fn start_services(&self, table: DescriptorTable) -> std::result::Result<(), EventSystemError> {
        self.send(ControlEvent::StartServices(table))
    }

    pub fn boot_completed(&self) -> std::result::Result<(), EventSystemError> {
        self.send(ControlEvent::BootCompleted)
    }

    pub fn configuration_changed(&self, config: Configuration) -> std::result::Result<(), EventSystemError> {
        self.send(ControlEvent::ConfigurationChanged(config))
    }

    pub fn locale_changed(&self, locale: impl Into<String>) -> std::result::Result<(), EventSystemError> {
        self.send(ControlEvent::LocaleChanged {
            locale: locale.into(),
        })
    }

    pub fn plugin_connected(
        &self,
        plugin: Arc<dyn OverlayPlugin>,
        context: PluginContext,
    ) -> std::result::Result<(), EventSystemError> {
        self.send(ControlEvent::PluginConnected { plugin, context })
    }

    pub fn plugin_disconnected(&self, plugin: Arc<dyn OverlayPlugin>) -> std::result::Result<(), EventSystemError> {
        self.send(ControlEvent::PluginDisconnected { plugin })
    }

    pub fn shutdown(&self) -> std::result::Result<(), EventSystemError> {
        self.send(ControlEvent::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

//--------------------------------------------------
// ControlLoop (owns the orchestrator)
//--------------------------------------------------

/// Single consumer of the event queue. Handles one event to completion
/// before taking the next, so orchestrator state needs no locking.
pub struct ControlLoop {
    orchestrator: ServiceOrchestrator,
    rx: UnboundedReceiver<ControlEvent>,
    processed: usize,
}

impl fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlLoop")
            .field("orchestrator", &self.orchestrator)
            .field("processed", &self.processed)
            .finish()
    }
}

impl ControlLoop {
    /// Wrap `orchestrator` in a loop and return the sender feeding it.
    pub fn new(mut orchestrator: ServiceOrchestrator) -> (Self, EventSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = EventSender { tx };
        orchestrator.attach_event_sender(sender.clone());
        let control = Self {
            orchestrator,
            rx,
            processed: 0,
        };
        (control, sender)
    }

    pub fn orchestrator(&self) -> &ServiceOrchestrator {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut ServiceOrchestrator {
        &mut self.orchestrator
    }

    pub fn into_orchestrator(self) -> ServiceOrchestrator {
        self.orchestrator
    }

    /// Number of events handled so far.
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Process events until [`ControlEvent::Shutdown`] arrives. The
    /// orchestrator keeps a sender of its own, so dropping the caller's
    /// senders does not end the loop. A fatal orchestrator error does, with
    /// that error.
    pub async fn run(mut self) -> Result<ServiceOrchestrator> {
        log::info!("Control loop running");
        while let Some(event) = self.rx.recv().await {
            if self.dispatch(event).await? == EventResult::Stop {
                break;
            }
        }
        log::info!("Control loop stopped after {} events", self.processed);
        Ok(self.orchestrator)
    }

    /// Process everything already queued, without waiting for more.
    pub async fn process_pending(&mut self) -> Result<usize> {
        let mut count = 0;
        while let Ok(event) = self.rx.try_recv() {
            count += 1;
            if self.dispatch(event).await? == EventResult::Stop {
                break;
            }
        }
        Ok(count)
    }

    async fn dispatch(&mut self, event: ControlEvent) -> Result<EventResult> {
        log::debug!("Dispatching event: {}", event.name());
        self.processed += 1;
        self.orchestrator.handle_event(event).await
    }
}
