use crate::error::Result;
use std::fmt;

/// Everything a listener can be told about. Payloads are owned by the event
/// so that listeners may amend them before the operation continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvEvent {
    /// `compose up` is about to run with these arguments
    UpBefore { args: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    UpBefore,
}

impl EnvEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::UpBefore { .. } => EventKind::UpBefore,
        }
    }
}

pub type Listener = Box<dyn Fn(&mut EnvEvent) -> Result<()> + Send + Sync>;

/// Synchronous dispatch, in registration order. A failing listener stops
/// the dispatch and the operation that raised the event.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(EventKind, Listener)>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> &mut Self
    where
        F: Fn(&mut EnvEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.listeners.push((kind, Box::new(listener)));
        self
    }

    /// Returns the event as the last listener left it.
    pub fn trigger(&self, mut event: EnvEvent) -> Result<EnvEvent> {
        let kind = event.kind();
        for (_, listener) in self.listeners.iter().filter(|(k, _)| *k == kind) {
            listener(&mut event)?;
        }
        Ok(event)
    }
}
