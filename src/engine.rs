use std::ops::ControlFlow;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, trace};

use crate::config::EngineConfig;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::event::EngineEvent;
use crate::host::{DocumentChangeCause, Host, HostEvent};
use crate::keys::KeyToken;
use crate::operator::primary_selection;
use crate::state::{EngineState, Mode};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine event bus disconnected")]
    Disconnected,
}

/// The modal engine: owns the state record and the dispatcher, consumes
/// the event bus one message at a time. Because a single consumer runs
/// each message to completion before receiving the next, keystrokes are
/// processed in strict arrival order with no interleaving.
pub struct Engine {
    host: Arc<dyn Host>,
    dispatcher: Dispatcher,
    state: EngineState,
    event_tx: flume::Sender<EngineEvent>,
    event_rx: flume::Receiver<EngineEvent>,
}

impl Engine {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self::with_config(host, EngineConfig::default())
    }

    pub fn with_config(host: Arc<dyn Host>, config: EngineConfig) -> Self {
        let (event_tx, event_rx) = flume::bounded(1024);
        let dispatcher = Dispatcher::new();
        for name in dispatcher.action_names() {
            host.register_action(name);
        }
        host.set_raw_intercept(true);
        host.mode_changed(Mode::Normal);

        Self {
            host,
            dispatcher,
            state: EngineState::new(config),
            event_tx,
            event_rx,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            event_tx: self.event_tx.clone(),
        }
    }

    /// Runs until a shutdown request arrives on the bus.
    pub fn run(mut self) {
        while let Ok(event) = self.event_rx.recv() {
            if self.apply(event).is_break() {
                break;
            }
        }
        debug!("engine loop stopped");
    }

    fn apply(&mut self, event: EngineEvent) -> ControlFlow<()> {
        match event {
            EngineEvent::Key(token) => {
                self.dispatcher
                    .handle_key(&mut self.state, self.host.as_ref(), token);
            }
            EngineEvent::Host(event) => self.apply_host_event(event),
            EngineEvent::ExecuteSequence { keys, reply } => {
                let mut last = DispatchOutcome::Ignored;
                for token in keys {
                    last = self
                        .dispatcher
                        .handle_key(&mut self.state, self.host.as_ref(), token);
                }
                if reply.send(last.is_executed()).is_err() {
                    debug!("execute_sequence caller went away before the reply");
                }
            }
            EngineEvent::QueryMode { reply } => {
                if reply.send(self.state.mode).is_err() {
                    debug!("mode query caller went away before the reply");
                }
            }
            EngineEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn apply_host_event(&mut self, event: HostEvent) {
        trace!("host event: {:?}", event);
        let host = self.host.as_ref();
        match event {
            HostEvent::SelectionChanged { cause, empty } => {
                if self.state.mode == Mode::Insert {
                    return;
                }
                // a selection change this engine did not make invalidates
                // whatever sequence was in flight
                if cause.is_external() && !self.state.pending_keys.is_empty() {
                    self.state.clear_pending(host);
                }
                if !empty && self.state.mode == Mode::Normal {
                    self.state.enter_visual_mode(host);
                } else if empty && self.state.mode.is_visual() {
                    self.state.enter_normal_mode(host);
                }
            }
            HostEvent::ActiveViewChanged => match host.active_view() {
                None => {
                    self.state.enter_normal_mode(host);
                    self.state.clear_pending(host);
                }
                Some(view) => {
                    let empty = primary_selection(host, view).is_empty();
                    if empty {
                        self.state.enter_normal_mode(host);
                    } else if self.state.mode != Mode::Insert {
                        self.state.enter_visual_mode(host);
                    }
                }
            },
            HostEvent::DocumentChanged { cause } => {
                if cause == DocumentChangeCause::UndoRedo {
                    self.state.enter_normal_mode(host);
                }
            }
            HostEvent::WillSave => self.state.enter_normal_mode(host),
            HostEvent::ConfigChanged { text } => match EngineConfig::from_toml(&text) {
                Ok(config) => {
                    debug!("engine config updated");
                    self.state.config = config;
                }
                Err(err) => {
                    error!("config rejected, keeping previous values: {:#}", err);
                }
            },
        }
    }
}

/// Cloneable producer side of the engine's event bus; the host adapter
/// and external callers talk to the engine through this.
#[derive(Clone)]
pub struct EngineHandle {
    event_tx: flume::Sender<EngineEvent>,
}

impl EngineHandle {
    pub fn key(&self, token: KeyToken) -> Result<(), EngineError> {
        self.send(EngineEvent::Key(token))
    }

    /// Synthetic keystrokes for macro-like replay; they join the queue
    /// like typed keys and obey the same ordering guarantee.
    pub fn inject_keys(
        &self,
        tokens: impl IntoIterator<Item = KeyToken>,
    ) -> Result<(), EngineError> {
        for token in tokens {
            self.send(EngineEvent::Key(token))?;
        }
        Ok(())
    }

    pub fn host_event(&self, event: HostEvent) -> Result<(), EngineError> {
        self.send(EngineEvent::Host(event))
    }

    /// Runs a named key sequence and reports whether it resolved to an
    /// executed action. Malformed tokens are logged and rejected, never
    /// fatal.
    pub fn execute_sequence(&self, tokens: &[&str]) -> bool {
        if tokens.is_empty() {
            error!("execute_sequence called with no keys");
            return false;
        }
        let mut keys = Vec::with_capacity(tokens.len());
        for token in tokens {
            match token.parse::<KeyToken>() {
                Ok(key) => keys.push(key),
                Err(err) => {
                    error!("execute_sequence rejected: {}", err);
                    return false;
                }
            }
        }
        let (reply_tx, reply_rx) = flume::bounded(1);
        if self
            .send(EngineEvent::ExecuteSequence {
                keys,
                reply: reply_tx,
            })
            .is_err()
        {
            return false;
        }
        reply_rx.recv().unwrap_or(false)
    }

    /// The current mode, for the host's declarative key-enablement
    /// conditions. `None` when the engine is gone.
    pub fn current_mode(&self) -> Option<Mode> {
        let (reply_tx, reply_rx) = flume::bounded(1);
        self.send(EngineEvent::QueryMode { reply: reply_tx }).ok()?;
        reply_rx.recv().ok()
    }

    pub fn shutdown(&self) {
        let _ = self.event_tx.send(EngineEvent::Shutdown);
    }

    fn send(&self, event: EngineEvent) -> Result<(), EngineError> {
        self.event_tx.send(event).map_err(|_| {
            error!("engine event bus disconnected");
            EngineError::Disconnected
        })
    }
}
