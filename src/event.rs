use crate::host::HostEvent;
use crate::keys::KeyToken;
use crate::state::Mode;

/// Everything that can arrive on the engine's event bus. One bounded
/// channel carries keystrokes and host events alike, so a single consumer
/// sees them in arrival order.
pub(crate) enum EngineEvent {
    Key(KeyToken),
    Host(HostEvent),
    ExecuteSequence {
        keys: Vec<KeyToken>,
        reply: flume::Sender<bool>,
    },
    QueryMode {
        reply: flume::Sender<Mode>,
    },
    Shutdown,
}
