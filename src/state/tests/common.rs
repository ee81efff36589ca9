use crate::config::EngineConfig;
use crate::host::memory::MemoryHost;
use crate::state::EngineState;

pub(super) fn test_state() -> (EngineState, MemoryHost) {
    let host = MemoryHost::new();
    host.open("fn main() {}");
    (EngineState::new(EngineConfig::default()), host)
}
