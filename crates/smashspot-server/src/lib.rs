// Network-facing read surface for the matchup engine: the `feed` request
// served over a WebSocket/JSON protocol.

pub mod protocol;
pub mod service;
pub mod ws_server;
