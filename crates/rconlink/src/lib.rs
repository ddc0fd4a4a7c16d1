//! Tool-calling bridge to a game server's remote console.
//!
//! rconlink speaks the framed remote-console protocol, exposes a catalog of
//! companion commands as callable tools, and runs long-lived companion
//! skills in the background.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP endpoint and connect helpers
//! - [`frame`]: remote-console packet codec
//! - [`client`]: authenticated, id-correlated protocol client
//! - [`registry`]: tool/skill/composite catalog, schemas, argument validation
//! - [`skills`]: skill lifecycle manager and routines
//! - [`dispatch`]: routes one tool call to the right component
//! - [`server`]: newline-delimited JSON request loop over any byte stream

pub mod dispatch;
pub mod server;

pub use dispatch::{companion_id, DispatchError, Dispatcher, ToolContent, ToolResponse};

/// Re-export transport types.
pub mod transport {
    pub use rconlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use rconlink_frame::*;
}

/// Re-export client types.
pub mod client {
    pub use rconlink_client::*;
}

/// Re-export registry types.
pub mod registry {
    pub use rconlink_registry::*;
}

/// Re-export skill types.
pub mod skills {
    pub use rconlink_skills::*;
}
