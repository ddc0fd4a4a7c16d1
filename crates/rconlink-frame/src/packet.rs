//! Packet types and reserved request ids.

use std::fmt;

use crate::error::FrameError;

/// Request id the server echoes back when authentication is rejected.
pub const AUTH_FAILED_ID: i32 = -1;

/// Remote-console packet type.
///
/// The numeric space is overloaded: the server answers an [`PacketType::Auth`]
/// packet with type `2`, the same value as [`PacketType::Command`]. Use
/// [`PacketType::AUTH_RESPONSE`] when reading that reply for clarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Server output for a command (`SERVERDATA_RESPONSE_VALUE`).
    Response,
    /// Execute a command (`SERVERDATA_EXECCOMMAND`).
    Command,
    /// Authenticate with the shared secret (`SERVERDATA_AUTH`).
    Auth,
}

impl PacketType {
    /// Server reply to an authentication packet.
    pub const AUTH_RESPONSE: PacketType = PacketType::Command;

    /// Wire value of this packet type.
    pub fn as_i32(self) -> i32 {
        match self {
            PacketType::Response => 0,
            PacketType::Command => 2,
            PacketType::Auth => 3,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            PacketType::Response => "RESPONSE",
            PacketType::Command => "COMMAND",
            PacketType::Auth => "AUTH",
        }
    }
}

impl TryFrom<i32> for PacketType {
    type Error = FrameError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PacketType::Response),
            2 => Ok(PacketType::Command),
            3 => Ok(PacketType::Auth),
            other => Err(FrameError::UnknownPacketType(other)),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values() {
        assert_eq!(PacketType::Response.as_i32(), 0);
        assert_eq!(PacketType::Command.as_i32(), 2);
        assert_eq!(PacketType::Auth.as_i32(), 3);
        assert_eq!(PacketType::AUTH_RESPONSE.as_i32(), 2);
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(matches!(
            PacketType::try_from(1),
            Err(FrameError::UnknownPacketType(1))
        ));
        assert!(matches!(
            PacketType::try_from(-7),
            Err(FrameError::UnknownPacketType(-7))
        ));
    }

    #[test]
    fn display_includes_value() {
        assert_eq!(PacketType::Auth.to_string(), "AUTH(3)");
    }
}
