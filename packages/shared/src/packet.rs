//! Packet model: the enumerated message kinds and their payload schemas.
//!
//! Every wire message is a u16 [`PacketType`] followed by a type-specific
//! payload. The payload schema depends on direction, so there is one tagged
//! union per direction with a single encode entry point and a single decode
//! dispatch.

use bytes::BytesMut;

use crate::codec::{CodecResult, Reader, Writer};
use crate::types::{ChatMessage, UserInfo};

/// Wire discriminant for every message kind, shared by both directions.
///
/// The numbering is part of the protocol contract and must not change.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    None = 0,
    Message = 1,
    ClientConnectionRequest = 2,
    ConnectionStatus = 3,
    ClientList = 4,
    ClientConnect = 5,
    ClientUpdate = 6,
    ClientDisconnect = 7,
    ClientUpdateResponse = 8,
    MessageHistory = 9,
    ServerShutdown = 10,
    ClientKick = 11,
}

impl PacketType {
    /// Convert from the wire value, `None` for types outside the protocol.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(PacketType::None),
            1 => Some(PacketType::Message),
            2 => Some(PacketType::ClientConnectionRequest),
            3 => Some(PacketType::ConnectionStatus),
            4 => Some(PacketType::ClientList),
            5 => Some(PacketType::ClientConnect),
            6 => Some(PacketType::ClientUpdate),
            7 => Some(PacketType::ClientDisconnect),
            8 => Some(PacketType::ClientUpdateResponse),
            9 => Some(PacketType::MessageHistory),
            10 => Some(PacketType::ServerShutdown),
            11 => Some(PacketType::ClientKick),
            _ => None,
        }
    }
}

/// Packets sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientPacket {
    /// A chat message from an authenticated client.
    Message { message: String },
    /// Authentication handshake: requested color and username.
    ConnectionRequest { color: u32, username: String },
    /// Disconnection request. Carried in the protocol but currently
    /// produces no state change on receipt.
    Disconnect,
    /// A type that is valid on the wire but unhandled in this direction.
    Reserved(PacketType),
    /// A type value outside the protocol. Framing succeeded; not an error.
    Unknown(u16),
}

impl ClientPacket {
    pub fn packet_type(&self) -> Option<PacketType> {
        match self {
            Self::Message { .. } => Some(PacketType::Message),
            Self::ConnectionRequest { .. } => Some(PacketType::ClientConnectionRequest),
            Self::Disconnect => Some(PacketType::ClientDisconnect),
            Self::Reserved(t) => Some(*t),
            Self::Unknown(_) => None,
        }
    }

    /// Encode into a caller-supplied scratch buffer.
    pub fn encode(&self, buf: &mut BytesMut) {
        let mut w = Writer::new(buf);
        match self {
            Self::Message { message } => {
                w.write_u16(PacketType::Message as u16);
                w.write_string(message);
            }
            Self::ConnectionRequest { color, username } => {
                w.write_u16(PacketType::ClientConnectionRequest as u16);
                w.write_u32(*color);
                w.write_string(username);
            }
            Self::Disconnect => {
                w.write_u16(PacketType::ClientDisconnect as u16);
            }
            Self::Reserved(t) => {
                w.write_u16(*t as u16);
            }
            Self::Unknown(raw) => {
                w.write_u16(*raw);
            }
        }
    }

    /// Decode one inbound buffer. Unknown and reserved types decode
    /// successfully and are dispatched to no-ops by the state machine.
    pub fn decode(buf: &[u8]) -> CodecResult<Self> {
        let mut r = Reader::new(buf);
        let raw = r.read_u16()?;
        let Some(packet_type) = PacketType::from_u16(raw) else {
            return Ok(Self::Unknown(raw));
        };

        match packet_type {
            PacketType::Message => Ok(Self::Message {
                message: r.read_string()?,
            }),
            PacketType::ClientConnectionRequest => Ok(Self::ConnectionRequest {
                color: r.read_u32()?,
                username: r.read_string()?,
            }),
            PacketType::ClientDisconnect => Ok(Self::Disconnect),
            other => Ok(Self::Reserved(other)),
        }
    }
}

/// Packets sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerPacket {
    /// A relayed chat message, tagged with the sender's username.
    Message { username: String, message: String },
    /// Response to a connection request.
    ConnectionResponse { accepted: bool },
    /// Full roster of authenticated users.
    ClientList(Vec<UserInfo>),
    /// A new client joined.
    ClientConnect(UserInfo),
    /// An existing client left.
    ClientDisconnect(UserInfo),
    /// Full chat history in send order.
    MessageHistory(Vec<ChatMessage>),
    /// The server is shutting down. No payload.
    ServerShutdown,
    /// The receiving client has been kicked; the reason may be empty.
    ClientKick { reason: String },
    /// A type that is valid on the wire but unhandled in this direction.
    Reserved(PacketType),
    /// A type value outside the protocol. Framing succeeded; not an error.
    Unknown(u16),
}

impl ServerPacket {
    pub fn packet_type(&self) -> Option<PacketType> {
        match self {
            Self::Message { .. } => Some(PacketType::Message),
            Self::ConnectionResponse { .. } => Some(PacketType::ClientConnectionRequest),
            Self::ClientList(_) => Some(PacketType::ClientList),
            Self::ClientConnect(_) => Some(PacketType::ClientConnect),
            Self::ClientDisconnect(_) => Some(PacketType::ClientDisconnect),
            Self::MessageHistory(_) => Some(PacketType::MessageHistory),
            Self::ServerShutdown => Some(PacketType::ServerShutdown),
            Self::ClientKick { .. } => Some(PacketType::ClientKick),
            Self::Reserved(t) => Some(*t),
            Self::Unknown(_) => None,
        }
    }

    /// Encode into a caller-supplied scratch buffer.
    pub fn encode(&self, buf: &mut BytesMut) {
        let mut w = Writer::new(buf);
        match self {
            Self::Message { username, message } => {
                w.write_u16(PacketType::Message as u16);
                w.write_string(username);
                w.write_string(message);
            }
            Self::ConnectionResponse { accepted } => {
                w.write_u16(PacketType::ClientConnectionRequest as u16);
                w.write_bool(*accepted);
            }
            Self::ClientList(users) => {
                w.write_u16(PacketType::ClientList as u16);
                w.write_array(users);
            }
            Self::ClientConnect(user) => {
                w.write_u16(PacketType::ClientConnect as u16);
                w.write_object(user);
            }
            Self::ClientDisconnect(user) => {
                w.write_u16(PacketType::ClientDisconnect as u16);
                w.write_object(user);
            }
            Self::MessageHistory(history) => {
                w.write_u16(PacketType::MessageHistory as u16);
                w.write_array(history);
            }
            Self::ServerShutdown => {
                w.write_u16(PacketType::ServerShutdown as u16);
            }
            Self::ClientKick { reason } => {
                w.write_u16(PacketType::ClientKick as u16);
                w.write_string(reason);
            }
            Self::Reserved(t) => {
                w.write_u16(*t as u16);
            }
            Self::Unknown(raw) => {
                w.write_u16(*raw);
            }
        }
    }

    /// Decode one inbound buffer.
    pub fn decode(buf: &[u8]) -> CodecResult<Self> {
        let mut r = Reader::new(buf);
        let raw = r.read_u16()?;
        let Some(packet_type) = PacketType::from_u16(raw) else {
            return Ok(Self::Unknown(raw));
        };

        match packet_type {
            PacketType::Message => Ok(Self::Message {
                username: r.read_string()?,
                message: r.read_string()?,
            }),
            PacketType::ClientConnectionRequest => Ok(Self::ConnectionResponse {
                accepted: r.read_bool()?,
            }),
            PacketType::ClientList => Ok(Self::ClientList(r.read_array()?)),
            PacketType::ClientConnect => Ok(Self::ClientConnect(r.read_object()?)),
            PacketType::ClientDisconnect => Ok(Self::ClientDisconnect(r.read_object()?)),
            PacketType::MessageHistory => Ok(Self::MessageHistory(r.read_array()?)),
            PacketType::ServerShutdown => Ok(Self::ServerShutdown),
            PacketType::ClientKick => Ok(Self::ClientKick {
                reason: r.read_string()?,
            }),
            other => Ok(Self::Reserved(other)),
        }
    }

    /// Convenience encode into a fresh buffer.
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(64);
        self.encode(&mut buf);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_server(packet: ServerPacket) -> ServerPacket {
        let mut buf = BytesMut::new();
        packet.encode(&mut buf);
        ServerPacket::decode(&buf).unwrap()
    }

    fn roundtrip_client(packet: ClientPacket) -> ClientPacket {
        let mut buf = BytesMut::new();
        packet.encode(&mut buf);
        ClientPacket::decode(&buf).unwrap()
    }

    #[test]
    fn packet_type_wire_values_match_protocol() {
        assert_eq!(PacketType::Message as u16, 1);
        assert_eq!(PacketType::ClientConnectionRequest as u16, 2);
        assert_eq!(PacketType::ClientList as u16, 4);
        assert_eq!(PacketType::ClientConnect as u16, 5);
        assert_eq!(PacketType::ClientDisconnect as u16, 7);
        assert_eq!(PacketType::MessageHistory as u16, 9);
        assert_eq!(PacketType::ServerShutdown as u16, 10);
        assert_eq!(PacketType::ClientKick as u16, 11);
    }

    #[test]
    fn client_message_roundtrip() {
        let packet = ClientPacket::Message {
            message: "hi there".to_string(),
        };
        assert_eq!(roundtrip_client(packet.clone()), packet);
    }

    #[test]
    fn connection_request_roundtrip() {
        let packet = ClientPacket::ConnectionRequest {
            color: 0xFF00_FF00,
            username: "bob".to_string(),
        };
        assert_eq!(roundtrip_client(packet.clone()), packet);
    }

    #[test]
    fn server_message_roundtrip() {
        let packet = ServerPacket::Message {
            username: "alice".to_string(),
            message: "hello".to_string(),
        };
        assert_eq!(roundtrip_server(packet.clone()), packet);
    }

    #[test]
    fn connection_response_roundtrip() {
        for accepted in [true, false] {
            let packet = ServerPacket::ConnectionResponse { accepted };
            assert_eq!(roundtrip_server(packet.clone()), packet);
        }
    }

    #[test]
    fn client_list_roundtrip_including_empty() {
        let empty = ServerPacket::ClientList(vec![]);
        assert_eq!(roundtrip_server(empty.clone()), empty);

        let full = ServerPacket::ClientList(vec![
            UserInfo {
                color: 1,
                username: "a".to_string(),
            },
            UserInfo {
                color: 2,
                username: "b".to_string(),
            },
        ]);
        assert_eq!(roundtrip_server(full.clone()), full);
    }

    #[test]
    fn message_history_roundtrip() {
        let packet = ServerPacket::MessageHistory(vec![
            ChatMessage::new("bob", "hi"),
            ChatMessage::new("SERVER", "welcome"),
        ]);
        assert_eq!(roundtrip_server(packet.clone()), packet);
    }

    #[test]
    fn kick_with_empty_reason_roundtrip() {
        let packet = ServerPacket::ClientKick {
            reason: String::new(),
        };
        assert_eq!(roundtrip_server(packet.clone()), packet);
    }

    #[test]
    fn shutdown_has_no_payload() {
        let buf = ServerPacket::ServerShutdown.to_bytes();
        assert_eq!(buf.len(), 2);
        assert_eq!(
            ServerPacket::decode(&buf).unwrap(),
            ServerPacket::ServerShutdown
        );
    }

    #[test]
    fn reserved_types_decode_without_error() {
        let mut buf = BytesMut::new();
        Writer::new(&mut buf).write_u16(PacketType::ConnectionStatus as u16);

        assert_eq!(
            ClientPacket::decode(&buf).unwrap(),
            ClientPacket::Reserved(PacketType::ConnectionStatus)
        );
        assert_eq!(
            ServerPacket::decode(&buf).unwrap(),
            ServerPacket::Reserved(PacketType::ConnectionStatus)
        );
    }

    #[test]
    fn out_of_range_type_decodes_as_unknown() {
        let mut buf = BytesMut::new();
        Writer::new(&mut buf).write_u16(999);

        assert_eq!(ClientPacket::decode(&buf).unwrap(), ClientPacket::Unknown(999));
        assert_eq!(ServerPacket::decode(&buf).unwrap(), ServerPacket::Unknown(999));
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let mut buf = BytesMut::new();
        {
            let mut w = Writer::new(&mut buf);
            w.write_u16(PacketType::Message as u16);
            w.write_u32(50); // declared string length, no bytes follow
        }
        assert!(ClientPacket::decode(&buf).is_err());
    }

    #[test]
    fn empty_buffer_is_malformed() {
        assert!(ClientPacket::decode(&[]).is_err());
        assert!(ServerPacket::decode(&[]).is_err());
    }
}
