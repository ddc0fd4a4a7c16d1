use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rconlink_frame::{Frame, PacketType, RconCodec, AUTH_FAILED_ID};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Perform the auth exchange on a freshly opened stream.
///
/// Sends one Auth packet carrying `password` and waits, within `timeout`,
/// for exactly one reply. A reply id of -1 means the password was rejected.
pub async fn authenticate<T>(
    framed: &mut Framed<T, RconCodec>,
    request_id: i32,
    password: &str,
    timeout: Duration,
) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let reply = tokio::time::timeout(timeout, exchange(framed, request_id, password))
        .await
        .map_err(|_| {
            ClientError::Connection(format!(
                "authentication timed out after {}ms",
                timeout.as_millis()
            ))
        })??;

    if reply.request_id == AUTH_FAILED_ID {
        return Err(ClientError::Authentication(
            "server rejected the RCON password".to_string(),
        ));
    }

    if reply.request_id != request_id || reply.packet_type != PacketType::AUTH_RESPONSE {
        debug!(
            expected = request_id,
            request_id = reply.request_id,
            packet_type = %reply.packet_type,
            "unexpected auth reply shape, accepting"
        );
    }
    Ok(())
}

async fn exchange<T>(
    framed: &mut Framed<T, RconCodec>,
    request_id: i32,
    password: &str,
) -> Result<Frame>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    framed
        .send(Frame::new(
            request_id,
            PacketType::Auth,
            password.as_bytes().to_vec(),
        ))
        .await?;
    match framed.next().await {
        Some(reply) => Ok(reply?),
        None => Err(ClientError::Connection(
            "server closed the connection during authentication".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exchange_with(reply_id: Option<i32>, password: &str) -> Result<()> {
        let (client, server) = tokio::io::duplex(1024);
        let mut client = Framed::new(client, RconCodec::default());
        let mut server = Framed::new(server, RconCodec::default());

        let peer = tokio::spawn(async move {
            let request = server.next().await.unwrap().unwrap();
            if let Some(id) = reply_id {
                let id = if id == 0 { request.request_id } else { id };
                server
                    .send(Frame::new(id, PacketType::AUTH_RESPONSE, ""))
                    .await
                    .unwrap();
            }
            (request, server)
        });

        let result = authenticate(&mut client, 1, password, Duration::from_millis(100)).await;
        let (request, _server) = peer.await.unwrap();
        assert_eq!(request.packet_type, PacketType::Auth);
        assert_eq!(request.text(), password);
        result
    }

    #[tokio::test]
    async fn matching_reply_authenticates() {
        exchange_with(Some(0), "pw").await.unwrap();
    }

    #[tokio::test]
    async fn minus_one_reply_is_authentication_error() {
        for secret in ["", "pw", "a much longer secret with spaces"] {
            let err = exchange_with(Some(AUTH_FAILED_ID), secret)
                .await
                .unwrap_err();
            assert!(matches!(err, ClientError::Authentication(_)), "{err}");
        }
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let err = exchange_with(None, "pw").await.unwrap_err();
        assert!(matches!(err, ClientError::Connection(ref msg) if msg.contains("timed out")));
    }
}
