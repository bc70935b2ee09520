//! # Channel Sessions
//!
//! A bidirectional, in-process message channel between two parties. Every
//! receive is bounded by the session timeout; a timed-out session is
//! abandoned by the caller.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::ProtocolError;

const CHANNEL_CAPACITY: usize = 16;

/// One party's end of a session.
#[derive(Debug)]
pub struct ChannelSession<M> {
    tx: mpsc::Sender<M>,
    rx: mpsc::Receiver<M>,
    timeout: Duration,
}

impl<M: Send + 'static> ChannelSession<M> {
    /// Two connected ends sharing `timeout`.
    pub fn pair(timeout: Duration) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (b_tx, a_rx) = mpsc::channel(CHANNEL_CAPACITY);
        (
            Self {
                tx: a_tx,
                rx: a_rx,
                timeout,
            },
            Self {
                tx: b_tx,
                rx: b_rx,
                timeout,
            },
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Deliver `message` to the peer.
    pub async fn send(&self, message: M) -> Result<(), ProtocolError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| ProtocolError::ChannelClosed)
    }

    /// Wait up to the session timeout for the peer's next message.
    pub async fn receive(&mut self, expecting: &'static str) -> Result<M, ProtocolError> {
        match tokio::time::timeout(self.timeout, self.rx.recv()).await {
            Ok(Some(message)) => Ok(message),
            Ok(None) => Err(ProtocolError::ChannelClosed),
            Err(_) => Err(ProtocolError::Timeout {
                waited: self.timeout,
                expecting,
            }),
        }
    }

    /// Send `message`, then wait for the reply.
    pub async fn send_and_receive(
        &mut self,
        message: M,
        expecting: &'static str,
    ) -> Result<M, ProtocolError> {
        self.send(message).await?;
        self.receive(expecting).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn messages_cross_in_both_directions() {
        let (mut a, mut b) = ChannelSession::<u32>::pair(Duration::from_secs(1));
        a.send(1).await.unwrap();
        assert_eq!(b.receive("number").await.unwrap(), 1);
        let responder = tokio::spawn(async move {
            let n = b.receive("number").await.unwrap();
            b.send(n * 10).await.unwrap();
        });
        assert_eq!(a.send_and_receive(4, "reply").await.unwrap(), 40);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let (mut a, _b) = ChannelSession::<u32>::pair(Duration::from_millis(20));
        let err = a.receive("reply").await.unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout { expecting: "reply", .. }));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn dropped_peer_closes_channel() {
        let (mut a, b) = ChannelSession::<u32>::pair(Duration::from_secs(1));
        drop(b);
        assert!(matches!(a.send(1).await, Err(ProtocolError::ChannelClosed)));
        assert!(matches!(a.receive("reply").await, Err(ProtocolError::ChannelClosed)));
    }
}
