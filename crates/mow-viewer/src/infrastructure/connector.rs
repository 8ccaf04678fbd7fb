//! The production [`Connector`]: dispatches on transport kind.

use async_trait::async_trait;
use mow_core::ingest::{ConnectError, Connector, TransportLink};
use mow_core::{Endpoint, TransportKind};

use crate::infrastructure::{websocket, webtransport};

/// Opens real WebTransport / WebSocket connections.
#[derive(Debug, Clone)]
pub struct NetworkConnector {
    accept_invalid_certs: bool,
    queue_capacity: usize,
}

impl NetworkConnector {
    pub fn new(accept_invalid_certs: bool, queue_capacity: usize) -> Self {
        Self {
            accept_invalid_certs,
            queue_capacity,
        }
    }
}

#[async_trait]
impl Connector for NetworkConnector {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        kind: TransportKind,
    ) -> Result<TransportLink, ConnectError> {
        let url = endpoint.url(kind);
        match kind {
            TransportKind::Multiplexed => {
                webtransport::connect(&url, self.accept_invalid_certs).await
            }
            TransportKind::OrderedByte => {
                websocket::connect(&url, self.accept_invalid_certs, self.queue_capacity).await
            }
        }
    }
}
