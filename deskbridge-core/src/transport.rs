//! Seams between the session and whatever carries calls to the remote side

use crate::error::Result;
use crate::payload::{Envelope, Params, Payload};
use crate::session::SessionConfig;
use async_trait::async_trait;

/// An established, handshaken-or-not channel to the remote facade
#[async_trait]
pub trait Transport: Send {
    /// Perform the protocol handshake; called exactly once after connect
    async fn handshake(&mut self) -> Result<()>;

    /// Send one operation and wait for its envelope
    async fn call(&mut self, operation: &str, params: Params) -> Result<Envelope>;

    /// Tear the channel down
    async fn close(&mut self) -> Result<()>;
}

/// Opens transports from a validated configuration
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &SessionConfig) -> Result<Box<dyn Transport>>;
}

/// Anything that can execute a named operation remotely
///
/// The session manager is the production implementation; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait RemoteFacade: Send + Sync {
    async fn invoke(&self, operation: &str, params: Params) -> Result<Payload>;
}
