//! Listens on a stream socket, decodes one request per connection,
//! dispatches to a registered service by name, and writes the response
//! back.

mod error;
mod naming;
mod server;
mod service;

pub use error::{Error, Result};
pub use naming::NamingClient;
pub use server::RpcServer;
pub use service::{no_such_method, no_such_service, Service};
