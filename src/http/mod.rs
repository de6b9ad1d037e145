//! A small HTTP/1.1 server: an incremental request framer, a response
//! builder, a URI dispatcher bridging to the store, and the Tokio
//! connection-handling loop that ties them together.

pub mod dispatch;
pub mod framer;
pub mod reply;
pub mod server;

pub use dispatch::AppState;
pub use server::run;
