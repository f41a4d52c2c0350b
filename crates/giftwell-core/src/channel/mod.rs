//! Real-Time Propagation Channel
//!
//! One persistent push subscription per authenticated session. Whenever any
//! viewer's mutation commits server-side, the authority fans the new record
//! out to every subscribed session; this module receives those events and
//! feeds them to the engine over a bounded queue.

mod dispatcher;
mod socket;
mod types;

pub use dispatcher::spawn_dispatcher;
pub use socket::{SocketChannel, SocketConfig};
pub use types::{ChannelStatus, PushEvent};
