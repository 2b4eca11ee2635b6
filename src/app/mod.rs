pub mod forum;
pub mod keep_alive;
pub mod server;

pub use forum::{ForumTrigger, ThreadWatcher};
pub use keep_alive::KeepAlive;
