pub mod store;
pub mod transport;

pub use store::UserStore;
pub use transport::Transport;
