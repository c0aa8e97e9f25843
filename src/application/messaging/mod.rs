pub mod dispatcher;
pub mod parser;

pub use dispatcher::{DedupWindow, Dispatcher};
pub use parser::MessageParser;
