pub mod errors;
pub mod messaging;
