//! Builtin plugins registered at startup. Everything else loads from the
//! plugins directory as a dynamic library.

pub mod admin;
pub mod menu;
pub mod ping;
