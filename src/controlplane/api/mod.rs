//! API Module
//!
//! REST surface of the storage control facade.

pub mod rest;
pub mod server;

pub use rest::*;
pub use server::*;
