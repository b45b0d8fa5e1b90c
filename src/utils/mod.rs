//! Utility modules shared by the engine and the server.

pub mod hash;
pub mod header;
pub mod html;
pub mod mime;
pub mod plural;
pub mod route;
pub mod xml;
