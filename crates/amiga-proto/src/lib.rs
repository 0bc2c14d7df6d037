//! Protobuf messages exchanged with the Amiga.
//!
//! - [`nexus`]: control requests/replies, feedback and video stream
//! - [`nodo`]: parameter configuration
//! - [`hal`]: payloads carried in hardware-feed envelopes
//!
//! Messages derive [`prost::Message`]; encode with `encode_to_vec` and decode
//! with `Message::decode`.

pub mod hal;
pub mod nexus;
pub mod nodo;

pub use prost::Message;
