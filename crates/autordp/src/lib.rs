#![doc = include_str!("../README.md")]

pub use autordp_client as client;
pub use autordp_connector as connector;
pub use autordp_core as core;
pub use autordp_graphics as graphics;
pub use autordp_pdu as pdu;
pub use autordp_session as session;
pub use autordp_tls as tls;
pub use autordp_tokio as tokio;
