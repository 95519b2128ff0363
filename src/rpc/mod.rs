//! Framed command link.
//!
//! Binary request/response protocol over a point-to-point byte stream
//! (USB-CDC or UART).
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      Link Stack                            │
//! │                                                            │
//! │  ┌───────────┐   ┌───────────┐   ┌──────────────────────┐  │
//! │  │ Transport │──▶│  Codec    │──▶│  Engine (poll)       │  │
//! │  │ (trait)   │   │ (resync)  │   │  → CommandRouter     │  │
//! │  └───────────┘   └───────────┘   └──────────────────────┘  │
//! │       ▲                                    │               │
//! │       └────────── response frame ──────────┘               │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod codec;
pub mod engine;
pub mod frame;
pub mod router;
pub mod transport;
