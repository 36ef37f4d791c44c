//! DHT11 Pulse-Width Decoder and Driver for Embedded Rust
//!
//! This crate decodes the single-wire protocol of the DHT11 temperature
//! and humidity sensor. The sensor answers a read request with a burst of
//! high pulses whose widths carry the data: an ~80us start marker, then
//! 40 bits where ~70us means 1 and ~26us means 0.
//!
//! The core is [`decode`], a pure function from a captured window of
//! [`PulseEvent`]s to a [`Reading`]. It can be fed from any capture
//! mechanism, such as GPIO polling or a timer capture peripheral. For
//! the common case the crate also ships [`Dht11`], a blocking polling
//! driver built on the [`embedded-hal`] traits.
//!
//! # Features
//! - Pure, total frame decoder with a classified error taxonomy
//! - Blocking synchronous driver using `embedded-hal` traits
//! - Designed for `no_std` environments; integer-only arithmetic
//! - Optional logging support via `defmt`
//!
//! # Dependencies
//! The driver depends on the following `embedded-hal` traits:
//! - [`InputPin`] and [`OutputPin`] for GPIO access
//! - [`DelayNs`] for accurate timing
//!
//! # Optional Features
//! - `defmt`: Implements `defmt::Format` for logging support and warns
//!   on checksum mismatches
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal
//! [`InputPin`]: embedded_hal::digital::InputPin
//! [`OutputPin`]: embedded_hal::digital::OutputPin
//! [`DelayNs`]: embedded_hal::delay::DelayNs

#![cfg_attr(not(test), no_std)]

pub mod decode;
pub mod dht11;
pub mod error;

pub use decode::{Frame, Level, PulseEvent, Reading, decode};
pub use dht11::Dht11;
pub use error::{DecodeError, DhtError};
