use crate::decode::Level;

/// Ways a captured pulse window can fail to decode.
///
/// Every variant is recoverable by retrying on the next scheduled read.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The capture window is empty; the sensor never responded.
    CaptureTimeout,
    /// An event was measured at low level. Every interval of a valid
    /// response is timed at the high level, so this indicates bus noise
    /// or a misfire.
    InvalidStartEdge,
    /// A pulse duration matched no timing band.
    MalformedPulse {
        /// Position of the offending event in the window.
        index: usize,
        /// The unclassifiable duration, in microseconds.
        duration_us: u16,
        /// Level the event was measured at.
        level: Level,
    },
    /// The window ended before 40 data bits were seen.
    IncompleteFrame,
    /// A data pulse arrived after the frame was already full.
    ExcessPulse {
        /// Position of the offending event in the window.
        index: usize,
    },
}

/// Possible errors from the DHT11 driver.
#[derive(Debug, PartialEq, Eq)]
pub enum DhtError<E> {
    /// The captured window did not decode into a frame.
    Decode(DecodeError),
    /// Error from the GPIO pin (input/output).
    PinError(E),
}

impl<E> From<E> for DhtError<E> {
    fn from(value: E) -> Self {
        Self::PinError(value)
    }
}
