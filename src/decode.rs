use crate::error::DecodeError;

/// Number of data bits in a complete frame.
const FRAME_BITS: u8 = 40;

// Accepted pulse widths in microseconds. The sensor opens its response
// with an ~80us marker pulse; after that the width of each high pulse
// carries the bit value.
const START_MIN_US: u16 = 79;
const START_MAX_US: u16 = 85;
const ONE_MIN_US: u16 = 68;
const ONE_MAX_US: u16 = 74;
const ZERO_MIN_US: u16 = 23;
const ZERO_MAX_US: u16 = 27;

/// Logical level of the data line during a captured pulse.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// Line held low.
    Low,
    /// Line held high.
    High,
}

/// One measured interval on the data line.
///
/// A capture layer records how long the line held a level; a window of
/// these events, in wire order, is the input to [`decode`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseEvent {
    /// Line level held for the duration of the pulse.
    pub level: Level,
    /// How long the level was held, in microseconds.
    pub duration_us: u16,
}

impl PulseEvent {
    /// Creates a pulse event with the given level and duration.
    pub const fn new(level: Level, duration_us: u16) -> Self {
        PulseEvent { level, duration_us }
    }

    /// A high pulse of the given duration.
    pub const fn high(duration_us: u16) -> Self {
        PulseEvent::new(Level::High, duration_us)
    }

    /// A low pulse of the given duration.
    pub const fn low(duration_us: u16) -> Self {
        PulseEvent::new(Level::Low, duration_us)
    }
}

/// What a single high pulse means within a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PulseKind {
    /// Start-of-frame marker; consumed without contributing a bit.
    Start,
    /// A data bit.
    Bit(bool),
}

/// Classifies a pulse duration against the timing bands.
///
/// Returns `None` for durations outside every band.
fn classify(duration_us: u16) -> Option<PulseKind> {
    match duration_us {
        START_MIN_US..=START_MAX_US => Some(PulseKind::Start),
        ONE_MIN_US..=ONE_MAX_US => Some(PulseKind::Bit(true)),
        ZERO_MIN_US..=ZERO_MAX_US => Some(PulseKind::Bit(false)),
        _ => None,
    }
}

/// Decodes one captured pulse window into a [`Reading`].
///
/// The window must contain the sensor's response in wire order: the
/// start marker followed by exactly 40 bit pulses, every event measured
/// at the high level. Low separator intervals between bits are expected
/// to be dropped by the capture layer.
///
/// The decoder is pure: it performs no I/O and keeps no state between
/// calls.
///
/// # Arguments
///
/// * `window` - Captured pulses, from the first rising edge of the
///   response onwards.
///
/// # Returns
///
/// * `Ok(Reading)` if the window holds a well-formed 40-bit frame. A
///   checksum mismatch does not fail the decode; it is reported through
///   [`Reading::checksum_ok`].
/// * `Err(DecodeError)` if the window is empty, an event has the wrong
///   level, a duration falls outside every timing band, or the bit count
///   is not exactly 40.
pub fn decode(window: &[PulseEvent]) -> Result<Reading, DecodeError> {
    // An empty window means the sensor never answered.
    if window.is_empty() {
        return Err(DecodeError::CaptureTimeout);
    }

    let mut bits: u64 = 0;
    let mut seen: u8 = 0;

    for (index, pulse) in window.iter().enumerate() {
        // The sensor signals every interval we time at the high level.
        if pulse.level != Level::High {
            return Err(DecodeError::InvalidStartEdge);
        }

        match classify(pulse.duration_us) {
            Some(PulseKind::Start) => {}
            Some(PulseKind::Bit(value)) => {
                if seen == FRAME_BITS {
                    return Err(DecodeError::ExcessPulse { index });
                }
                if value {
                    // First data bit lands at bit 39, counting down.
                    bits |= 1u64 << (FRAME_BITS - 1 - seen);
                }
                seen += 1;
            }
            None => {
                return Err(DecodeError::MalformedPulse {
                    index,
                    duration_us: pulse.duration_us,
                    level: pulse.level,
                });
            }
        }
    }

    if seen < FRAME_BITS {
        return Err(DecodeError::IncompleteFrame);
    }

    Ok(Reading::from(Frame::from_bits(bits)))
}

/// The five raw bytes of a frame, split out of the 40 data bits.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Integer part of the relative humidity, in percent.
    pub humidity_integer: u8,
    /// Fractional part of the relative humidity.
    pub humidity_fraction: u8,
    /// High byte of the 16-bit temperature field.
    pub temperature_integer: u8,
    /// Low byte of the 16-bit temperature field.
    pub temperature_fraction: u8,
    /// Checksum byte transmitted by the sensor.
    pub checksum: u8,
}

impl Frame {
    /// Splits a 40-bit accumulator into the five frame bytes.
    ///
    /// Bit 39 is the first bit on the wire; the checksum occupies the
    /// lowest byte.
    fn from_bits(bits: u64) -> Self {
        Frame {
            humidity_integer: (bits >> 32) as u8,
            humidity_fraction: (bits >> 24) as u8,
            temperature_integer: (bits >> 16) as u8,
            temperature_fraction: (bits >> 8) as u8,
            checksum: bits as u8,
        }
    }

    /// Modular-256 sum of the four data bytes.
    pub fn computed_checksum(&self) -> u8 {
        self.humidity_integer
            .wrapping_add(self.humidity_fraction)
            .wrapping_add(self.temperature_integer)
            .wrapping_add(self.temperature_fraction)
    }

    /// Whether the transmitted checksum matches the data bytes.
    pub fn checksum_ok(&self) -> bool {
        self.computed_checksum() == self.checksum
    }
}

/// Decoded measurement, stored as fixed-point tenths.
///
/// Integer fields keep the type usable on targets without an FPU; the
/// accessor methods convert for display.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reading {
    /// Relative humidity in tenths of a percent.
    pub humidity: u16,
    /// Temperature in tenths of a degree Celsius.
    pub temperature: u16,
    /// Whether the frame checksum matched the data bytes.
    pub checksum_ok: bool,
}

impl Reading {
    /// Relative humidity in percent.
    pub fn humidity_percent(&self) -> f32 {
        f32::from(self.humidity) / 10.0
    }

    /// Temperature in degrees Celsius.
    pub fn temperature_celsius(&self) -> f32 {
        f32::from(self.temperature) / 10.0
    }
}

impl From<Frame> for Reading {
    fn from(frame: Frame) -> Self {
        // The humidity integer byte carries whole percent; the 16-bit
        // temperature field is already in tenths.
        Reading {
            humidity: u16::from(frame.humidity_integer) * 10,
            temperature: u16::from_be_bytes([
                frame.temperature_integer,
                frame.temperature_fraction,
            ]),
            checksum_ok: frame.checksum_ok(),
        }
    }
}
