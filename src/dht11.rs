use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::decode::{PulseEvent, Reading, decode};
use crate::error::DhtError;

/// Duration of the start request, in milliseconds.
const START_REQUEST_MS: u32 = 10;

/// Maximum time (in microseconds) the line may hold one level before the
/// capture window is considered over.
const TIMEOUT_US: u16 = 100;

/// Capacity of the capture window, in pulse events.
///
/// A complete frame needs 41 events; the headroom lets excess pulses be
/// captured and reported instead of silently dropped.
const WINDOW_CAPACITY: usize = 64;

/// Driver for the DHT11 temperature and humidity sensor.
pub struct Dht11<PIN, D> {
    pin: PIN,
    delay: D,
}

impl<PIN, DELAY, E> Dht11<PIN, DELAY>
where
    PIN: InputPin<Error = E> + OutputPin<Error = E>,
    DELAY: DelayNs,
{
    /// Creates a new instance of the DHT11 driver.
    ///
    /// # Arguments
    ///
    /// * `pin` - The GPIO pin connected to the DHT11 data line. Must support both input and output.
    /// * `delay` - A delay provider implementing the `DelayNs` trait.
    pub fn new(pin: PIN, delay: DELAY) -> Self {
        Dht11 { pin, delay }
    }

    /// Reads one measurement from the sensor.
    ///
    /// This performs the complete exchange: sending the start request,
    /// capturing the sensor's pulse response, and decoding it into a
    /// [`Reading`]. The sensor needs at least 2 seconds between reads;
    /// pacing is the caller's responsibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Reading)` if the response decodes into a frame. A checksum
    ///   mismatch does not fail the read; it is reported through
    ///   [`Reading::checksum_ok`].
    /// * `Err(DhtError)` if a pin operation fails or the captured window
    ///   does not decode.
    pub fn read(&mut self) -> Result<Reading, DhtError<E>> {
        self.trigger()?;

        let mut window = [PulseEvent::high(0); WINDOW_CAPACITY];
        let captured = self.capture(&mut window)?;
        let reading = decode(captured).map_err(DhtError::Decode)?;

        #[cfg(feature = "defmt")]
        if !reading.checksum_ok {
            defmt::warn!("checksum mismatch in sensor frame");
        }

        Ok(reading)
    }

    /// Sends the start request: data line low for 10 ms, then released.
    fn trigger(&mut self) -> Result<(), DhtError<E>> {
        self.pin.set_low()?;
        self.delay.delay_ms(START_REQUEST_MS);
        self.pin.set_high()?;
        Ok(())
    }

    /// Captures the sensor's response into `window`, returning the filled
    /// prefix.
    ///
    /// Timing starts at the first rising edge after the start request.
    /// Each high interval becomes one event; the low separators between
    /// them are skipped. The window ends once the line parks at either
    /// level for `TIMEOUT_US`, and a sensor that never answers yields an
    /// empty window.
    fn capture<'w>(
        &mut self,
        window: &'w mut [PulseEvent],
    ) -> Result<&'w [PulseEvent], DhtError<E>> {
        // Response low, then the first rising edge. A parked line means
        // no response at all.
        if !self.wait_for_low()? || !self.wait_for_high()? {
            return Ok(&[]);
        }

        let mut count = 0;
        while count < window.len() {
            let duration_us = self.measure_high()?;
            if duration_us >= TIMEOUT_US {
                // Bus idles high between frames; the response is over.
                break;
            }
            window[count] = PulseEvent::high(duration_us);
            count += 1;

            // Skip the low separator before the next pulse.
            if !self.wait_for_high()? {
                break;
            }
        }

        Ok(&window[..count])
    }

    /// Measures how long the line stays high, in microseconds, capped at
    /// `TIMEOUT_US`.
    fn measure_high(&mut self) -> Result<u16, DhtError<E>> {
        let mut elapsed_us = 0;
        while elapsed_us < TIMEOUT_US {
            if self.pin.is_low()? {
                break;
            }
            self.delay.delay_us(1);
            elapsed_us += 1;
        }
        Ok(elapsed_us)
    }

    /// Waits until the data line goes high; `false` on timeout.
    fn wait_for_high(&mut self) -> Result<bool, DhtError<E>> {
        Self::wait_for_state(&mut self.delay, || self.pin.is_high())
    }

    /// Waits until the data line goes low; `false` on timeout.
    fn wait_for_low(&mut self) -> Result<bool, DhtError<E>> {
        Self::wait_for_state(&mut self.delay, || self.pin.is_low())
    }

    /// Generic wait loop that checks a pin condition until true or timeout.
    ///
    /// A timeout is not an error at this level; it marks the end (or the
    /// absence) of the capture window.
    fn wait_for_state<F>(delay: &mut DELAY, mut condition: F) -> Result<bool, DhtError<E>>
    where
        F: FnMut() -> Result<bool, E>,
    {
        for _ in 0..TIMEOUT_US {
            if condition()? {
                return Ok(true);
            }
            delay.delay_us(1);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use embedded_hal_mock::eh1::delay::CheckedDelay;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::delay::Transaction as DelayTx;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTx,
    };

    const START_US: u16 = 82;
    const ONE_US: u16 = 71;
    const ZERO_US: u16 = 25;

    // Trigger: driver pulls the line low, then releases it.
    fn trigger_sequence() -> Vec<PinTx> {
        vec![PinTx::set(PinState::Low), PinTx::set(PinState::High)]
    }

    // Sensor acknowledges the start request by pulling the line low.
    fn response_start() -> Vec<PinTx> {
        vec![PinTx::get(PinState::Low)]
    }

    // One high pulse: a rising-edge poll, `duration_us` polls while the
    // line holds high, and the falling-edge poll that ends it.
    fn pulse(duration_us: u16) -> Vec<PinTx> {
        let mut states = vec![PinTx::get(PinState::High)];
        states.extend(std::iter::repeat_n(
            PinTx::get(PinState::High),
            duration_us as usize,
        ));
        states.push(PinTx::get(PinState::Low));
        states
    }

    // Encode one byte as 8 bit pulses (MSB first).
    fn encode_byte(byte: u8) -> Vec<PinTx> {
        (0..8)
            .flat_map(|i| {
                let bit = (byte >> (7 - i)) & 1;
                pulse(if bit == 1 { ONE_US } else { ZERO_US })
            })
            .collect()
    }

    // After the last bit the line parks high until the measurement loop
    // gives up: one rising-edge poll plus TIMEOUT_US polls.
    fn idle_tail() -> Vec<PinTx> {
        std::iter::repeat_n(PinTx::get(PinState::High), 1 + TIMEOUT_US as usize).collect()
    }

    fn frame_exchange(bytes: [u8; 5]) -> Vec<PinTx> {
        let mut states = trigger_sequence();
        states.extend(response_start());
        states.extend(pulse(START_US));
        for byte in bytes {
            states.extend(encode_byte(byte));
        }
        states.extend(idle_tail());
        states
    }

    #[test]
    fn test_trigger_sequence() {
        let mut pin = PinMock::new(&trigger_sequence());

        let delay_transactions = vec![DelayTx::delay_ms(10)];
        let mut delay = CheckedDelay::new(&delay_transactions);

        let mut dht = Dht11::new(pin.clone(), &mut delay);
        dht.trigger().unwrap();

        pin.done();
        delay.done();
    }

    #[test]
    fn test_wait_for_state() {
        let mut pin = PinMock::new(&[
            // wait_for_high: two misses, then the line goes high
            PinTx::get(PinState::Low),
            PinTx::get(PinState::Low),
            PinTx::get(PinState::High),
            // wait_for_low
            PinTx::get(PinState::Low),
        ]);

        let delay_transactions = vec![DelayTx::delay_us(1), DelayTx::delay_us(1)];
        let mut delay = CheckedDelay::new(&delay_transactions);

        let mut dht = Dht11::new(pin.clone(), &mut delay);
        assert!(dht.wait_for_high().unwrap());
        assert!(dht.wait_for_low().unwrap());

        pin.done();
        delay.done();
    }

    #[test]
    fn test_wait_for_state_timeout() {
        let pin_expects: Vec<PinTx> = (0..100).map(|_| PinTx::get(PinState::High)).collect();
        let mut pin = PinMock::new(&pin_expects);

        let delay_expects: Vec<DelayTx> = (0..100).map(|_| DelayTx::delay_us(1)).collect();
        let mut delay = CheckedDelay::new(&delay_expects);

        let mut dht = Dht11::new(pin.clone(), &mut delay);
        assert!(!dht.wait_for_low().unwrap());

        pin.done();
        delay.done();
    }

    #[test]
    fn test_measure_high() {
        // Five polls at high, then the falling edge.
        let mut pin_expects: Vec<PinTx> = (0..5).map(|_| PinTx::get(PinState::High)).collect();
        pin_expects.push(PinTx::get(PinState::Low));
        let mut pin = PinMock::new(&pin_expects);

        let delay_expects: Vec<DelayTx> = (0..5).map(|_| DelayTx::delay_us(1)).collect();
        let mut delay = CheckedDelay::new(&delay_expects);

        let mut dht = Dht11::new(pin.clone(), &mut delay);
        assert_eq!(dht.measure_high().unwrap(), 5);

        pin.done();
        delay.done();
    }

    #[test]
    fn test_measure_high_caps_at_timeout() {
        let pin_expects: Vec<PinTx> = (0..100).map(|_| PinTx::get(PinState::High)).collect();
        let mut pin = PinMock::new(&pin_expects);

        let delay_expects: Vec<DelayTx> = (0..100).map(|_| DelayTx::delay_us(1)).collect();
        let mut delay = CheckedDelay::new(&delay_expects);

        let mut dht = Dht11::new(pin.clone(), &mut delay);
        assert_eq!(dht.measure_high().unwrap(), 100);

        pin.done();
        delay.done();
    }

    #[test]
    fn test_capture_durations() {
        let mut states = response_start();
        states.extend(pulse(START_US));
        states.extend(pulse(ONE_US));
        states.extend(pulse(ZERO_US));
        states.extend(idle_tail());

        let mut pin = PinMock::new(&states);
        let mut dht = Dht11::new(pin.clone(), NoopDelay);

        let mut window = [PulseEvent::high(0); WINDOW_CAPACITY];
        let captured = dht.capture(&mut window).unwrap();

        assert_eq!(
            captured,
            &[
                PulseEvent::high(START_US),
                PulseEvent::high(ONE_US),
                PulseEvent::high(ZERO_US),
            ]
        );

        pin.done();
    }

    #[test]
    fn test_read_valid() {
        // 50% RH, 31.2C, checksum 0x32 + 0x00 + 0x01 + 0x38 = 0x6B
        let states = frame_exchange([0x32, 0x00, 0x01, 0x38, 0x6B]);
        let mut pin = PinMock::new(&states);

        let mut dht = Dht11::new(pin.clone(), NoopDelay);
        let reading = dht.read().unwrap();

        assert_eq!(
            reading,
            Reading {
                humidity: 500,
                temperature: 312,
                checksum_ok: true,
            }
        );

        pin.done();
    }

    #[test]
    fn test_read_checksum_mismatch() {
        let states = frame_exchange([0x32, 0x00, 0x01, 0x38, 0x6C]);
        let mut pin = PinMock::new(&states);

        let mut dht = Dht11::new(pin.clone(), NoopDelay);
        let reading = dht.read().unwrap();

        assert!(!reading.checksum_ok);
        assert_eq!(reading.humidity, 500);
        assert_eq!(reading.temperature, 312);

        pin.done();
    }

    #[test]
    fn test_read_no_response() {
        // The line never leaves high after the trigger.
        let mut states = trigger_sequence();
        states.extend((0..100).map(|_| PinTx::get(PinState::High)));
        let mut pin = PinMock::new(&states);

        let mut dht = Dht11::new(pin.clone(), NoopDelay);

        assert_eq!(
            dht.read().unwrap_err(),
            DhtError::Decode(DecodeError::CaptureTimeout)
        );

        pin.done();
    }

    #[test]
    fn test_read_stalled_mid_frame() {
        // Start marker and two bits, then the line parks low.
        let mut states = trigger_sequence();
        states.extend(response_start());
        states.extend(pulse(START_US));
        states.extend(pulse(ONE_US));
        states.extend(pulse(ZERO_US));
        states.extend((0..100).map(|_| PinTx::get(PinState::Low)));
        let mut pin = PinMock::new(&states);

        let mut dht = Dht11::new(pin.clone(), NoopDelay);

        assert_eq!(
            dht.read().unwrap_err(),
            DhtError::Decode(DecodeError::IncompleteFrame)
        );

        pin.done();
    }
}
