// p1port.rs — P1 port telegram acquisition

use std::fmt::Write as _;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::*;

/// First byte of every telegram.
pub const SYNC_MARKER: u8 = 0xDB;

/// Consecutive empty reads tolerated before the port is declared dead.
pub const DEFAULT_EMPTY_READ_LIMIT: u32 = 10;

const FIXTURE_BYTES_PER_LINE: usize = 22;

/// Byte-level view of the serial link the meter talks on.
pub trait ByteSource {
    /// Number of bytes that can be read right now without blocking.
    fn bytes_available(&mut self) -> usize;
    fn read_byte(&mut self) -> Option<u8>;
}

impl ByteSource for VecDeque<u8> {
    fn bytes_available(&mut self) -> usize {
        self.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.pop_front()
    }
}

/// Request line for transports that send without being asked.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRequestPin;

impl ErrorType for NoRequestPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for NoRequestPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Collects one telegram per call from a [`ByteSource`] into a bounded buffer.
///
/// The data request line is active low and is pulled low only for the
/// duration of the read. A fake telegram, when installed, replaces the
/// transport completely.
pub struct TelegramReader<S, P, const N: usize = MAX_TELEGRAM_LEN> {
    source: S,
    request_pin: P,
    fake: Option<heapless::Vec<u8, N>>,
    empty_reads: u32,
    empty_read_limit: u32,
}

impl<S, P, const N: usize> TelegramReader<S, P, N>
where
    S: ByteSource,
    P: OutputPin,
{
    pub fn new(source: S, request_pin: P) -> Self {
        Self {
            source,
            request_pin,
            fake: None,
            empty_reads: 0,
            empty_read_limit: DEFAULT_EMPTY_READ_LIMIT,
        }
    }

    pub fn with_empty_read_limit(mut self, limit: u32) -> Self {
        self.empty_read_limit = limit;
        self
    }

    /// Replay `telegram` on every read instead of touching the transport.
    pub fn set_fake_telegram(&mut self, telegram: &[u8]) -> Result<(), DecodeError> {
        let fake = heapless::Vec::from_slice(telegram).map_err(|_| DecodeError::Oversize {
            needed: telegram.len(),
            capacity: N,
        })?;
        info!("P1: Using fake telegram ({} bytes) instead of serial data", fake.len());
        self.fake = Some(fake);
        Ok(())
    }

    pub fn clear_fake_telegram(&mut self) {
        self.fake = None;
    }

    pub fn empty_reads(&self) -> u32 {
        self.empty_reads
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Read one telegram into `frame`, returning its length.
    ///
    /// A wrong first byte is [`DecodeError::FatalSync`]. An empty read is
    /// [`DecodeError::NoData`] until more than the configured number of empty
    /// reads happened in a row, then [`DecodeError::FatalStarvation`].
    pub fn read_telegram(&mut self, frame: &mut heapless::Vec<u8, N>) -> Result<usize, DecodeError> {
        frame.clear();

        if let Some(fake) = &self.fake {
            debug!("P1: Reading fake telegram");
            frame.clone_from(fake);
            if let Some(&first) = frame.first() {
                check_sync(first)?;
            }
        } else {
            self.request(true);
            let filled = self.fill(frame);
            self.request(false);
            filled?;
        }

        if frame.is_empty() {
            self.empty_reads += 1;
            if self.empty_reads > self.empty_read_limit {
                error!(
                    "P1: No data received for {} reads, the port looks dead",
                    self.empty_reads
                );
                return Err(DecodeError::FatalStarvation {
                    reads: self.empty_reads,
                });
            }
            return Err(DecodeError::NoData);
        }

        self.empty_reads = 0;
        debug!("P1: Read {} bytes", frame.len());
        trace!("P1: Telegram dump:\n{}", telegram_fixture(frame));
        Ok(frame.len())
    }

    fn fill(&mut self, frame: &mut heapless::Vec<u8, N>) -> Result<(), DecodeError> {
        while !frame.is_full() && self.source.bytes_available() > 0 {
            let Some(byte) = self.source.read_byte() else {
                break;
            };
            if frame.is_empty() {
                check_sync(byte)?;
            }
            // capacity checked above
            let _ = frame.push(byte);
        }
        Ok(())
    }

    fn request(&mut self, on: bool) {
        let res = if on {
            self.request_pin.set_low()
        } else {
            self.request_pin.set_high()
        };
        if let Err(e) = res {
            warn!("P1: Cannot drive data request line: {e:?}");
        }
    }
}

fn check_sync(first: u8) -> Result<(), DecodeError> {
    if first != SYNC_MARKER {
        error!("P1: First byte is 0x{first:02X}, should be 0xDB. Device needs a reset to re-sync.");
        return Err(DecodeError::FatalSync { found: first });
    }
    Ok(())
}

/// Format a raw telegram as a byte array literal, ready to be pasted into a
/// test as a fake telegram.
pub fn telegram_fixture(telegram: &[u8]) -> String {
    let mut out = format!("const FAKE_TELEGRAM: [u8; {}] = [\n", telegram.len());
    for chunk in telegram.chunks(FIXTURE_BYTES_PER_LINE) {
        out.push_str("   ");
        for byte in chunk {
            let _ = write!(out, " 0x{byte:02X},");
        }
        out.push('\n');
    }
    out.push_str("];");
    out
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[derive(Clone, Default)]
    struct RecordingPin(Rc<RefCell<Vec<bool>>>);

    impl ErrorType for RecordingPin {
        type Error = core::convert::Infallible;
    }

    impl OutputPin for RecordingPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0.borrow_mut().push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0.borrow_mut().push(true);
            Ok(())
        }
    }

    fn source(bytes: &[u8]) -> VecDeque<u8> {
        bytes.iter().copied().collect()
    }

    #[test]
    fn reads_until_capacity() {
        let pin = RecordingPin::default();
        let mut reader: TelegramReader<_, _, 8> =
            TelegramReader::new(source(&[0xDB, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]), pin.clone());
        let mut frame = heapless::Vec::new();

        assert_eq!(reader.read_telegram(&mut frame), Ok(8));
        assert_eq!(&frame[..], &[0xDB, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(reader.source_mut().len(), 3);
        assert_eq!(*pin.0.borrow(), vec![false, true]);
    }

    #[test]
    fn wrong_first_byte_is_fatal_and_releases_request_line() {
        let pin = RecordingPin::default();
        let mut reader: TelegramReader<_, _> =
            TelegramReader::new(source(&[0x7E, 0xDB, 0x00]), pin.clone());
        let mut frame = heapless::Vec::new();

        let err = reader.read_telegram(&mut frame).unwrap_err();
        assert_eq!(err, DecodeError::FatalSync { found: 0x7E });
        assert!(err.is_fatal());
        assert_eq!(*pin.0.borrow(), vec![false, true]);
    }

    #[test]
    fn starvation_after_limit() {
        let mut reader: TelegramReader<_, _> =
            TelegramReader::new(VecDeque::new(), NoRequestPin).with_empty_read_limit(3);
        let mut frame = heapless::Vec::new();

        for n in 1..=3 {
            assert_eq!(reader.read_telegram(&mut frame), Err(DecodeError::NoData));
            assert_eq!(reader.empty_reads(), n);
        }
        assert_eq!(
            reader.read_telegram(&mut frame),
            Err(DecodeError::FatalStarvation { reads: 4 })
        );
    }

    #[test]
    fn data_resets_empty_read_count() {
        let mut reader: TelegramReader<_, _> = TelegramReader::new(VecDeque::new(), NoRequestPin);
        let mut frame = heapless::Vec::new();

        assert_eq!(reader.read_telegram(&mut frame), Err(DecodeError::NoData));
        assert_eq!(reader.read_telegram(&mut frame), Err(DecodeError::NoData));
        reader.source_mut().extend([0xDB, 0x01]);
        assert_eq!(reader.read_telegram(&mut frame), Ok(2));
        assert_eq!(reader.empty_reads(), 0);
    }

    #[test]
    fn fake_telegram_bypasses_transport() {
        let pin = RecordingPin::default();
        let mut reader: TelegramReader<_, _> = TelegramReader::new(source(&[0xDB, 9, 9]), pin.clone());
        reader.set_fake_telegram(&[0xDB, 0x30, 0x00]).unwrap();
        let mut frame = heapless::Vec::new();

        assert_eq!(reader.read_telegram(&mut frame), Ok(3));
        assert_eq!(reader.read_telegram(&mut frame), Ok(3));
        assert_eq!(&frame[..], &[0xDB, 0x30, 0x00]);
        assert_eq!(reader.source_mut().len(), 3);
        assert!(pin.0.borrow().is_empty());

        reader.clear_fake_telegram();
        assert_eq!(reader.read_telegram(&mut frame), Ok(3));
        assert_eq!(&frame[..], &[0xDB, 9, 9]);
    }

    #[test]
    fn fake_telegram_is_sync_checked() {
        let mut reader: TelegramReader<_, _> = TelegramReader::new(VecDeque::new(), NoRequestPin);
        reader.set_fake_telegram(&[0x00, 0xDB]).unwrap();
        let mut frame = heapless::Vec::new();

        assert_eq!(
            reader.read_telegram(&mut frame),
            Err(DecodeError::FatalSync { found: 0x00 })
        );
    }

    #[test]
    fn oversized_fake_telegram_is_rejected() {
        let mut reader: TelegramReader<_, _, 4> = TelegramReader::new(VecDeque::new(), NoRequestPin);
        assert_eq!(
            reader.set_fake_telegram(&[0xDB; 5]),
            Err(DecodeError::Oversize {
                needed: 5,
                capacity: 4
            })
        );
    }

    #[test]
    fn fixture_dump_layout() {
        let telegram: Vec<u8> = (0..23).collect();
        let dump = telegram_fixture(&telegram);
        let lines: Vec<&str> = dump.lines().collect();

        assert_eq!(lines[0], "const FAKE_TELEGRAM: [u8; 23] = [");
        assert_eq!(lines[1].matches("0x").count(), 22);
        assert_eq!(lines[2], "    0x16,");
        assert_eq!(lines[3], "];");
    }
}
// EOF
