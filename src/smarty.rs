// smarty.rs — Luxembourg "smarty" meter: read, decrypt and decode one telegram

use embedded_hal::digital::OutputPin;

use crate::*;

/// Decoder for one meter. Owns the frame and plaintext buffers and the
/// snapshot, all of capacity `N`, and reuses them on every cycle.
pub struct SmartyMeter<S, P, const N: usize = MAX_TELEGRAM_LEN> {
    key: [u8; KEY_LEN],
    tag_policy: TagPolicy,
    reader: TelegramReader<S, P, N>,
    frame: heapless::Vec<u8, N>,
    plaintext: heapless::Vec<u8, N>,
    snapshot: RegisterSnapshot,
}

impl<S, P, const N: usize> SmartyMeter<S, P, N>
where
    S: ByteSource,
    P: OutputPin,
{
    pub fn new(key: [u8; KEY_LEN], source: S, request_pin: P) -> Self {
        Self {
            key,
            tag_policy: TagPolicy::default(),
            reader: TelegramReader::new(source, request_pin),
            frame: heapless::Vec::new(),
            plaintext: heapless::Vec::new(),
            snapshot: RegisterSnapshot::new(),
        }
    }

    pub fn from_config(config: &MyConfig, source: S, request_pin: P) -> AppResult<Self> {
        let key = config
            .decrypt_key_bytes()
            .ok_or_else(|| AppError::Message("No valid decrypt_key configured (need 32 hex chars)".into()))?;
        let policy = if config.verify_tag {
            TagPolicy::Verify
        } else {
            TagPolicy::Ignore
        };
        Ok(Self::new(key, source, request_pin)
            .with_tag_policy(policy)
            .with_empty_read_limit(config.empty_read_limit))
    }

    pub fn with_tag_policy(mut self, policy: TagPolicy) -> Self {
        if policy == TagPolicy::Ignore {
            warn!("Smarty: GCM tag verification disabled");
        }
        self.tag_policy = policy;
        self
    }

    pub fn with_empty_read_limit(mut self, limit: u32) -> Self {
        self.reader = self.reader.with_empty_read_limit(limit);
        self
    }

    pub fn set_fake_telegram(&mut self, telegram: &[u8]) -> Result<(), DecodeError> {
        self.reader.set_fake_telegram(telegram)
    }

    pub fn clear_fake_telegram(&mut self) {
        self.reader.clear_fake_telegram();
    }

    pub fn reader_mut(&mut self) -> &mut TelegramReader<S, P, N> {
        &mut self.reader
    }

    pub fn snapshot(&self) -> &RegisterSnapshot {
        &self.snapshot
    }

    pub fn empty_reads(&self) -> u32 {
        self.reader.empty_reads()
    }

    /// Run one full cycle: read a telegram, decrypt it and extract registers.
    ///
    /// The snapshot is cleared first, so after a failed cycle it is empty.
    /// Fatal errors (see [`DecodeError::is_fatal`]) mean the device has to be
    /// restarted; retrying in-band is pointless.
    pub fn decode_cycle(&mut self) -> Result<&RegisterSnapshot, DecodeError> {
        self.snapshot.clear();

        let len = self.reader.read_telegram(&mut self.frame)?;
        debug!("Smarty: Got telegram ({len} bytes), decoding...");

        let envelope = Envelope::<N>::build(&self.frame, &self.key)?;
        debug!("Smarty: {envelope:?}");

        decrypt(&envelope, self.tag_policy, &mut self.plaintext)?;
        let stats = extract_into(&self.plaintext, &mut self.snapshot);

        info!(
            "Smarty: Decoded {} registers ({} unmatched, {} malformed lines)",
            stats.matched, stats.unmatched, stats.malformed
        );
        Ok(&self.snapshot)
    }
}

// EOF
