// envelope.rs — AES-GCM envelope of an encrypted smarty telegram
//
// Frame layout:
//   [0]        0xDB sync marker
//   [1]        system title length
//   [2..10]    system title
//   [11..13]   declared length (u16 BE), covers 17 header bytes + ciphertext
//   [13]       security control byte
//   [14..18]   frame counter
//   [18..18+N] ciphertext
//   then 12 bytes of GCM tag

use std::fmt;
use std::ops::Range;

use crate::*;

pub const KEY_LEN: usize = 16;
pub const IV_LEN: usize = 12;
pub const AAD_LEN: usize = 17;
pub const TAG_LEN: usize = 12;

pub const LENGTH_RANGE: Range<usize> = 11..13;
pub const CIPHERTEXT_OFFSET: usize = 18;
/// Bytes of the declared length that are not ciphertext.
pub const LENGTH_ALLOWANCE: usize = 17;

/// iv[0..8] = frame[2..10], iv[8..12] = frame[6 + i] for i in 8..12.
pub const IV_HEAD_RANGE: Range<usize> = 2..10;
pub const IV_TAIL_RANGE: Range<usize> = 14..18;

/// Fixed additional authenticated data: security byte plus a placeholder
/// authentication key.
pub const SYSTEM_TITLE_AAD: [u8; AAD_LEN] = [
    0x30, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE,
    0xFF,
];

/// Everything needed for one decryption, copied out of the frame.
#[derive(Clone)]
pub struct Envelope<const N: usize = MAX_TELEGRAM_LEN> {
    pub key: [u8; KEY_LEN],
    pub iv: [u8; IV_LEN],
    pub aad: [u8; AAD_LEN],
    pub ciphertext: heapless::Vec<u8, N>,
    pub tag: [u8; TAG_LEN],
}

impl<const N: usize> Envelope<N> {
    /// Cut a frame into its envelope parts.
    ///
    /// Bounds are checked against both the frame and the capacity `N` before
    /// anything is copied.
    pub fn build(frame: &[u8], key: &[u8; KEY_LEN]) -> Result<Self, DecodeError> {
        let first = *frame.first().ok_or(DecodeError::Truncated {
            needed: CIPHERTEXT_OFFSET,
            actual: 0,
        })?;
        if first != SYNC_MARKER {
            return Err(DecodeError::Framing { found: first });
        }
        if frame.len() < CIPHERTEXT_OFFSET {
            return Err(DecodeError::Truncated {
                needed: CIPHERTEXT_OFFSET,
                actual: frame.len(),
            });
        }

        let declared = u16::from_be_bytes([frame[LENGTH_RANGE.start], frame[LENGTH_RANGE.start + 1]]) as usize;
        let data_len = declared
            .checked_sub(LENGTH_ALLOWANCE)
            .ok_or(DecodeError::Truncated {
                needed: LENGTH_ALLOWANCE,
                actual: declared,
            })?;

        let needed = CIPHERTEXT_OFFSET + data_len + TAG_LEN;
        if needed > N {
            warn!("Smarty: Declared length {declared} does not fit in {N} bytes");
            return Err(DecodeError::Oversize { needed, capacity: N });
        }
        if needed > frame.len() {
            warn!("Smarty: Frame has {} bytes, header asks for {needed}", frame.len());
            return Err(DecodeError::Truncated {
                needed,
                actual: frame.len(),
            });
        }

        let ct_end = CIPHERTEXT_OFFSET + data_len;
        let mut iv = [0u8; IV_LEN];
        iv[..8].copy_from_slice(&frame[IV_HEAD_RANGE]);
        iv[8..].copy_from_slice(&frame[IV_TAIL_RANGE]);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&frame[ct_end..ct_end + TAG_LEN]);
        let ciphertext = heapless::Vec::from_slice(&frame[CIPHERTEXT_OFFSET..ct_end]).map_err(|_| {
            DecodeError::Oversize {
                needed,
                capacity: N,
            }
        })?;

        Ok(Self {
            key: *key,
            iv,
            aad: SYSTEM_TITLE_AAD,
            ciphertext,
            tag,
        })
    }
}

struct Hex<'a>(&'a [u8]);

impl fmt::Debug for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

// key stays out of the logs
impl<const N: usize> fmt::Debug for Envelope<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("key", &"<redacted>")
            .field("iv", &Hex(&self.iv))
            .field("aad", &Hex(&self.aad))
            .field("tag", &Hex(&self.tag))
            .field("data_size", &self.ciphertext.len())
            .field("authsize", &AAD_LEN)
            .field("tagsize", &TAG_LEN)
            .field("ivsize", &IV_LEN)
            .finish()
    }
}

// EOF
