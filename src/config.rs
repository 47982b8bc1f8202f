// config.rs

use crc::{Crc, CRC_32_ISCSI};

use crate::*;

pub const CONFIG_BUF_SIZE: usize = 256;

#[cfg(feature = "esp")]
const CONFIG_NAME: &str = "cfg";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyConfig {
    /// AES-128 key of the P1 port, as 32 hex chars.
    pub decrypt_key: String,
    pub data_request_pin: u8,
    pub uart_baudrate: u32,
    pub poll_interval_secs: u64,
    pub empty_read_limit: u32,
    pub verify_tag: bool,
}

impl Default for MyConfig {
    fn default() -> Self {
        Self {
            decrypt_key: option_env!("SMARTY_KEY").unwrap_or("").into(),
            data_request_pin: 5,
            uart_baudrate: 115_200,
            poll_interval_secs: 10,
            empty_read_limit: DEFAULT_EMPTY_READ_LIMIT,
            verify_tag: true,
        }
    }
}

fn parse_hex(hex: &str) -> Option<Vec<u8>> {
    if !hex.len().is_multiple_of(2) {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| hex.get(i..i + 2).and_then(|h| u8::from_str_radix(h, 16).ok()))
        .collect()
}

impl MyConfig {
    /// Parse decrypt_key hex string (32 hex chars) to 16 bytes.
    pub fn decrypt_key_bytes(&self) -> Option<[u8; KEY_LEN]> {
        if self.decrypt_key.len() != KEY_LEN * 2 {
            return None;
        }
        let bytes = parse_hex(&self.decrypt_key)?;
        let mut arr = [0u8; KEY_LEN];
        arr.copy_from_slice(&bytes);
        Some(arr)
    }

    /// Encode into `buf` with a trailing CRC-32.
    pub fn to_bytes<'a>(&self, buf: &'a mut [u8]) -> AppResult<&'a [u8]> {
        let crc = Crc::<u32>::new(&CRC_32_ISCSI);
        let digest = crc.digest();
        let data = postcard::to_slice_crc32(self, buf, digest)
            .map_err(|e| AppError::Message(format!("Cannot encode config to buffer {e:?}")))?;
        Ok(&*data)
    }

    pub fn from_bytes(buf: &[u8]) -> AppResult<Self> {
        let crc = Crc::<u32>::new(&CRC_32_ISCSI);
        let digest = crc.digest();
        postcard::from_bytes_crc32::<MyConfig>(buf, digest)
            .map_err(|e| AppError::Message(format!("Cannot parse config {e:?}")))
    }
}

#[cfg(feature = "esp")]
impl MyConfig {
    pub fn from_nvs(nvs: &mut nvs::EspNvs<nvs::NvsDefault>) -> Option<Self> {
        let mut nvsbuf = [0u8; CONFIG_BUF_SIZE];
        info!("Reading up to {sz} bytes from nvs...", sz = CONFIG_BUF_SIZE);
        let b = match nvs.get_raw(CONFIG_NAME, &mut nvsbuf) {
            Err(e) => {
                error!("Nvs read error {e:?}");
                return None;
            }
            Ok(Some(b)) => b,
            _ => {
                error!("Nvs key not found");
                return None;
            }
        };
        info!("Got {sz} bytes from nvs. Parsing config...", sz = b.len());

        match Self::from_bytes(b) {
            Ok(c) => {
                info!("Successfully parsed config from nvs.");
                Some(c)
            }
            Err(e) => {
                error!("Cannot parse config from nvs: {e:?}");
                None
            }
        }
    }

    pub fn to_nvs(&self, nvs: &mut nvs::EspNvs<nvs::NvsDefault>) -> AppResult<()> {
        let mut nvsbuf = [0u8; CONFIG_BUF_SIZE];
        let nvsdata = self.to_bytes(&mut nvsbuf)?;
        info!("Encoded config to {sz} bytes. Saving to nvs...", sz = nvsdata.len());

        nvs.set_raw(CONFIG_NAME, nvsdata)
            .map_err(|e| AppError::Message(format!("Cannot save to nvs: {e:?}")))?;
        info!("Config saved.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed() -> MyConfig {
        MyConfig {
            decrypt_key: "AE4B25E3D98AFC2A7C7C1E0C7C48B5A1".into(),
            ..MyConfig::default()
        }
    }

    #[test]
    fn defaults() {
        let c = MyConfig::default();
        assert_eq!(c.uart_baudrate, 115_200);
        assert_eq!(c.empty_read_limit, 10);
        assert!(c.verify_tag);
    }

    #[test]
    fn key_parsing() {
        let key = keyed().decrypt_key_bytes().unwrap();
        assert_eq!(key[0], 0xAE);
        assert_eq!(key[15], 0xA1);

        let lower = MyConfig {
            decrypt_key: "ae4b25e3d98afc2a7c7c1e0c7c48b5a1".into(),
            ..MyConfig::default()
        };
        assert_eq!(lower.decrypt_key_bytes(), Some(key));

        for bad in ["", "AE4B", "ZZ4B25E3D98AFC2A7C7C1E0C7C48B5A1", "AE4B25E3D98AFC2A7C7C1E0C7C48B5A1FF"] {
            let c = MyConfig {
                decrypt_key: bad.into(),
                ..MyConfig::default()
            };
            assert!(c.decrypt_key_bytes().is_none(), "{bad}");
        }
    }

    #[test]
    fn hex_needs_whole_pairs() {
        assert_eq!(parse_hex("0aFF"), Some(vec![0x0A, 0xFF]));
        assert_eq!(parse_hex("0aF"), None);
        assert_eq!(parse_hex(""), Some(vec![]));
    }

    #[test]
    fn non_ascii_key_is_rejected() {
        // 32 bytes, but not 32 hex chars
        let c = MyConfig {
            decrypt_key: "é".repeat(16),
            ..MyConfig::default()
        };
        assert!(c.decrypt_key_bytes().is_none());
    }

    #[test]
    fn stored_config_survives_and_detects_corruption() {
        let config = keyed();
        let mut buf = [0u8; CONFIG_BUF_SIZE];
        let mut stored = config.to_bytes(&mut buf).unwrap().to_vec();

        assert_eq!(MyConfig::from_bytes(&stored).unwrap(), config);

        stored[3] ^= 0x20;
        assert!(MyConfig::from_bytes(&stored).is_err());
    }
}
// EOF
