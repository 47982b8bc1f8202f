// testutil.rs — encrypted telegram fixtures for unit tests

use aes_gcm::aead::{generic_array::GenericArray, AeadInPlace, KeyInit};

use crate::*;

pub const TEST_KEY: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
];
pub const SYSTEM_TITLE: [u8; 8] = [0x53, 0x41, 0x47, 0x67, 0x70, 0x0C, 0x3F, 0x25];
pub const FRAME_COUNTER: [u8; 4] = [0x00, 0x01, 0x2A, 0x5C];

pub const SAMPLE_TELEGRAM: &str = "/Lux5\\253833635_D\r\n\
\r\n\
1-3:0.2.8(42)\r\n\
0-0:1.0.0(210204163628W)\r\n\
0-0:42.0.0(3045533031323334)\r\n\
1-0:1.8.0(000441.879*kWh)\r\n\
1-0:2.8.0(000000.000*kWh)\r\n\
1-0:3.8.0(000020.000*kVArh)\r\n\
1-0:4.8.0(000331.000*kVArh)\r\n\
1-0:1.7.0(00.189*kW)\r\n\
1-0:2.7.0(00.000*kW)\r\n\
0-0:17.0.0(27.0*kVA)\r\n\
0-0:96.3.10(1)\r\n\
0-0:96.7.21(00003)\r\n\
1-0:32.32.0(00002)\r\n\
0-0:96.13.0()\r\n\
0-0:96.1.1(4B384547303034303436333935353037)\r\n\
1-0:32.7.0(232.0*V)\r\n\
1-0:31.7.0(001*A)\r\n\
1-0:21.7.0(00.189*kW)\r\n\
0-1:24.2.1(101209112500W)(12785.123*m3)\r\n\
!8F46\r\n";

/// Wrap `plaintext` into a P1 frame the way the meter does.
pub fn seal_telegram(plaintext: &[u8], key: &[u8; 16]) -> Vec<u8> {
    let mut iv = [0u8; IV_LEN];
    iv[..8].copy_from_slice(&SYSTEM_TITLE);
    iv[8..].copy_from_slice(&FRAME_COUNTER);

    let mut body = plaintext.to_vec();
    let cipher = Aes128Gcm12::new(GenericArray::from_slice(key));
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&iv), &SYSTEM_TITLE_AAD, &mut body)
        .expect("encrypt");

    let mut frame = vec![SYNC_MARKER, SYSTEM_TITLE.len() as u8];
    frame.extend_from_slice(&SYSTEM_TITLE);
    frame.push(0x82);
    frame.extend_from_slice(&((body.len() + LENGTH_ALLOWANCE) as u16).to_be_bytes());
    frame.push(0x30);
    frame.extend_from_slice(&FRAME_COUNTER);
    frame.extend_from_slice(&body);
    frame.extend_from_slice(&tag);
    frame
}
// EOF
