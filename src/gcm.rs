// gcm.rs — AES-128-GCM decryption of the telegram envelope

use aes::Aes128;
use aes_gcm::{
    aead::{consts::U12, generic_array::GenericArray, AeadInPlace, KeyInit},
    AesGcm,
};
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr32BE;

use crate::*;

/// AES-128-GCM with the 12 byte nonce and 12 byte tag used on the P1 port.
pub type Aes128Gcm12 = AesGcm<Aes128, U12, U12>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagPolicy {
    /// Authenticated decryption, tag mismatch fails the cycle.
    #[default]
    Verify,
    /// Decrypt without looking at the tag.
    Ignore,
}

/// Decrypt `env` into `plaintext`, which ends up exactly as long as the
/// ciphertext. On failure `plaintext` is left empty.
pub fn decrypt<const N: usize>(
    env: &Envelope<N>,
    policy: TagPolicy,
    plaintext: &mut heapless::Vec<u8, N>,
) -> Result<(), DecodeError> {
    plaintext.fill(0);
    plaintext.clear();
    plaintext.clone_from(&env.ciphertext);

    match policy {
        TagPolicy::Verify => {
            let cipher = Aes128Gcm12::new(GenericArray::from_slice(&env.key));
            let res = cipher.decrypt_in_place_detached(
                GenericArray::from_slice(&env.iv),
                &env.aad,
                plaintext.as_mut_slice(),
                GenericArray::from_slice(&env.tag),
            );
            if res.is_err() {
                warn!("Smarty: GCM tag mismatch, wrong key or corrupted telegram");
                plaintext.fill(0);
                plaintext.clear();
                return Err(DecodeError::Authentication);
            }
        }
        TagPolicy::Ignore => {
            warn!("Smarty: Decrypting without tag verification");
            // GCM encrypts with the counter block IV || 2
            let mut counter = [0u8; 16];
            counter[..IV_LEN].copy_from_slice(&env.iv);
            counter[15] = 2;
            let mut cipher = Ctr32BE::<Aes128>::new((&env.key).into(), &counter.into());
            cipher.apply_keystream(plaintext.as_mut_slice());
        }
    }

    debug!("Smarty: Decrypted {} bytes", plaintext.len());
    Ok(())
}

// EOF
