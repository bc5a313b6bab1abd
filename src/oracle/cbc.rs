use alloc::vec::Vec;
use core::fmt;

use aes::{Aes128, Aes192, Aes256, BlockCipher, NewBlockCipher};
use block_modes::block_padding::{NoPadding, Padding, Pkcs7};
use block_modes::{BlockMode, Cbc};

use crate::block::{self, Block, BLOCK_LEN};

use super::{Error, PaddingOracle, KEY_LEN_128, KEY_LEN_192, KEY_LEN_256};

/// AES key with an explicit width
#[derive(Clone, PartialEq)]
pub enum Key {
    Aes128([u8; KEY_LEN_128]),
    Aes192([u8; KEY_LEN_192]),
    Aes256([u8; KEY_LEN_256]),
}

impl Key {
    /// Pick the AES variant from the length of the key material
    ///
    /// errors: returns Error unless the material is 16, 24 or 32 bytes
    pub fn from_slice(key: &[u8]) -> Result<Self, Error> {
        match key.len() {
            KEY_LEN_128 => {
                let mut k = [0_u8; KEY_LEN_128];
                k.copy_from_slice(key);
                Ok(Key::Aes128(k))
            }
            KEY_LEN_192 => {
                let mut k = [0_u8; KEY_LEN_192];
                k.copy_from_slice(key);
                Ok(Key::Aes192(k))
            }
            KEY_LEN_256 => {
                let mut k = [0_u8; KEY_LEN_256];
                k.copy_from_slice(key);
                Ok(Key::Aes256(k))
            }
            len => Err(Error::InvalidKeyLength(len)),
        }
    }

    /// Key width in bits
    pub fn bits(&self) -> usize {
        self.as_bytes().len() * 8
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            Key::Aes128(k) => k.as_ref(),
            Key::Aes192(k) => k.as_ref(),
            Key::Aes256(k) => k.as_ref(),
        }
    }
}

// never print key material
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Key::Aes{}(..)", self.bits())
    }
}

/// AES-CBC decryption service leaking PKCS#7 padding validity
///
/// The key is fixed for the oracle's lifetime and never exposed
pub struct CbcPaddingOracle {
    key: Key,
}

impl CbcPaddingOracle {
    /// Create a new AES-128 padding oracle
    ///
    /// errors: returns Error if the key is not exactly 16 bytes.
    /// Use `with_key` for wider keys.
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        if key.len() != KEY_LEN_128 {
            return Err(Error::InvalidKeyLength(key.len()));
        }

        Ok(Self::with_key(Key::from_slice(key)?))
    }

    /// Create a padding oracle with an explicitly sized key
    pub fn with_key(key: Key) -> Self {
        Self { key: key }
    }

    /// Key width in bits
    pub fn key_bits(&self) -> usize {
        self.key.bits()
    }

    /// PKCS#7 pad and encrypt a plaintext under the oracle's key
    pub fn encrypt(&self, plaintext: &[u8], iv: &[u8; BLOCK_LEN]) -> Result<Vec<u8>, Error> {
        match &self.key {
            Key::Aes128(k) => cbc_encrypt::<Aes128>(k, iv, plaintext),
            Key::Aes192(k) => cbc_encrypt::<Aes192>(k, iv, plaintext),
            Key::Aes256(k) => cbc_encrypt::<Aes256>(k, iv, plaintext),
        }
    }

    /// Padding oracle decryption over raw bytes
    ///
    /// Ok(false) only when the final block's padding is bad.
    /// Malformed IV or ciphertext lengths are a CipherFault.
    pub fn check_padding_raw(&self, iv: &[u8], ciphertext: &[u8]) -> Result<bool, Error> {
        if iv.len() != BLOCK_LEN {
            return Err(Error::CipherFault("IV must be one block"));
        }

        if ciphertext.is_empty() {
            return Err(Error::CipherFault("empty ciphertext"));
        }

        if ciphertext.len() % BLOCK_LEN != 0 {
            return Err(Error::CipherFault("ciphertext is not a multiple of the block size"));
        }

        let mut buf = ciphertext.to_vec();

        match &self.key {
            Key::Aes128(k) => cbc_decrypt::<Aes128>(k, iv, &mut buf)?,
            Key::Aes192(k) => cbc_decrypt::<Aes192>(k, iv, &mut buf)?,
            Key::Aes256(k) => cbc_decrypt::<Aes256>(k, iv, &mut buf)?,
        }

        // padding can never reach past the final block
        let last = &buf[buf.len() - BLOCK_LEN..];

        Ok(Pkcs7::unpad(last).is_ok())
    }
}

impl PaddingOracle for CbcPaddingOracle {
    fn check_padding(&self, blocks: &[Block]) -> Result<bool, Error> {
        if blocks.len() < 2 {
            return Err(Error::CipherFault("need an IV and at least one ciphertext block"));
        }

        let iv = blocks[0].to_bytes();

        self.check_padding_raw(&iv, &block::concat(&blocks[1..]))
    }
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error>
where
    C: BlockCipher + NewBlockCipher,
    Cbc<C, Pkcs7>: BlockMode<C, Pkcs7>,
{
    let cipher = Cbc::<C, Pkcs7>::new_var(key, iv)
        .map_err(|_| Error::CipherFault("invalid key or IV length"))?;

    Ok(cipher.encrypt_vec(plaintext))
}

// Decrypt in place without touching the padding
fn cbc_decrypt<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<(), Error>
where
    C: BlockCipher + NewBlockCipher,
    Cbc<C, NoPadding>: BlockMode<C, NoPadding>,
{
    let cipher = Cbc::<C, NoPadding>::new_var(key, iv)
        .map_err(|_| Error::CipherFault("invalid key or IV length"))?;

    cipher
        .decrypt(buf)
        .map_err(|_| Error::CipherFault("block decryption failed"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{gen_rand_iv, gen_rand_key};
    use rand::thread_rng;

    const FIXED_KEY: [u8; KEY_LEN_128] = *b"YELLOW SUBMARINE";

    const FIXED_IV: [u8; BLOCK_LEN] = [
        0xba, 0x78, 0x95, 0xb6, 0x15, 0x36, 0xf2, 0xf1, 0x80, 0xd6, 0x2b, 0xa2, 0xe8, 0xd3, 0xb5,
        0x65,
    ];

    #[test]
    fn check_key_lengths() {
        assert!(CbcPaddingOracle::new(&FIXED_KEY).is_ok());
        assert_eq!(
            CbcPaddingOracle::new(&[0_u8; 15]).err(),
            Some(Error::InvalidKeyLength(15))
        );
        // wider keys need the explicit constructor
        assert_eq!(
            CbcPaddingOracle::new(&[0_u8; 32]).err(),
            Some(Error::InvalidKeyLength(32))
        );

        assert_eq!(Key::from_slice(&[0_u8; 24]).unwrap().bits(), 192);
        assert_eq!(Key::from_slice(&[0_u8; 32]).unwrap().bits(), 256);
        assert_eq!(Key::from_slice(&[0_u8; 20]), Err(Error::InvalidKeyLength(20)));
    }

    #[test]
    fn check_key_debug_redacted() {
        let key = Key::from_slice(&FIXED_KEY).unwrap();
        assert_eq!(alloc::format!("{:?}", key), "Key::Aes128(..)");
    }

    #[test]
    fn check_valid_padding() {
        let mut rng = thread_rng();

        for len in 0..48 {
            let oracle = CbcPaddingOracle::new(&gen_rand_key(&mut rng)).unwrap();
            let iv = gen_rand_iv(&mut rng);
            let pt = alloc::vec![0x41_u8; len];

            let ciphertext = oracle.encrypt(&pt, &iv).unwrap();
            assert_eq!(ciphertext.len(), (len / BLOCK_LEN + 1) * BLOCK_LEN);

            let blocks = block::to_blocks(&iv, &ciphertext).unwrap();
            assert_eq!(oracle.check_padding(&blocks), Ok(true));
        }
    }

    #[test]
    fn check_wide_keys() {
        let wide_192 = [0x24_u8; KEY_LEN_192];
        let wide_256 = [0x99_u8; KEY_LEN_256];

        for key in [&wide_192[..], &wide_256[..]].iter() {
            let oracle = CbcPaddingOracle::with_key(Key::from_slice(key).unwrap());
            let ciphertext = oracle.encrypt(b"wide key message", &FIXED_IV).unwrap();

            assert_eq!(oracle.check_padding_raw(&FIXED_IV, &ciphertext), Ok(true));
        }
    }

    #[test]
    fn check_invalid_padding() {
        let oracle = CbcPaddingOracle::new(&FIXED_KEY).unwrap();

        // 15 bytes of message, one byte of 0x01 padding
        let ciphertext = oracle.encrypt(b"Ostensibly rand", &FIXED_IV).unwrap();
        assert_eq!(ciphertext.len(), BLOCK_LEN);

        // turn the decrypted 0x01 into 0x11, an impossible padding length
        let mut iv = FIXED_IV;
        iv[BLOCK_LEN - 1] ^= 0x01 ^ 0x11;
        assert_eq!(oracle.check_padding_raw(&iv, &ciphertext), Ok(false));

        // and into 0x00
        let mut iv = FIXED_IV;
        iv[BLOCK_LEN - 1] ^= 0x01;
        assert_eq!(oracle.check_padding_raw(&iv, &ciphertext), Ok(false));

        // 0x02 without a matching second-to-last byte
        let mut iv = FIXED_IV;
        iv[BLOCK_LEN - 1] ^= 0x01 ^ 0x02;
        assert_eq!(oracle.check_padding_raw(&iv, &ciphertext), Ok(false));
    }

    #[test]
    fn check_padding_limited_to_last_block() {
        let oracle = CbcPaddingOracle::new(&FIXED_KEY).unwrap();

        // first two blocks decrypt to 32 bytes of 0x11
        let pt = [0x11_u8; BLOCK_LEN * 2];
        let ciphertext = oracle.encrypt(&pt, &FIXED_IV).unwrap();

        assert_eq!(oracle.check_padding_raw(&FIXED_IV, &ciphertext), Ok(true));
        assert_eq!(
            oracle.check_padding_raw(&FIXED_IV, &ciphertext[..BLOCK_LEN * 2]),
            Ok(false)
        );
    }

    #[test]
    fn check_cipher_fault() {
        let oracle = CbcPaddingOracle::new(&FIXED_KEY).unwrap();
        let ciphertext = oracle.encrypt(b"Ostensibly random", &FIXED_IV).unwrap();

        assert!(matches!(
            oracle.check_padding_raw(&FIXED_IV, &ciphertext[..BLOCK_LEN + 1]),
            Err(Error::CipherFault(_))
        ));
        assert!(matches!(
            oracle.check_padding_raw(&FIXED_IV, &[]),
            Err(Error::CipherFault(_))
        ));
        assert!(matches!(
            oracle.check_padding_raw(&FIXED_IV[..8], &ciphertext),
            Err(Error::CipherFault(_))
        ));
        assert!(matches!(
            oracle.check_padding(&[Block::from(FIXED_IV)]),
            Err(Error::CipherFault(_))
        ));
    }
}
