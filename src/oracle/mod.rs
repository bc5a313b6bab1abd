use core::cell::Cell;
use core::fmt;

use rand::rngs::ThreadRng;
use rand::RngCore;

use crate::block::{self, Block, BLOCK_LEN};

mod cbc;

pub use cbc::*;

/// Length of an AES-128 key
pub const KEY_LEN_128: usize = 16;
/// Length of an AES-192 key
pub const KEY_LEN_192: usize = 24;
/// Length of an AES-256 key
pub const KEY_LEN_256: usize = 32;

/// Errors for padding oracles
#[derive(Debug, PartialEq)]
pub enum Error {
    Block(block::Error),
    /// Key material is not a supported AES key length
    InvalidKeyLength(usize),
    /// Decryption failed for a reason other than bad padding
    CipherFault(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Block(ref e) => write!(f, "{}", e),
            Error::InvalidKeyLength(len) => write!(f, "invalid AES key length: {} bytes", len),
            Error::CipherFault(s) => write!(f, "cipher fault: {}", s),
        }
    }
}

impl From<block::Error> for Error {
    fn from(e: block::Error) -> Self {
        Error::Block(e)
    }
}

/// A service that leaks only whether CBC decryption saw valid PKCS#7 padding
///
/// The first block is the IV, the remaining blocks are ciphertext.
///
/// Ok(false) means bad padding and nothing else. Every other failure is an Err.
pub trait PaddingOracle {
    fn check_padding(&self, blocks: &[Block]) -> Result<bool, Error>;
}

impl<O: PaddingOracle + ?Sized> PaddingOracle for &O {
    fn check_padding(&self, blocks: &[Block]) -> Result<bool, Error> {
        (**self).check_padding(blocks)
    }
}

/// Oracle wrapper counting every padding check made through it
pub struct CountingOracle<O> {
    inner: O,
    queries: Cell<usize>,
}

impl<O: PaddingOracle> CountingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner: inner,
            queries: Cell::new(0),
        }
    }

    /// Number of oracle queries so far
    pub fn queries(&self) -> usize {
        self.queries.get()
    }

    pub fn reset(&self) {
        self.queries.set(0);
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

impl<O: PaddingOracle> PaddingOracle for CountingOracle<O> {
    fn check_padding(&self, blocks: &[Block]) -> Result<bool, Error> {
        self.queries.set(self.queries.get() + 1);
        self.inner.check_padding(blocks)
    }
}

/// Generate a random AES-128 key
pub fn gen_rand_key(rng: &mut ThreadRng) -> [u8; KEY_LEN_128] {
    let mut key = [0_u8; KEY_LEN_128];
    rng.fill_bytes(&mut key);
    key
}

/// Generate a random AES-CBC IV
pub fn gen_rand_iv(rng: &mut ThreadRng) -> [u8; BLOCK_LEN] {
    let mut iv = [0_u8; BLOCK_LEN];
    rng.fill_bytes(&mut iv);
    iv
}
