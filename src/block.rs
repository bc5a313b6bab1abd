use alloc::vec::Vec;
use core::fmt;

/// Length of an AES block in bytes
pub const BLOCK_LEN: usize = 16;

/// Errors for Block construction and byte access
#[derive(Debug, PartialEq)]
pub enum Error {
    /// Buffer was not exactly BLOCK_LEN bytes (or not a whole number of blocks)
    InvalidLength(usize),
    /// Byte index outside [0, BLOCK_LEN)
    InvalidIndex(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidLength(len) => {
                write!(f, "blocks must be {} bytes in size, got {}", BLOCK_LEN, len)
            }
            Error::InvalidIndex(idx) => write!(f, "block index {} out of bounds", idx),
        }
    }
}

/// A single 16-byte cipher block
///
/// Blocks are values: every "modifying" operation returns a new block
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Block {
    data: [u8; BLOCK_LEN],
}

impl Block {
    /// Block of all zero bytes
    pub fn zero() -> Self {
        Self {
            data: [0_u8; BLOCK_LEN],
        }
    }

    /// Copy a block from a byte slice
    ///
    /// errors: returns Error if the slice is not exactly BLOCK_LEN bytes
    pub fn from_bytes(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() != BLOCK_LEN {
            return Err(Error::InvalidLength(buf.len()));
        }

        let mut data = [0_u8; BLOCK_LEN];
        data.copy_from_slice(buf);

        Ok(Self { data: data })
    }

    /// XOR two blocks into a new block
    pub fn xor(&self, other: &Block) -> Block {
        let mut data = self.data;
        for (db, ob) in data.iter_mut().zip(other.data.iter()) {
            *db ^= ob;
        }
        Block { data: data }
    }

    /// Get a copy of this block with byte `idx` set to `value`
    pub fn with_byte(&self, idx: usize, value: u8) -> Result<Block, Error> {
        if idx >= BLOCK_LEN {
            return Err(Error::InvalidIndex(idx));
        }

        let mut data = self.data;
        data[idx] = value;

        Ok(Block { data: data })
    }

    /// Get the byte at position `idx`
    pub fn byte_at(&self, idx: usize) -> Result<u8, Error> {
        self.data.get(idx).copied().ok_or(Error::InvalidIndex(idx))
    }

    /// Fresh copy of the block contents
    pub fn to_bytes(&self) -> [u8; BLOCK_LEN] {
        self.data
    }
}

impl From<[u8; BLOCK_LEN]> for Block {
    fn from(data: [u8; BLOCK_LEN]) -> Self {
        Self { data: data }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode(self.data))
    }
}

/// Build a block sequence from an IV and ciphertext
///
/// The IV is the first block, followed by each ciphertext block in order
///
/// errors: returns Error if the IV is not one block,
/// or if the ciphertext is empty or not a whole number of blocks
pub fn to_blocks(iv: &[u8], ciphertext: &[u8]) -> Result<Vec<Block>, Error> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(Error::InvalidLength(ciphertext.len()));
    }

    let mut blocks = Vec::with_capacity(1 + ciphertext.len() / BLOCK_LEN);
    blocks.push(Block::from_bytes(iv)?);

    for chunk in ciphertext.chunks_exact(BLOCK_LEN) {
        blocks.push(Block::from_bytes(chunk)?);
    }

    Ok(blocks)
}

/// Flatten a block sequence into a byte vector
pub fn concat(blocks: &[Block]) -> Vec<u8> {
    let mut res = Vec::with_capacity(blocks.len() * BLOCK_LEN);
    for block in blocks.iter() {
        res.extend_from_slice(&block.data);
    }
    res
}
