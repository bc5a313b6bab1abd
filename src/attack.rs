use alloc::vec::Vec;
use core::fmt;

use block_modes::block_padding::{Padding, Pkcs7};
use log::{debug, info, trace, warn};

use crate::block::{self, Block, BLOCK_LEN};
use crate::oracle::{self, PaddingOracle};

/// Errors for padding oracle plaintext recovery
#[derive(Debug, PartialEq)]
pub enum Error {
    Block(block::Error),
    Oracle(oracle::Error),
    /// Recovery needs an IV and at least one ciphertext block
    TooFewBlocks(usize),
    /// No guess at this position was accepted by the oracle
    NoDecryptionFound { block: usize, position: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Block(ref e) => write!(f, "{}", e),
            Error::Oracle(ref e) => write!(f, "oracle error: {}", e),
            Error::TooFewBlocks(n) => write!(
                f,
                "need an IV and at least one ciphertext block, got {} block(s)",
                n
            ),
            Error::NoDecryptionFound { block, position } => write!(
                f,
                "no guess accepted for byte {} of block {}",
                position, block
            ),
        }
    }
}

impl From<block::Error> for Error {
    fn from(e: block::Error) -> Self {
        Error::Block(e)
    }
}

impl From<oracle::Error> for Error {
    fn from(e: oracle::Error) -> Self {
        Error::Oracle(e)
    }
}

/// Recover the plaintext of a CBC ciphertext through a padding oracle
///
/// `blocks[0]` is the IV, the rest are ciphertext blocks.
///
/// Trailing PKCS#7 padding is stripped when the last recovered block carries
/// valid padding. Otherwise the plaintext is returned whole.
pub fn recover<O: PaddingOracle>(blocks: &[Block], oracle: &O) -> Result<Vec<u8>, Error> {
    if blocks.len() < 2 {
        return Err(Error::TooFewBlocks(blocks.len()));
    }

    info!("recovering {} ciphertext block(s)", blocks.len() - 1);

    let mut res: Vec<u8> = Vec::with_capacity((blocks.len() - 1) * BLOCK_LEN);

    // each target block only needs its predecessor
    for (i, pair) in blocks.windows(2).enumerate() {
        let pt = recover_block_num(&pair[0], &pair[1], oracle, i + 1)?;
        res.extend_from_slice(&pt.to_bytes());
    }

    let res = strip_padding(res);

    info!("recovered {} plaintext byte(s)", res.len());

    Ok(res)
}

/// Recover the plaintext of `target`, given the ciphertext block (or IV) before it
pub fn recover_block<O: PaddingOracle>(
    prev: &Block,
    target: &Block,
    oracle: &O,
) -> Result<Block, Error> {
    recover_block_num(prev, target, oracle, 1)
}

fn recover_block_num<O: PaddingOracle>(
    prev: &Block,
    target: &Block,
    oracle: &O,
    block_num: usize,
) -> Result<Block, Error> {
    let inter = intermediate(target, oracle, block_num)?;

    debug!("block {} intermediate: {}", block_num, inter);

    Ok(inter.xor(prev))
}

// Recover the raw block decryption of `target`, last byte first
fn intermediate<O: PaddingOracle>(
    target: &Block,
    oracle: &O,
    block_num: usize,
) -> Result<Block, Error> {
    let mut inter = Block::zero();
    let mut crafted = Block::zero();

    for pos in (0..BLOCK_LEN).rev() {
        let pad = (BLOCK_LEN - pos) as u8;

        // force every known byte after `pos` to decrypt to the padding value
        for k in pos + 1..BLOCK_LEN {
            crafted = crafted.with_byte(k, pad ^ inter.byte_at(k)?)?;
        }

        let guess = find_guess(&crafted, target, pos, oracle)?.ok_or(
            Error::NoDecryptionFound {
                block: block_num,
                position: pos,
            },
        )?;

        inter = inter.with_byte(pos, guess ^ pad)?;

        trace!("block {} byte {}: guess {:#04x}", block_num, pos, guess);
    }

    Ok(inter)
}

// First value at `pos` in 0x00..=0xff the oracle accepts as valid padding
fn find_guess<O: PaddingOracle>(
    crafted: &Block,
    target: &Block,
    pos: usize,
    oracle: &O,
) -> Result<Option<u8>, Error> {
    let accepts = |guess: u8| -> Result<bool, Error> {
        let probe = crafted.with_byte(pos, guess)?;

        if !oracle.check_padding(&[probe, *target])? {
            return Ok(false);
        }

        if pos == BLOCK_LEN - 1 {
            // a true 0x01 pad survives a change to the second-to-last byte,
            // a coincidental 0x02 0x02 (or longer) pad does not
            let prev_pos = pos - 1;
            let flipped = probe.with_byte(prev_pos, probe.byte_at(prev_pos)? ^ 0x01)?;

            if !oracle.check_padding(&[flipped, *target])? {
                warn!("discarding coincidental padding match at guess {:#04x}", guess);
                return Ok(false);
            }
        }

        Ok(true)
    };

    (0x00..=0xff_u8)
        .find_map(|guess| match accepts(guess) {
            Ok(true) => Some(Ok(guess)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        })
        .transpose()
}

// Strip PKCS#7 padding from the final block, if it has any
fn strip_padding(mut pt: Vec<u8>) -> Vec<u8> {
    let len = pt.len();
    if len < BLOCK_LEN {
        return pt;
    }

    let pad_len = match Pkcs7::unpad(&pt[len - BLOCK_LEN..]) {
        Ok(unpadded) => BLOCK_LEN - unpadded.len(),
        Err(_) => {
            warn!("final block has no valid padding, returning it whole");
            0
        }
    };

    pt.truncate(len - pad_len);
    pt
}
