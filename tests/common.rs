use std::path::PathBuf;

use rand::thread_rng;

use cbc_attack::block::{self, Block, BLOCK_LEN};
use cbc_attack::oracle::{gen_rand_iv, gen_rand_key, CbcPaddingOracle, KEY_LEN_128};

/// Oracle plus the material it encrypted
#[allow(dead_code)]
pub struct Fixture {
    pub oracle: CbcPaddingOracle,
    pub key: [u8; KEY_LEN_128],
    pub iv: [u8; BLOCK_LEN],
    pub ciphertext: Vec<u8>,
}

impl Fixture {
    #[allow(dead_code)]
    pub fn blocks(&self) -> Vec<Block> {
        block::to_blocks(&self.iv, &self.ciphertext).unwrap()
    }
}

// encrypt a plaintext under a fresh random key and IV
#[allow(dead_code)]
pub fn encrypt_fixture(plaintext: &[u8]) -> Fixture {
    let mut rng = thread_rng();

    let key = gen_rand_key(&mut rng);
    let iv = gen_rand_iv(&mut rng);
    let oracle = CbcPaddingOracle::new(&key).unwrap();
    let ciphertext = oracle.encrypt(plaintext, &iv).unwrap();

    Fixture {
        oracle: oracle,
        key: key,
        iv: iv,
        ciphertext: ciphertext,
    }
}

// scratch directory unique to this test process
#[allow(dead_code)]
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cbc-attack-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
