use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::info;

use cbc_attack::attack;
use cbc_attack::block;
use cbc_attack::oracle::{CbcPaddingOracle, CountingOracle, Key};

const USAGE: &str = "usage:
  attack --key <keyfile> --ctxt <ciphertext file>
  attack --help
options:
  -k, --key\t\tSpecify the decryption key file for the oracle
  -c, --ctxt\t\tSpecify the ciphertext file to attack.
  -h, --help\t\tDisplay this message.";

/// PKCS#7 padding oracle attack on an AES-CBC ciphertext
#[derive(Parser, Debug)]
#[command(name = "attack", disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Base64 key file for the oracle
    #[arg(short, long)]
    key: Option<PathBuf>,

    /// File with a Base64 IV line followed by a Base64 ciphertext line
    #[arg(short, long)]
    ctxt: Option<PathBuf>,

    #[arg(short, long)]
    help: bool,
}

fn usage() -> ! {
    println!("{}", USAGE);
    process::exit(1);
}

// Read the first `n` non-empty lines of a file
fn read_lines(path: &Path, n: usize) -> Result<Vec<String>> {
    let file = fs::File::open(path).with_context(|| format!("{} does not exist", path.display()))?;

    let mut res = Vec::with_capacity(n);
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        let line = line.trim();
        if !line.is_empty() {
            res.push(line.to_string());
        }
        if res.len() == n {
            return Ok(res);
        }
    }

    bail!("{}: expected {} line(s), found {}", path.display(), n, res.len())
}

fn load_key(path: &Path) -> Result<Key> {
    let lines = read_lines(path, 1).context("Unable to read key file")?;
    let raw = base64::decode(&lines[0]).context("Key is not valid Base64")?;

    Key::from_slice(&raw).map_err(|e| anyhow!("{}", e))
}

fn load_blocks(path: &Path) -> Result<Vec<block::Block>> {
    let lines = read_lines(path, 2).context("Unable to read ciphertext file")?;
    let iv = base64::decode(&lines[0]).context("IV is not valid Base64")?;
    let ciphertext = base64::decode(&lines[1]).context("Ciphertext is not valid Base64")?;

    block::to_blocks(&iv, &ciphertext).map_err(|e| anyhow!("{}", e))
}

fn run(key_file: &Path, ctxt_file: &Path) -> Result<String> {
    let key = load_key(key_file)?;
    let oracle = CountingOracle::new(CbcPaddingOracle::with_key(key));

    info!("loaded AES-{} oracle key", oracle.inner().key_bits());

    let blocks = load_blocks(ctxt_file)?;
    let plaintext = attack::recover(&blocks, &oracle).map_err(|e| anyhow!("{}", e))?;

    info!("oracle queries: {}", oracle.queries());

    Ok(String::from_utf8_lossy(&plaintext).into_owned())
}

fn main() {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            print!("{}", e);
            usage();
        }
    };

    if cli.help {
        usage();
    }

    let key_file = match cli.key {
        Some(path) => path,
        None => {
            println!("Missing key file.");
            process::exit(1);
        }
    };

    let ctxt_file = match cli.ctxt {
        Some(path) => path,
        None => {
            println!("Missing ciphertext file to attack.");
            process::exit(1);
        }
    };

    match run(&key_file, &ctxt_file) {
        Ok(plaintext) => println!("{}", plaintext),
        Err(e) => {
            println!("{:#}", e);
            process::exit(1);
        }
    }
}
