//! Diarybox CLI - encrypt a directory of diary files
//!
//! Every `*.txt` file in the target directory is sealed into a sibling
//! `*.txt.enc` envelope under one passphrase, and `manifest.json` is
//! rewritten to list the envelopes.

use clap::Parser;
use std::path::PathBuf;
use std::process;

use diarybox::batch::{self, BatchConfig};
use diarybox::kdf::DEFAULT_ITERATIONS;
use diarybox::logging;
use diarybox::passphrase::{LinePassphraseReader, PassphraseReader, TerminalPassphraseReader};

#[derive(Parser)]
#[command(name = "diarybox")]
#[command(version)]
#[command(about = "Encrypt a directory of diary files with a passphrase.", long_about = None)]
struct Cli {
    /// Directory holding the plaintext .txt diary files
    #[arg(value_name = "DIR", default_value = batch::DEFAULT_DIR)]
    dir: PathBuf,

    /// PBKDF2 iteration count recorded in each new envelope
    #[arg(
        long,
        env = "DIARYBOX_ITERATIONS",
        default_value_t = DEFAULT_ITERATIONS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    iterations: u32,

    /// Read the passphrase and its confirmation as two lines from stdin
    /// instead of from terminal
    #[arg(long)]
    passphrase_stdin: bool,

    /// Log filter, e.g. "info" or "diarybox=debug" (RUST_LOG takes precedence)
    #[arg(long, value_name = "FILTER", default_value = "warn")]
    log_level: String,
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let config = BatchConfig::new(cli.dir).with_iterations(cli.iterations);
    let mut reader = get_passphrase_reader(cli.passphrase_stdin);

    match batch::encrypt_directory(&config, &mut *reader) {
        Ok(report) => match report.manifest {
            None => eprintln!("Nothing to encrypt in {}", config.dir.display()),
            Some(manifest) => {
                for name in &report.encrypted {
                    eprintln!("Encrypted {}", name);
                }
                eprintln!("Wrote {}", manifest.display());
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e.chain_message());
            process::exit(1);
        }
    }
}

fn get_passphrase_reader(use_stdin: bool) -> Box<dyn PassphraseReader> {
    if use_stdin {
        Box::new(LinePassphraseReader::new(Box::new(std::io::stdin().lock())))
    } else {
        Box::new(TerminalPassphraseReader)
    }
}
