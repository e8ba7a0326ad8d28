//! Decrypt a single diarybox envelope to stdout.

use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use diarybox::file_ops;
use diarybox::logging;
use diarybox::passphrase::{
    LinePassphraseReader, PROMPT, PassphraseReader, SessionSecret, TerminalPassphraseReader,
};
use diarybox::{DiaryboxError, ErrorCategory, ErrorKind, Result};

#[derive(Parser)]
#[command(name = "diarybox-open")]
#[command(version)]
#[command(about = "Decrypt a diarybox envelope and print the diary text.", long_about = None)]
struct Cli {
    /// Path to the .enc envelope file to decrypt
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Read passphrase from stdin instead of from terminal
    #[arg(long)]
    passphrase_stdin: bool,

    /// Log filter (RUST_LOG takes precedence)
    #[arg(long, value_name = "FILTER", default_value = "warn")]
    log_level: String,
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e.chain_message());
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut reader: Box<dyn PassphraseReader> = if cli.passphrase_stdin {
        Box::new(LinePassphraseReader::new(Box::new(io::stdin().lock())))
    } else {
        Box::new(TerminalPassphraseReader)
    };
    let mut session = SessionSecret::new(reader.read_passphrase(PROMPT)?);

    let text = file_ops::decrypt_file(&cli.input, &mut session)?;
    session.clear();

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(|e| {
            DiaryboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "failed to write plaintext to stdout",
                e,
            )
        })
}
