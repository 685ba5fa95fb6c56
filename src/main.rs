use clap::Parser;
use miette::IntoDiagnostic;
use soft_mpack::{classify, reader, unpack, Error};
use soft_runtime::Heap;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::cli::{Command, Options};

pub mod cli;

fn run(command: Command) -> Result<(), Error> {
    let mut heap = Heap::new();

    match command {
        Command::Pack(args) => {
            let value = reader::read(&mut heap, &args.datum)?;
            let bytes = soft_mpack::pack(&heap, value, &args.config())?;
            println!("{}", hex::encode(bytes));
        }
        Command::Unpack(args) => {
            let text: String = args.hex.split_whitespace().collect();
            let bytes = hex::decode(text)?;
            let config = args.config();

            let (payload, _) =
                soft_mpack::wire::read(&bytes, config.max_depth).map_err(Error::Unpack)?;
            println!("{}: {payload}", payload.kind());

            let value = unpack(&bytes, &mut heap, &config)?;
            println!("{}", heap.display(value));
        }
        Command::Classify { datum } => {
            let value = reader::read(&mut heap, &datum)?;
            let word = heap.type_word(value).unwrap_or(value.bits());
            println!("{} {:#018x} {:#x}", classify(&heap, value), value.bits(), word);
        }
    }

    Ok(())
}

fn main() -> miette::Result<()> {
    // Install the panic handler.
    bupropion::install(bupropion::BupropionHandlerOpts::new).into_diagnostic()?;

    let options = Options::parse();

    let level = if options.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).into_diagnostic()?;

    run(options.command).into_diagnostic()
}
