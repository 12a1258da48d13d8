use clap::Parser;
use flapjack::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.run().await {
        Ok(()) => Ok(()),
        Err(e) if e.is_cancellation() => {
            // A declined prompt or Ctrl-C is not a failure worth a stack of
            // error context; just exit non-zero.
            eprintln!("{e}");
            std::process::exit(130);
        }
        Err(e) => Err(anyhow::Error::new(e)),
    }
}
