use std::{fs::File, io::BufReader, path::PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use spriteweave::{ExtractJob, extract};

#[derive(Parser, Debug)]
#[command(name = "spriteweave", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a sprite extraction job described by a JSON file.
    Extract(ExtractArgs),
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Input job JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Extract(args) => {
            let file = File::open(&args.in_path)
                .with_context(|| format!("failed to open '{}'", args.in_path.display()))?;
            let job: ExtractJob = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("failed to parse '{}'", args.in_path.display()))?;

            let written = extract::run_job(&job)?;
            println!(
                "wrote {written} frame(s) to '{}'",
                job.output_dir.display()
            );
        }
    }

    Ok(())
}
