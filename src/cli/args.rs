use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "recap")]
#[command(about = "Meeting recordings in, summaries and to-do lists out", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the HTTP service (the default)
    Serve,
    /// Print version information
    Version,
    /// Summarize one recording in-process and print the result
    Process(ProcessCliArgs),
    /// Show the status of a job
    Status(StatusCliArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ProcessCliArgs {
    /// Audio (mp3, m4a, wav, ogg) or video (mp4, mov, avi) file
    pub file: PathBuf,
}

#[derive(ClapArgs, Debug)]
pub struct StatusCliArgs {
    /// Job identifier returned at submission
    pub job_id: String,
}
