use crate::cli::StatusCliArgs;
use crate::config::Config;
use crate::db::Database;
use crate::jobs::{job_report, JobId, JobReport};
use anyhow::{anyhow, Context, Result};

pub async fn handle_status_command(args: StatusCliArgs, config: &Config) -> Result<()> {
    let job_id: JobId = args
        .job_id
        .parse()
        .map_err(|_| anyhow!("'{}' is not a job id", args.job_id))?;

    let data_dir = config.storage.resolved_data_dir()?;
    let db = Database::open_in(&data_dir).context("Failed to open database")?;

    let report = job_report(&db, job_id)
        .await?
        .ok_or_else(|| anyhow!("Job {} not found", job_id))?;

    print_report(job_id, &report);
    Ok(())
}

pub fn print_report(job_id: JobId, report: &JobReport) {
    println!("Job:    {}", job_id);
    match report {
        JobReport::Progress { status, message } => {
            println!("Status: {}", status);
            if !message.is_empty() {
                println!("{}", message);
            }
        }
        JobReport::Complete {
            status,
            title,
            transcript,
            summary,
            todo_list,
        } => {
            println!("Status: {}", status);
            println!("Title:  {}", title);
            println!("\nSummary\n-------\n{}", summary);
            println!("\nTo-do\n-----\n{}", todo_list);
            println!("\nTranscript\n----------\n{}", transcript);
        }
    }
}
