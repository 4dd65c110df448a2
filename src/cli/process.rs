use crate::app::build_pipeline;
use crate::cli::{print_report, ProcessCliArgs};
use crate::config::Config;
use crate::db::JobRepository;
use crate::jobs::{job_report, Job, PipelineTask};
use anyhow::{anyhow, Context, Result};
use tracing::info;

/// Run one recording through the pipeline without the HTTP service.
pub async fn handle_process_command(args: ProcessCliArgs, config: &Config) -> Result<()> {
    let filename = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("{:?} has no usable file name", args.file))?
        .to_string();

    let content = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Could not read {:?}", args.file))?;

    let pipeline = build_pipeline(config)?;
    let db = pipeline.database().clone();

    let job = Job::new();
    let job_id = job.id;
    db.call(move |conn| JobRepository::insert(conn, &job))
        .await
        .context("Failed to create job")?;

    info!("Processing {} as job {}", filename, job_id);
    pipeline
        .run(PipelineTask {
            job_id,
            content,
            filename,
        })
        .await;

    let report = job_report(&db, job_id)
        .await?
        .ok_or_else(|| anyhow!("Job {} disappeared", job_id))?;
    print_report(job_id, &report);

    Ok(())
}
