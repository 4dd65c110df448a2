use crate::api::{ApiServer, ApiState};
use crate::config::Config;
use crate::db::Database;
use crate::jobs::{JobQueue, JobWorker, MeetingPipeline};
use crate::media::{FfmpegDecoder, MediaExtractor};
use crate::storage::RecordingStore;
use crate::summary::{OpenAiChatClient, Summarizer};
use crate::transcription::{OpenAiTranscriber, Transcriber};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Wire the pipeline from config: store, recordings, decoder and the
/// OpenAI clients.
pub fn build_pipeline(config: &Config) -> Result<MeetingPipeline> {
    let data_dir = config.storage.resolved_data_dir()?;
    info!("Using data directory {:?}", data_dir);

    let db = Database::open_in(&data_dir).context("Failed to open database")?;
    let recordings = RecordingStore::new(&data_dir);

    let decoder = match FfmpegDecoder::locate(config.media.ffmpeg_path.as_deref()) {
        Ok(decoder) => {
            info!("Using ffmpeg at {:?}", decoder.binary());
            decoder
        }
        Err(e) => {
            // Audio uploads still work; video jobs fail with this error.
            warn!("{}", e);
            FfmpegDecoder::new("ffmpeg")
        }
    };
    let extractor = MediaExtractor::new(Arc::new(decoder));

    let transcriber: Arc<dyn Transcriber> = Arc::new(
        OpenAiTranscriber::from_config(&config.openai)
            .context("Failed to configure transcription client")?,
    );
    let summarizer = Summarizer::new(Arc::new(
        OpenAiChatClient::from_config(&config.openai)
            .context("Failed to configure summarization client")?,
    ));

    Ok(MeetingPipeline::new(
        db,
        recordings,
        extractor,
        transcriber,
        summarizer,
    ))
}

pub async fn run_service(config: Config) -> Result<()> {
    info!("Starting recap service");

    let pipeline = build_pipeline(&config)?;
    let db = pipeline.database().clone();

    let recovered = pipeline.recover_interrupted().await?;
    if recovered > 0 {
        warn!("Marked {} interrupted job(s) as failed", recovered);
    }

    let (queue, receiver) = JobQueue::new(db.clone(), config.jobs.queue_capacity);
    let worker = JobWorker::new(receiver, pipeline, config.jobs.max_concurrent);
    tokio::spawn(worker.run());

    let api_server = ApiServer::new(ApiState { queue, db }, &config);

    info!("recap is ready!");
    info!(
        "Try: curl -F audio_file=@meeting.mp3 http://{}:{}/api/jobs",
        config.server.host, config.server.port
    );

    api_server.start().await
}
