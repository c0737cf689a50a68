//! CSV export of queue results
//!
//! Every field is quoted; embedded quotes are doubled.

use crate::queue::Job;
use crate::types::AppResult;
use csv::{QuoteStyle, WriterBuilder};
use std::path::Path;
use tracing::info;

pub const CSV_HEADER: [&str; 5] = ["File Name", "Emotion", "Intensity", "Voice Identity", "Reasoning"];

fn row(job: &Job) -> [String; 5] {
    match job.result() {
        Some(result) => [
            job.name().to_string(),
            result.emotion_type.clone(),
            result.emotion_level.to_string(),
            result.voice_identity.clone(),
            result.reasoning.clone(),
        ],
        None => [
            job.name().to_string(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ],
    }
}

fn write_rows<W: std::io::Write>(writer: W, jobs: &[Job]) -> AppResult<()> {
    let mut csv = WriterBuilder::new().quote_style(QuoteStyle::Always).from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for job in jobs {
        csv.write_record(row(job))?;
    }
    csv.flush()?;
    Ok(())
}

/// Render jobs as CSV text; unfinished jobs get empty result columns
pub fn to_csv(jobs: &[Job]) -> AppResult<String> {
    let mut buffer = Vec::new();
    write_rows(&mut buffer, jobs)?;
    String::from_utf8(buffer).map_err(|e| crate::types::AppError::Internal(e.to_string()))
}

pub fn write_csv(path: &Path, jobs: &[Job]) -> AppResult<()> {
    let file = std::fs::File::create(path)?;
    write_rows(file, jobs)?;
    info!(path = %path.display(), rows = jobs.len(), "Exported CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisResult, EmotionLevel};
    use crate::encoding::AudioSource;
    use crate::queue::{FailureKind, JobError};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn job(name: &str) -> Job {
        Job::new(AudioSource::new(PathBuf::from(name), 100))
    }

    #[test]
    fn test_completed_and_pending_rows() {
        let mut done = job("take \"one\".wav");
        done.complete(AnalysisResult {
            emotion_type: "sad, tired".to_string(),
            emotion_level: EmotionLevel::new(8).unwrap(),
            voice_identity: "elderly man".to_string(),
            reasoning: "slow, low pitch".to_string(),
        });
        let mut failed = job("noise.wav");
        failed.fail(JobError {
            kind: FailureKind::Generic,
            attempts: 1,
        });

        let csv = to_csv(&[done, failed, job("idle.mp3")]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            r#""File Name","Emotion","Intensity","Voice Identity","Reasoning""#
        );
        assert_eq!(
            lines[1],
            r#""take ""one"".wav","sad, tired","8","elderly man","slow, low pitch""#
        );
        assert_eq!(lines[2], r#""noise.wav","","","","""#);
        assert_eq!(lines[3], r#""idle.mp3","","","","""#);
    }

    #[test]
    fn test_idle_job_with_quoted_name() {
        let csv = to_csv(&[job("say \"hi\".wav")]).unwrap();
        assert_eq!(csv.lines().nth(1), Some(r#""say ""hi"".wav","","","","""#));
    }

    #[test]
    fn test_write_csv_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");

        tokio_test::assert_ok!(write_csv(&path, &[job("a.wav")]));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("\"File Name\""));
        assert_eq!(content.lines().count(), 2);
    }
}
