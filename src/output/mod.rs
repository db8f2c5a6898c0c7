use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::extractors::MediaInfo;
use crate::utils::{format_duration, sanitize_filename};
use crate::{Result, TranscriberError};

const RULE: &str = "================================================================";

/// `<sanitized title>_<YYYY-MM-DDTHH-MM-SS>.txt`
pub fn transcript_filename(title: &str, at: &DateTime<Local>) -> String {
    format!("{}_{}.txt", sanitize_filename(title), at.format("%Y-%m-%dT%H-%M-%S"))
}

/// Header block followed by the transcript body
pub fn render_document(transcript: &str, info: &MediaInfo, at: &DateTime<Local>) -> String {
    let or_na = |value: Option<String>| value.unwrap_or_else(|| "N/A".to_string());

    let mut doc = String::with_capacity(transcript.len() + 1024);
    doc.push_str(&format!("{RULE}\nAUDIO/VIDEO TRANSCRIPTION\n{RULE}\n\n"));
    doc.push_str(&format!("Title: {}\n", info.title));
    doc.push_str(&format!("Author: {}\n", or_na(info.author.clone())));
    doc.push_str(&format!("Duration: {}\n", or_na(info.duration_seconds.map(format_duration))));
    doc.push_str(&format!("Source: {}\n", info.source));
    doc.push_str(&format!("Transcribed at: {}\n\n", at.format("%Y-%m-%d %H:%M:%S")));
    doc.push_str(&format!("{RULE}\nTRANSCRIPT\n{RULE}\n\n"));
    doc.push_str(transcript);
    doc.push_str(&format!("\n\n{RULE}\n"));
    doc
}

/// Save transcript to a new file in `dir`
pub fn save_transcription(transcript: &str, info: &MediaInfo, dir: &Path, at: &DateTime<Local>) -> Result<PathBuf> {
    let path = dir.join(transcript_filename(&info.title, at));

    fs_err::write(&path, render_document(transcript, info, at)).map_err(|e| TranscriberError::fs(&path, e))?;

    tracing::info!(path = %path.display(), chars = transcript.len(), "Transcript saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn info() -> MediaInfo {
        MediaInfo {
            title: "My Video!".to_string(),
            author: Some("Some Channel".to_string()),
            duration_seconds: Some(2100.0),
            source: "https://youtu.be/abc".to_string(),
        }
    }

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_filename_from_title_and_timestamp() {
        assert_eq!(transcript_filename("My Video!", &at()), "My_Video_2024-03-09T14-05-07.txt");
    }

    #[test]
    fn test_document_has_header_and_body() {
        let doc = render_document("hello world", &info(), &at());

        assert!(doc.contains("Title: My Video!\n"));
        assert!(doc.contains("Author: Some Channel\n"));
        assert!(doc.contains("Duration: 35:00\n"));
        assert!(doc.contains("Source: https://youtu.be/abc\n"));
        assert!(doc.contains("Transcribed at: 2024-03-09 14:05:07\n"));
        assert!(doc.contains("TRANSCRIPT\n"));
        assert!(doc.contains("\n\nhello world\n\n"));
    }

    #[test]
    fn test_missing_fields_render_as_na() {
        let mut info = info();
        info.author = None;
        info.duration_seconds = None;

        let doc = render_document("x", &info, &at());

        assert!(doc.contains("Author: N/A\n"));
        assert!(doc.contains("Duration: N/A\n"));
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();

        let path = save_transcription("hello world", &info(), dir.path(), &at()).unwrap();

        assert_eq!(path, dir.path().join("My_Video_2024-03-09T14-05-07.txt"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("hello world"));
        assert!(content.starts_with(RULE));
    }

    #[test]
    fn test_save_into_missing_dir_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_transcription("x", &info(), &dir.path().join("gone"), &at()).unwrap_err();
        assert!(matches!(err, TranscriberError::Filesystem { .. }));
    }
}
