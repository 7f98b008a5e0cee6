use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Runtime settings loaded from `settings.json`. Every key is optional in the
/// file; missing keys take the defaults below. A top-level value that is not
/// a JSON object is rejected at parse time.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_http_timeout")]
    pub http_timeout: f64,
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
    #[serde(default = "default_concurrent_downloads")]
    pub concurrent_downloads: usize,
    #[serde(default)]
    pub export: ExportSettings,
}

/// Export targets. `output_json` and `audio_output_dir` always have a value;
/// the remaining formats are skipped entirely when their key is absent.
#[derive(Debug, Deserialize, Clone)]
pub struct ExportSettings {
    #[serde(default = "default_audio_output_dir")]
    pub audio_output_dir: PathBuf,
    #[serde(default = "default_output_json")]
    pub output_json: PathBuf,
    #[serde(default)]
    pub output_csv: Option<PathBuf>,
    #[serde(default)]
    pub output_excel: Option<PathBuf>,
    #[serde(default)]
    pub output_xml: Option<PathBuf>,
    #[serde(default)]
    pub output_html: Option<PathBuf>,
}

fn default_http_timeout() -> f64 {
    30.0
}

fn default_concurrent_requests() -> usize {
    10
}

fn default_concurrent_downloads() -> usize {
    5
}

fn default_audio_output_dir() -> PathBuf {
    PathBuf::from("data/downloads")
}

fn default_output_json() -> PathBuf {
    PathBuf::from("data/output_sample.json")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http_timeout: default_http_timeout(),
            concurrent_requests: default_concurrent_requests(),
            concurrent_downloads: default_concurrent_downloads(),
            export: ExportSettings::default(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            audio_output_dir: default_audio_output_dir(),
            output_json: default_output_json(),
            output_csv: None,
            output_excel: None,
            output_xml: None,
            output_html: None,
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&contents).with_context(|| {
            format!("settings file {} must contain a JSON object", path.display())
        })?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_from_empty_object() {
        let file = write_temp("{}");
        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.http_timeout, 30.0);
        assert_eq!(settings.concurrent_requests, 10);
        assert_eq!(settings.concurrent_downloads, 5);
        assert_eq!(
            settings.export.audio_output_dir,
            PathBuf::from("data/downloads")
        );
        assert_eq!(
            settings.export.output_json,
            PathBuf::from("data/output_sample.json")
        );
        assert!(settings.export.output_csv.is_none());
        assert!(settings.export.output_html.is_none());
    }

    #[test]
    fn test_full_settings() {
        let file = write_temp(
            r#"{
                "http_timeout": 5.5,
                "concurrent_requests": 3,
                "concurrent_downloads": 2,
                "export": {
                    "audio_output_dir": "out/audio",
                    "output_json": "out/tracks.json",
                    "output_csv": "out/tracks.csv",
                    "output_excel": "out/tracks.xls",
                    "output_xml": "out/tracks.xml",
                    "output_html": "out/tracks.html"
                }
            }"#,
        );
        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.http_timeout, 5.5);
        assert_eq!(settings.concurrent_requests, 3);
        assert_eq!(settings.concurrent_downloads, 2);
        assert_eq!(
            settings.export.output_csv,
            Some(PathBuf::from("out/tracks.csv"))
        );
        assert_eq!(
            settings.export.output_excel,
            Some(PathBuf::from("out/tracks.xls"))
        );
    }

    #[test]
    fn test_rejects_non_object_top_level() {
        let file = write_temp(r#"["not", "an", "object"]"#);
        assert!(Settings::from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(Settings::from_file(Path::new("/nonexistent/settings.json")).is_err());
    }
}
