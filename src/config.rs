use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub whisper: WhisperConfig,
    pub summarizer: SummarizerConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
    /// Origins allowed to call the API cross-origin. "*" allows any origin.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Local speech model selection, resolved once at service startup.
#[derive(Debug, Clone, Deserialize)]
pub struct WhisperConfig {
    pub model_size: String,
    pub device: String,
    pub compute_type: String,
    /// Path to the whisper-cli binary. Searched in the usual build locations when not set.
    pub binary_path: Option<String>,
    /// Directory holding ggml model files. Defaults to "models" next to the binary.
    pub model_dir: Option<String>,
    pub threads: u32,
}

/// External summarization backend. Both `api_url` and `api_key` must be set
/// for the remote path; otherwise the local fallback summarizer is used.
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the transcription service.
    pub backend_url: String,
    pub language: String,
    pub beam_size: u32,
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from an optional file plus VOXNOTE_* environment
    /// overrides (e.g. VOXNOTE_SUMMARIZER__API_KEY).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "voxnote")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8000_i64)?
            .set_default("service.allowed_origins", vec!["http://localhost:3000"])?
            .set_default("whisper.model_size", "base")?
            .set_default("whisper.device", "cpu")?
            .set_default("whisper.compute_type", "int8")?
            .set_default("whisper.threads", 4_i64)?
            .set_default("summarizer.model", "gpt-4o-mini")?
            .set_default("client.backend_url", "http://127.0.0.1:8000")?
            .set_default("client.language", "en")?
            .set_default("client.beam_size", 5_i64)?
            .set_default("client.timeout_secs", 120_i64)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("VOXNOTE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_config_file() {
        let cfg = Config::load("config/does-not-exist").unwrap();

        assert_eq!(cfg.service.http.port, 8000);
        assert_eq!(cfg.whisper.model_size, "base");
        assert_eq!(cfg.client.language, "en");
        assert_eq!(cfg.client.beam_size, 5);
        assert!(cfg.summarizer.api_url.is_none());
    }
}
