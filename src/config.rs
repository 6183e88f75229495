use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::embeddings::EmbeddingProvider;
use crate::llm::CompletionProvider;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub enable_cors: bool,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_cookie_name() -> String {
    "barcraft_session".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub backtrace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: CompletionProvider,
    pub llm_endpoint: String,
    pub llm_key: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Sent as `HTTP-Referer` when talking to an OpenAI-compatible gateway
    #[serde(default)]
    pub gateway_referer: Option<String>,
    /// Sent as `X-Title` when talking to an OpenAI-compatible gateway
    #[serde(default)]
    pub gateway_title: Option<String>,
}

pub(crate) fn default_llm_model() -> String {
    "gpt-3.5-turbo".to_string()
}

pub(crate) fn default_llm_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

pub(crate) fn default_embedding_timeout() -> u64 {
    30
}

pub(crate) fn default_batch_size() -> usize {
    32
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    pub index_path: PathBuf,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Name the knowledge base goes by inside composed prompts
    #[serde(default = "default_knowledge_label")]
    pub label: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

pub(crate) fn default_top_k() -> usize {
    3
}

pub(crate) fn default_knowledge_label() -> String {
    "Cocktail Codex".to_string()
}

pub(crate) fn default_chunk_size() -> usize {
    800
}

pub(crate) fn default_chunk_overlap() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    pub system_prompt_path: PathBuf,
    /// Upper bound on replayed history characters per request; unset replays everything
    #[serde(default)]
    pub history_char_budget: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Memory,
    #[default]
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default)]
    pub backend: SessionBackend,
    #[serde(default = "default_sessions_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
}

fn default_sessions_dir() -> PathBuf {
    PathBuf::from("sessions")
}

pub(crate) fn default_session_ttl() -> u64 {
    86_400
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_document_title")]
    pub document_title: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default = "default_line_width")]
    pub line_width: usize,
}

fn default_document_title() -> String {
    "Raise the Bar Consulting - AI Session Summary".to_string()
}

fn default_file_name() -> String {
    "raise_the_bar_ai_summary.pdf".to_string()
}

pub(crate) fn default_line_width() -> usize {
    100
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            document_title: default_document_title(),
            file_name: default_file_name(),
            line_width: default_line_width(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub from_email: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_body")]
    pub body: String,
}

pub(crate) fn default_smtp_port() -> u16 {
    465
}

fn default_subject() -> String {
    "Raise the Bar - AI Session Summary".to_string()
}

fn default_body() -> String {
    "Attached is the PDF summary of your session with Raise the Bar AI Bar Manager.".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub llm: LlmConfig,
    pub embeddings: EmbeddingsConfig,
    pub knowledge: KnowledgeConfig,
    pub prompt: PromptConfig,
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub export: ExportConfig,
    /// Mail delivery is disabled when this section is absent
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default config file path
    pub fn load() -> crate::Result<Self> {
        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            tracing::warn!(
                "Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            Err(crate::BarcraftError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config file found. Please create config.toml or config.example.toml",
            )))
        }
    }

    /// Secrets are kept out of the TOML file when these variables are set
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("BARCRAFT_LLM_KEY") {
            self.llm.llm_key = key;
        }
        if let Ok(key) = std::env::var("BARCRAFT_EMBEDDINGS_KEY") {
            self.embeddings.api_key = Some(key);
        }
        if let Some(smtp) = self.smtp.as_mut() {
            if let Ok(password) = std::env::var("BARCRAFT_SMTP_PASSWORD") {
                smtp.password = password;
            }
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.knowledge.top_k == 0 {
            return Err(crate::BarcraftError::Config(
                "knowledge.top_k must be at least 1".to_string(),
            ));
        }
        if self.knowledge.chunk_size == 0
            || self.knowledge.chunk_overlap >= self.knowledge.chunk_size
        {
            return Err(crate::BarcraftError::Config(format!(
                "knowledge.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.knowledge.chunk_overlap, self.knowledge.chunk_size
            )));
        }
        if self.export.line_width == 0 {
            return Err(crate::BarcraftError::Config(
                "export.line_width must be at least 1".to_string(),
            ));
        }
        if self.embeddings.dimension == 0 {
            return Err(crate::BarcraftError::Config(
                "embeddings.dimension must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get LLM endpoint
    pub fn llm_endpoint(&self) -> &str {
        &self.llm.llm_endpoint
    }

    /// Get LLM key
    pub fn llm_key(&self) -> &str {
        &self.llm.llm_key
    }

    /// Get LLM model
    pub fn llm_model(&self) -> &str {
        &self.llm.llm_model
    }

    /// Get embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.embeddings.model
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }

    pub fn index_path(&self) -> &Path {
        &self.knowledge.index_path
    }

    pub fn top_k(&self) -> usize {
        self.knowledge.top_k
    }

    pub fn session_ttl_secs(&self) -> u64 {
        self.sessions.ttl_secs
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                enable_cors: false,
                cookie_name: default_cookie_name(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                backtrace: true,
            },
            llm: LlmConfig {
                provider: CompletionProvider::OpenAi,
                llm_endpoint: "https://api.openai.com/v1".to_string(),
                llm_key: String::new(),
                llm_model: default_llm_model(),
                timeout_secs: default_llm_timeout(),
                temperature: None,
                gateway_referer: None,
                gateway_title: None,
            },
            embeddings: EmbeddingsConfig {
                provider: EmbeddingProvider::Ollama,
                endpoint: "http://localhost:11434".to_string(),
                api_key: None,
                model: "all-minilm".to_string(),
                dimension: 384,
                timeout_secs: default_embedding_timeout(),
                batch_size: default_batch_size(),
            },
            knowledge: KnowledgeConfig {
                index_path: PathBuf::from("vector_index/index.json"),
                top_k: default_top_k(),
                label: default_knowledge_label(),
                chunk_size: default_chunk_size(),
                chunk_overlap: default_chunk_overlap(),
            },
            prompt: PromptConfig {
                system_prompt_path: PathBuf::from("system_prompt.txt"),
                history_char_budget: None,
            },
            sessions: SessionsConfig {
                backend: SessionBackend::File,
                dir: default_sessions_dir(),
                ttl_secs: default_session_ttl(),
            },
            export: ExportConfig::default(),
            smtp: None,
        }
    }
}
