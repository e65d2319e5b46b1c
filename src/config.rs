use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_QA_API_URL: &str =
    "https://api-inference.huggingface.co/models/deepset/roberta-base-squad2";

/// Upper bound on drafts from either generation path.
pub const DEFAULT_MAX_DRAFTS: usize = 5;

#[derive(Clone, Debug)]
pub struct QaConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub request_timeout: Duration,
    pub overall_timeout: Duration,
    pub concurrency: usize,
}

impl QaConfig {
    /// A blank key counts as missing.
    pub fn has_credential(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_QA_API_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            overall_timeout: Duration::from_secs(60),
            concurrency: 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GenerationConfig {
    pub max_drafts: usize,
    pub chunk_max_length: usize,
    pub max_chunks: usize,
    pub questions_per_chunk: usize,
    pub min_answer_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_drafts: DEFAULT_MAX_DRAFTS,
            chunk_max_length: 500,
            max_chunks: 5,
            questions_per_chunk: 2,
            min_answer_chars: 10,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub default_sender: String,
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl MailConfig {
    /// Username and password, when both are set and non-blank.
    pub fn smtp_credentials(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.trim().is_empty())?;
        Some((username, password))
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            default_sender: "noreply@aistudybuddy.com".to_string(),
            server: "smtp.gmail.com".to_string(),
            port: 587,
            use_tls: true,
            username: None,
            password: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub qa: QaConfig,
    pub generation: GenerationConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = env::var("STUDY_BUDDY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let qa_defaults = QaConfig::default();
        let generation_defaults = GenerationConfig::default();
        let mail_defaults = MailConfig::default();

        Self {
            bind_addr: env::var("STUDY_BUDDY_BIND")
                .unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            data_dir,
            qa: QaConfig {
                api_key: env::var("HUGGINGFACE_API_KEY").ok(),
                api_url: env::var("HUGGINGFACE_API_URL")
                    .unwrap_or_else(|_| DEFAULT_QA_API_URL.to_string()),
                request_timeout: env_parse("QA_REQUEST_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(qa_defaults.request_timeout),
                overall_timeout: env_parse("QA_OVERALL_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(qa_defaults.overall_timeout),
                concurrency: env_parse::<usize>("QA_CONCURRENCY")
                    .unwrap_or(qa_defaults.concurrency)
                    .max(1),
            },
            generation: GenerationConfig {
                max_drafts: env_parse("MAX_DRAFTS").unwrap_or(generation_defaults.max_drafts),
                chunk_max_length: env_parse::<usize>("CHUNK_MAX_LENGTH")
                    .unwrap_or(generation_defaults.chunk_max_length)
                    .max(1),
                max_chunks: env_parse("MAX_CHUNKS").unwrap_or(generation_defaults.max_chunks),
                questions_per_chunk: env_parse("QUESTIONS_PER_CHUNK")
                    .unwrap_or(generation_defaults.questions_per_chunk),
                min_answer_chars: env_parse("MIN_ANSWER_CHARS")
                    .unwrap_or(generation_defaults.min_answer_chars),
            },
            mail: MailConfig {
                default_sender: env::var("MAIL_DEFAULT_SENDER")
                    .unwrap_or(mail_defaults.default_sender),
                server: env::var("MAIL_SERVER").unwrap_or(mail_defaults.server),
                port: env_parse("MAIL_PORT").unwrap_or(mail_defaults.port),
                use_tls: env::var("MAIL_USE_TLS")
                    .map(|v| env_flag(&v))
                    .unwrap_or(mail_defaults.use_tls),
                username: env::var("MAIL_USERNAME").ok(),
                password: env::var("MAIL_PASSWORD").ok(),
            },
        }
    }

    pub fn sqlite_dsn(&self) -> String {
        format!(
            "sqlite://{}",
            self.data_dir.join("study_buddy.sqlite3").display()
        )
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "on" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_not_a_credential() {
        let mut qa = QaConfig::default();
        assert!(!qa.has_credential());

        qa.api_key = Some("   ".to_string());
        assert!(!qa.has_credential());

        qa.api_key = Some("hf_abc".to_string());
        assert!(qa.has_credential());
    }

    #[test]
    fn smtp_needs_username_and_password() {
        let mut mail = MailConfig::default();
        assert!(mail.smtp_credentials().is_none());

        mail.username = Some("ada@example.com".to_string());
        assert!(mail.smtp_credentials().is_none());

        mail.password = Some(" ".to_string());
        assert!(mail.smtp_credentials().is_none());

        mail.password = Some("app-password".to_string());
        assert_eq!(
            mail.smtp_credentials(),
            Some(("ada@example.com", "app-password"))
        );
    }

    #[test]
    fn tls_flag_accepts_common_spellings() {
        assert!(env_flag("true"));
        assert!(env_flag(" ON "));
        assert!(env_flag("1"));
        assert!(!env_flag("false"));
        assert!(!env_flag("yes"));
    }

    #[test]
    fn generation_defaults_cap_at_five() {
        let generation = GenerationConfig::default();
        assert_eq!(generation.max_drafts, 5);
        assert_eq!(generation.chunk_max_length, 500);
        assert_eq!(generation.max_chunks * generation.questions_per_chunk, 10);
    }
}
