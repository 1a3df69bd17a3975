use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GroqConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub groq: GroqConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let groq = GroqConfig {
            api_key: std::env::var("GROQ_API_KEY")?,
            model: std::env::var("GROQ_MODEL").unwrap_or_else(|_| "llama-3.1-8b-instant".into()),
            base_url: std::env::var("GROQ_BASE_URL")
                .unwrap_or_else(|_| "https://api.groq.com/openai/v1".into()),
        };
        Ok(Self { database_url, groq })
    }
}
