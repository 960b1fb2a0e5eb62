use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of a Neynar-compatible API
    #[serde(default = "default_provider_endpoint")]
    pub endpoint: String,
    pub api_key: String,
}

fn default_provider_endpoint() -> String {
    "https://api.neynar.com/v2".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub backtrace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub llm_endpoint: String,
    pub llm_key: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
}

fn default_llm_model() -> String {
    "gemma3:27b".to_string()
}

/// Knobs for the analysis pipeline. Defaults match the documented
/// scoring model: replies*3 + likes*1 + recasts*2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_max_casts")]
    pub max_casts: u32,
    #[serde(default = "default_days_back")]
    pub days_back: u32,
    #[serde(default = "default_velocity_window_hours")]
    pub velocity_window_hours: u32,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_bottom_n")]
    pub bottom_n: usize,
    #[serde(default = "default_cluster_count")]
    pub cluster_count: usize,
    #[serde(default = "default_reply_weight")]
    pub reply_weight: f64,
    #[serde(default = "default_like_weight")]
    pub like_weight: f64,
    #[serde(default = "default_recast_weight")]
    pub recast_weight: f64,
}

fn default_max_casts() -> u32 {
    100
}

fn default_days_back() -> u32 {
    30
}

fn default_velocity_window_hours() -> u32 {
    6
}

fn default_top_n() -> usize {
    5
}

fn default_bottom_n() -> usize {
    5
}

fn default_cluster_count() -> usize {
    7
}

fn default_reply_weight() -> f64 {
    3.0
}

fn default_like_weight() -> f64 {
    1.0
}

fn default_recast_weight() -> f64 {
    2.0
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_casts: default_max_casts(),
            days_back: default_days_back(),
            velocity_window_hours: default_velocity_window_hours(),
            top_n: default_top_n(),
            bottom_n: default_bottom_n(),
            cluster_count: default_cluster_count(),
            reply_weight: default_reply_weight(),
            like_weight: default_like_weight(),
            recast_weight: default_recast_weight(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,
}

fn default_cache_ttl_seconds() -> u64 {
    6 * 60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub logging: LoggingConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(crate::CastCoachError::Io)?;

        let config: AppConfig =
            toml::from_str(&content).map_err(crate::CastCoachError::TomlParsing)?;

        Ok(config)
    }

    /// Load configuration from default config file path
    pub fn load() -> crate::Result<Self> {
        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            println!(
                "Warning: Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            Err(crate::CastCoachError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config file found. Please create config.toml or config.example.toml",
            )))
        }
    }

    /// Get provider API endpoint
    pub fn provider_endpoint(&self) -> &str {
        &self.provider.endpoint
    }

    /// Get provider API key
    pub fn provider_api_key(&self) -> &str {
        &self.provider.api_key
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

    /// Get cache TTL in seconds
    pub fn cache_ttl_seconds(&self) -> u64 {
        self.cache.ttl_seconds
    }

    /// Get engagement weights as a single value object
    pub fn engagement_weights(&self) -> crate::models::EngagementWeights {
        crate::models::EngagementWeights {
            reply: self.analysis.reply_weight,
            like: self.analysis.like_weight,
            recast: self.analysis.recast_weight,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig {
                endpoint: default_provider_endpoint(),
                api_key: String::new(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                backtrace: true,
            },
            llm: LlmConfig {
                llm_endpoint: "http://localhost:11434".to_string(),
                llm_key: "ollama".to_string(),
                llm_model: default_llm_model(),
            },
            analysis: AnalysisConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}
