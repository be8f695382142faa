use chrono::{FixedOffset, Offset, Utc};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 18790;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Local hour at which draws take place when nothing else is known.
pub const DEFAULT_DRAW_HOUR: u32 = 20;
/// Draw calendars are published in UTC+8.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;
pub const DEFAULT_RESULT_FETCH_CRON: &str = "0 30 21 * * *";

/// Top-level config (lotto.toml + LOTTO_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LottoConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub results_api: ResultsApiConfig,
    #[serde(default)]
    pub draw: DrawConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Lottery types seeded into the database on startup (upsert by code).
    #[serde(default)]
    pub lottery_types: Vec<LotteryTypeSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// OpenAI-compatible text generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    /// Empty means "not configured"; generation jobs will fail and log.
    #[serde(default)]
    pub api_key: String,
    /// Overrides the chat completions path appended to `base_url`.
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Higher temperature keeps the combinations of one batch apart.
    #[serde(default = "default_batch_temperature")]
    pub batch_temperature: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: default_ai_base_url(),
            api_key: String::new(),
            chat_path: default_chat_path(),
            timeout_secs: default_ai_timeout_secs(),
            max_retries: default_max_retries(),
            temperature: default_temperature(),
            batch_temperature: default_batch_temperature(),
        }
    }
}

/// Official results provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsApiConfig {
    #[serde(default = "default_results_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub app_key: String,
    #[serde(default = "default_results_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ResultsApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_results_base_url(),
            app_key: String::new(),
            timeout_secs: default_results_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawConfig {
    #[serde(default = "default_draw_hour")]
    pub draw_hour: u32,
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    /// Timeout for the per-lottery draw-info endpoints.
    #[serde(default = "default_info_timeout_secs")]
    pub info_timeout_secs: u64,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            draw_hour: DEFAULT_DRAW_HOUR,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            info_timeout_secs: default_info_timeout_secs(),
        }
    }
}

impl DrawConfig {
    /// Fixed offset used for draw calendars and cron firing times.
    /// Out-of-range offsets fall back to UTC+8.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .or_else(|| FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600))
            .unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Cron expression for the shared "fetch all results" job.
    #[serde(default = "default_result_fetch_cron")]
    pub result_fetch_cron: String,
    /// Analyze a new recommendation immediately when its period's
    /// result is already stored.
    #[serde(default = "bool_true")]
    pub reconcile_on_create: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            result_fetch_cron: default_result_fetch_cron(),
            reconcile_on_create: true,
        }
    }
}

/// A lottery type declared in config and seeded into the database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotteryTypeSeed {
    pub code: String,
    pub name: String,
    pub schedule_cron: String,
    pub model_name: String,
    #[serde(default = "bool_true")]
    pub is_active: bool,
    /// Identifier of this lottery at the results provider.
    #[serde(default)]
    pub results_api_id: Option<i64>,
    /// Optional per-lottery endpoint returning the upcoming draw.
    #[serde(default)]
    pub draw_info_endpoint: Option<String>,
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.lotto/lotto.db", home)
}
fn default_ai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_chat_path() -> String {
    "/v1/chat/completions".to_string()
}
fn default_ai_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_temperature() -> f32 {
    0.7
}
fn default_batch_temperature() -> f32 {
    0.9
}
fn default_results_base_url() -> String {
    "https://api.jisuapi.com/caipiao/query".to_string()
}
fn default_results_timeout_secs() -> u64 {
    10
}
fn default_draw_hour() -> u32 {
    DEFAULT_DRAW_HOUR
}
fn default_utc_offset_hours() -> i32 {
    DEFAULT_UTC_OFFSET_HOURS
}
fn default_info_timeout_secs() -> u64 {
    5
}
fn default_result_fetch_cron() -> String {
    DEFAULT_RESULT_FETCH_CRON.to_string()
}

impl LottoConfig {
    /// Load config from a TOML file with LOTTO_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `LOTTO_AI__API_KEY`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::LottoError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(LottoConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("LOTTO_").split("__"))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.lotto/lotto.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_section() {
        let cfg = LottoConfig::default();
        assert_eq!(cfg.server.port, DEFAULT_PORT);
        assert_eq!(cfg.ai.max_retries, 3);
        assert_eq!(cfg.results_api.timeout_secs, 10);
        assert_eq!(cfg.draw.draw_hour, 20);
        assert_eq!(cfg.scheduler.result_fetch_cron, DEFAULT_RESULT_FETCH_CRON);
        assert!(cfg.lottery_types.is_empty());
    }

    #[test]
    fn toml_overrides_merge_over_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "lotto.toml",
                r#"
                [ai]
                api_key = "sk-test"
                max_retries = 5

                [[lottery_types]]
                code = "tc_dlt"
                name = "Super Lotto"
                schedule_cron = "0 0 20 * * 1,3,6"
                model_name = "gpt-4o-mini"
                results_api_id = 14
                "#,
            )?;
            jail.set_env("LOTTO_DRAW__DRAW_HOUR", "21");

            let cfg = LottoConfig::load(Some("lotto.toml"))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(cfg.ai.api_key, "sk-test");
            assert_eq!(cfg.ai.max_retries, 5);
            assert_eq!(cfg.ai.timeout_secs, 30);
            assert_eq!(cfg.draw.draw_hour, 21);
            assert_eq!(cfg.lottery_types.len(), 1);
            assert!(cfg.lottery_types[0].is_active);
            assert_eq!(cfg.lottery_types[0].results_api_id, Some(14));
            Ok(())
        });
    }

    #[test]
    fn offset_uses_configured_hours() {
        let draw = DrawConfig {
            utc_offset_hours: 9,
            ..DrawConfig::default()
        };
        assert_eq!(draw.offset().local_minus_utc(), 9 * 3600);
    }
}
