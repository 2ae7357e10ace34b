//! Configuration resolution for historify-ai
//!
//! Secrets and connection strings resolve with ENV → TOML priority. Blank
//! values count as absent. A value present in both places logs a warning and
//! the environment wins.

use historify_common::config::TomlConfig;
use tracing::{info, warn};

use crate::db::SupabaseSettings;
use crate::services::image_store::FirebaseSettings;
use crate::services::vision_analyzer::{OpenAiSettings, DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";
pub const SUPABASE_KEY_ENV: &str = "SUPABASE_KEY";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const FIREBASE_API_KEY_ENV: &str = "FIREBASE_API_KEY";
pub const FIREBASE_BUCKET_ENV: &str = "FIREBASE_BUCKET";

pub const DEFAULT_PORT: u16 = 5780;

/// Everything the service needs beyond the root folder
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub openai: OpenAiSettings,
    pub supabase: Option<SupabaseSettings>,
    pub database_url: Option<String>,
    pub firebase: Option<FirebaseSettings>,
    pub geocoding_enabled: bool,
    pub geocoding_base_url: Option<String>,
}

impl ServiceSettings {
    pub fn resolve(toml_config: &TomlConfig) -> Self {
        let openai = OpenAiSettings {
            api_key: resolve_value(OPENAI_API_KEY_ENV, toml_config.openai.api_key.as_deref()),
            model: non_blank(toml_config.openai.model.as_deref())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: non_blank(toml_config.openai.base_url.as_deref())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        };

        let supabase = match (
            resolve_value(SUPABASE_URL_ENV, toml_config.supabase.url.as_deref()),
            resolve_value(SUPABASE_KEY_ENV, toml_config.supabase.key.as_deref()),
        ) {
            (Some(url), Some(key)) => Some(SupabaseSettings {
                url,
                key,
                table: non_blank(toml_config.supabase.table.as_deref())
                    .unwrap_or_else(|| crate::db::supabase::DEFAULT_TABLE.to_string()),
            }),
            (None, None) => None,
            _ => {
                warn!("Supabase needs both a URL and a key; cloud backend disabled");
                None
            }
        };

        let database_url = resolve_value(
            DATABASE_URL_ENV,
            toml_config.postgres.database_url.as_deref(),
        );

        let firebase = match (
            resolve_value(FIREBASE_API_KEY_ENV, toml_config.firebase.api_key.as_deref()),
            resolve_value(FIREBASE_BUCKET_ENV, toml_config.firebase.bucket.as_deref()),
        ) {
            (Some(api_key), Some(bucket)) => Some(FirebaseSettings { api_key, bucket }),
            (None, None) => None,
            _ => {
                warn!("Firebase needs both an API key and a bucket; remote image storage disabled");
                None
            }
        };

        Self {
            openai,
            supabase,
            database_url,
            firebase,
            geocoding_enabled: toml_config.geocoding.enabled,
            geocoding_base_url: non_blank(toml_config.geocoding.base_url.as_deref()),
        }
    }
}

/// Resolve one value from `env_var`, then the TOML value
pub fn resolve_value(env_var: &str, toml_value: Option<&str>) -> Option<String> {
    let env_value = std::env::var(env_var).ok().and_then(|v| non_blank(Some(&v)));
    let toml_value = non_blank(toml_value);

    match (env_value, toml_value) {
        (Some(env), Some(_)) => {
            warn!(
                "{} found in both environment and TOML config. Using environment (higher priority).",
                env_var
            );
            Some(env)
        }
        (Some(env), None) => {
            info!("{} loaded from environment variable", env_var);
            Some(env)
        }
        (None, Some(toml)) => {
            info!("{} loaded from TOML config", env_var);
            Some(toml)
        }
        (None, None) => None,
    }
}

/// Port priority: CLI or `HISTORIFY_PORT` (via clap) → TOML → default
pub fn resolve_port(cli_port: Option<u16>, toml_config: &TomlConfig) -> u16 {
    cli_port.or(toml_config.port).unwrap_or(DEFAULT_PORT)
}

/// Trimmed value, `None` when blank
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
