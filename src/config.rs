use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub cors_origin: String,
    pub pagination: PaginationConfig,
    pub limits: LimitsConfig,
    pub scheduler: SchedulerConfig,
    pub importer: ImporterConfig,
}

#[derive(Debug, Clone)]
pub struct PaginationConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Rows committed per `Store::bulk_upsert_words` transaction.
    pub import_batch_size: usize,
    /// Row errors kept in `ImportJob.message` before they are dropped.
    pub import_row_error_cap: usize,
    /// Maximum request body size accepted on `/words/bulk` (bytes).
    pub max_upload_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            import_batch_size: 500,
            import_row_error_cap: 50,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub default_limit: u64,
    pub max_limit: u64,
    pub default_new_limit: u64,
    pub rolling_offsets_days: &'static [i64],
    pub leech_lapses_threshold: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_limit: 30,
            max_limit: 100,
            default_new_limit: 10,
            rolling_offsets_days: &[1, 2, 4, 7],
            leech_lapses_threshold: 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImporterConfig {
    /// Process-wide concurrent import cap (W in spec terms).
    pub max_concurrent_imports: usize,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            max_concurrent_imports: 2,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("enable_file_logs", &self.enable_file_logs)
            .field("log_dir", &self.log_dir)
            .field("sled_path", &self.sled_path)
            .field("cors_origin", &self.cors_origin)
            .field("pagination", &self.pagination)
            .field("limits", &self.limits)
            .field("scheduler", &self.scheduler)
            .field("importer", &self.importer)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        let config = Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: normalized_sled_path(&env_or("DATABASE_URL", "./wordflow.db")),
            cors_origin: env_or("APP_ORIGINS", "http://localhost:5173"),
            pagination: PaginationConfig {
                default_page_size: env_or_parse("PAGINATION_DEFAULT_SIZE", 20_u64),
                max_page_size: env_or_parse("PAGINATION_MAX_SIZE", 100_u64),
            },
            limits: LimitsConfig {
                import_batch_size: env_or_parse("IMPORT_BATCH_SIZE", 500_usize),
                import_row_error_cap: env_or_parse("IMPORT_ROW_ERROR_CAP", 50_usize),
                max_upload_bytes: env_or_parse("MAX_UPLOAD_BYTES", 20 * 1024 * 1024_usize),
            },
            scheduler: SchedulerConfig {
                default_limit: env_or_parse("STUDY_DEFAULT_LIMIT", 30_u64),
                max_limit: env_or_parse("STUDY_MAX_LIMIT", 100_u64),
                default_new_limit: env_or_parse("STUDY_DEFAULT_NEW_LIMIT", 10_u64),
                rolling_offsets_days: &[1, 2, 4, 7],
                leech_lapses_threshold: env_or_parse("LEECH_LAPSES_THRESHOLD", 8_u32),
            },
            importer: ImporterConfig {
                max_concurrent_imports: env_or_parse("IMPORT_MAX_CONCURRENT", 2_usize),
            },
        };

        config
    }
}

fn normalized_sled_path(raw: &str) -> String {
    let path = Path::new(raw);
    if path.is_absolute() {
        return path.to_string_lossy().to_string();
    }

    let project_root = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    project_root.join(path).to_string_lossy().to_string()
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Failed to parse env var, using default");
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
