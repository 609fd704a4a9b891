use std::env;
use std::fs::File;
use std::str::FromStr;
use std::time::Duration;

use dotenv::dotenv;
use log::{LevelFilter, warn};
use simplelog::{ColorChoice, CombinedLogger, TermLogger, TerminalMode, WriteLogger};

pub mod cache;

pub type Result<T> = std::result::Result<T, Error>;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_STORAGE_URL: &str = "memory://focus-hub/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Env {
    Local,
    Dev,
    Stage,
    Production,
}

impl FromStr for Env {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(Env::Local),
            "dev" => Ok(Env::Dev),
            "stg" => Ok(Env::Stage),
            "prod" => Ok(Env::Production),
            other => Err(Error::InvalidEnv(other.to_string())),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub env: Env,
    pub cache_ttl: Duration,
    pub cache_namespace: String,
    pub storage_base_url: url::Url,

    /// Selects the Redis-backed key/value store for the local cache when set.
    pub redis: Option<cache::Config>,
}

impl Config {
    /// In-memory backends with default TTL and namespace.
    pub fn local() -> Result<Self> {
        Ok(Self {
            env: Env::Local,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_namespace: String::from("@focushub"),
            storage_base_url: url::Url::parse(DEFAULT_STORAGE_URL)?,
            redis: None,
        })
    }

    pub fn env() -> Result<Self> {
        dotenv().ok();

        let env = env::var("ENV")
            .map(|e| e.parse())
            .unwrap_or(Ok(Env::Local))?;

        let cache_ttl = match env::var("CACHE_TTL_SECS") {
            Ok(secs) => Duration::from_secs(secs.parse()?),
            Err(_) => DEFAULT_CACHE_TTL,
        };

        let cache_namespace = env::var("CACHE_NAMESPACE").unwrap_or("@focushub".into());

        let storage_base_url = env::var("STORAGE_BASE_URL").unwrap_or(DEFAULT_STORAGE_URL.into());
        let storage_base_url = url::Url::parse(&storage_base_url)?;

        let redis = match cache::Config::env() {
            Ok(c) => Some(c),
            Err(_) => {
                warn!("REDIS env is not configured, using in-memory cache");
                None
            }
        };

        Ok(Self {
            env,
            cache_ttl,
            cache_namespace,
            storage_base_url,
            redis,
        })
    }
}

pub fn init_logger() -> Result<()> {
    dotenv().ok();

    let rust_log = env::var("RUST_LOG").unwrap_or("info".into());
    let level = LevelFilter::from_str(&rust_log).unwrap_or(LevelFilter::Info);
    let log_file = env::var("SERVICE_NAME")
        .map(|pkg| format!("{pkg}.log"))
        .unwrap_or("focus-hub.log".into());

    CombinedLogger::init(vec![
        TermLogger::new(
            level,
            simplelog::Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(level, simplelog::Config::default(), File::create(log_file)?),
    ])
    .map_err(|e| Error::Logger(e.to_string()))
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid environment: {0}")]
    InvalidEnv(String),
    #[error("failed to initialize logger: {0}")]
    Logger(String),

    #[error(transparent)]
    _Env(#[from] env::VarError),
    #[error(transparent)]
    _ParseInt(#[from] std::num::ParseIntError),
    #[error(transparent)]
    _Url(#[from] url::ParseError),
    #[error(transparent)]
    _Io(#[from] std::io::Error),
    #[error(transparent)]
    _Redis(#[from] redis::RedisError),
}
