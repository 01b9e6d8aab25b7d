pub type Result<T> = core::result::Result<T, CalcError>;

#[derive(thiserror::Error, Debug)]
pub enum CalcError {
    /// The caller handed over something unusable; raised before any I/O.
    #[error("{0}")]
    Config(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Text that does not have the shape `<number> <op> <number> =`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn for_input(text: &str) -> Self {
        Self {
            message: format!("`{}` must be in the form of a math expression, e.g. `2+3=`", text),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Upstream answered with anything other than 200.
    #[error("{code} {reason}")]
    Status { code: u16, reason: String },
    /// Connection, DNS or body read failure.
    #[error("{0}")]
    Request(String),
}

pub mod config {
    use serde::Deserialize;
    use std::env;
    use std::path::PathBuf;

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct CalcConfig {
        pub port: u16,
        pub consumer_url: String,
        pub requests_per_second: f64,
        pub log_dir: PathBuf,
    }

    impl Default for CalcConfig {
        fn default() -> Self {
            Self {
                port: 3000,
                consumer_url: String::from("http://localhost:3000/compute"),
                requests_per_second: 10.0,
                log_dir: PathBuf::from("./logs"),
            }
        }
    }

    impl CalcConfig {
        pub fn load() -> Self {
            if let Ok(path) = env::var("CALC_CONFIG") {
                let Ok(text) = std::fs::read_to_string(path) else { return Self::default() };
                let Ok(cfg) = serde_yaml::from_str::<CalcConfig>(&text) else { return Self::default() };
                return cfg;
            }
            Self::from_lookup(|key| env::var(key).ok())
        }

        pub fn from_lookup<F>(lookup: F) -> Self
        where
            F: Fn(&str) -> Option<String>,
        {
            let mut cfg = Self::default();
            if let Some(v) = lookup("PORT").and_then(|v| v.parse().ok()) { cfg.port = v; }
            if let Some(v) = lookup("CONSUMER_URL").filter(|v| !v.is_empty()) { cfg.consumer_url = v; }
            if let Some(v) = lookup("REQS_PER_SECOND").and_then(|v| v.parse().ok()) { cfg.requests_per_second = v; }
            if let Some(v) = lookup("LOGDIR").filter(|v| !v.is_empty()) { cfg.log_dir = PathBuf::from(v); }
            cfg
        }
    }

}
