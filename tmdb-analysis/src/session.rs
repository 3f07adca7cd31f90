use std::path::Path;

use log::{debug, info};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::util::read_file;

/// Configuration for an analysis session.
///
/// Every field has a default, so an empty TOML document (or no document at
/// all) is a valid configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// A name for this session, used in log messages and thread names.
    pub app_name: String,
    /// The number of worker threads. Zero means one per CPU.
    pub threads: usize,
    /// The number of top billed cast members kept on each movie.
    pub top_cast: usize,
}

impl Default for SessionConfig {
    fn default() -> SessionConfig {
        SessionConfig {
            app_name: "tmdb-analysis".to_string(),
            threads: 0,
            top_cast: 5,
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<SessionConfig> {
        toml::from_str(text).map_err(|e| Error::config(e.to_string()))
    }

    /// Read a configuration from a TOML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<SessionConfig> {
        let path = path.as_ref();
        let config = SessionConfig::from_toml(&read_file(path)?)?;
        debug!("read session config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}

/// The execution context of an analysis.
///
/// A session owns the thread pool that every data-parallel stage runs on.
/// Components borrow a session rather than reaching for global state, and
/// the pool lives exactly as long as the session.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    pool: rayon::ThreadPool,
}

impl Session {
    /// Start a new session with the given configuration.
    pub fn new(config: SessionConfig) -> Result<Session> {
        let name = config.app_name.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(move |i| format!("{}-{}", name, i))
            .build()
            .map_err(|e| Error::config(e.to_string()))?;
        info!(
            "started session '{}' with {} threads",
            config.app_name,
            pool.current_num_threads()
        );
        Ok(Session { config, pool })
    }

    /// The configuration this session was started with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The number of worker threads in this session.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run the given closure on this session's thread pool. Any parallel
    /// iterators used within the closure run on this pool.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// End this session and release its threads.
    pub fn shutdown(self) {
        info!("stopping session '{}'", self.config.app_name);
        drop(self.pool);
    }
}
