use std::path::PathBuf;

pub const DIR_ENV: &str = "OPENALEA_CACHE_DIR";
pub const TTL_ENV: &str = "OPENALEA_CACHE_TTL_SECONDS";

/// Default entry lifetime in seconds.
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
  pub dir: PathBuf,
  pub ttl_seconds: u64,
}

impl CacheConfig {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self {
      dir: dir.into(),
      ttl_seconds: DEFAULT_TTL_SECONDS,
    }
  }

  pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
    self.ttl_seconds = ttl_seconds;
    self
  }

  /// Read `OPENALEA_CACHE_DIR` and `OPENALEA_CACHE_TTL_SECONDS`.
  pub fn from_env() -> Self {
    let dir = std::env::var_os(DIR_ENV)
      .map(PathBuf::from)
      .unwrap_or_else(default_dir);
    let ttl_seconds = parse_ttl(std::env::var(TTL_ENV).ok().as_deref());
    Self { dir, ttl_seconds }
  }

  /// The configured TTL as a signed cleanup threshold, saturating at
  /// `i64::MAX`.
  pub fn cleanup_ttl(&self) -> i64 {
    i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX)
  }
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self::new(default_dir())
  }
}

fn default_dir() -> PathBuf {
  std::env::temp_dir().join("webalea_object_cache")
}

/// Negative values clamp to zero; anything unparseable means the default.
pub(crate) fn parse_ttl(raw: Option<&str>) -> u64 {
  match raw.map(|s| s.trim().parse::<i64>()) {
    None => DEFAULT_TTL_SECONDS,
    Some(Ok(ttl)) => ttl.max(0) as u64,
    Some(Err(_)) => DEFAULT_TTL_SECONDS,
  }
}
