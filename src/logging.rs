//! env_logger wiring for embedding applications and tests

use env_logger::Env;
use log::debug;

/// Environment variable that overrides the configured filter
pub const LOG_ENV: &str = "INFUSE_LOG";

/// Install the global logger; `INFUSE_LOG` wins over `default_filter`.
/// Returns false if a logger was already installed, which stays in place.
pub fn init_logging(default_filter: Option<&str>) -> bool
{   let env = Env::new()
      .filter_or(LOG_ENV, default_filter.unwrap_or("info"));
    match env_logger::Builder::from_env(env).try_init()
    {   Ok(()) => {
          debug!("Logger installed");
          true
        }
      , Err(_) => false
    }
}

/// Logger for tests: output captured by the harness, never fails
pub fn init_test_logging()
{   let _ = env_logger::Builder::from_env(
        Env::new().filter_or(LOG_ENV, "debug")
      )
      .is_test(true)
      .try_init();
}
