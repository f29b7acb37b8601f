//! Logging for the simulation. This is diagnostic output about what the
//! engine and the agents are doing; it is separate from _reports_, which are
//! the model's CSV output.
//!
//! The five `log` macros are re-exported: `error!`, `warn!`, `info!`,
//! `debug!` and `trace!`.
//!
//! Logging is _disabled_ by default. It is switched on by the `--log-level`
//! command line option or from code:
//!
//!  - `enable_logging()`: turns on all log messages
//!  - `disable_logging()`: turns off all log messages
//!  - `set_log_level(level)`: enables only messages with priority at least `level`
//!
//! Per-module filtering uses the module path as the target:
//!
//! ```rust
//! use outbreak::log::{set_log_level, set_module_filter, LevelFilter};
//!
//! set_log_level(LevelFilter::Warn);
//! // Follow every state transition of the agents.
//! set_module_filter("outbreak::agent", LevelFilter::Trace);
//! ```
pub use ::log::{debug, error, info, trace, warn, LevelFilter};

use std::collections::hash_map::Entry;
use std::str::FromStr;
use std::sync::{LazyLock, Mutex, MutexGuard};

use crate::error::OutbreakError;
use crate::{HashMap, HashMapExt};

#[cfg(feature = "logging")]
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Logger, Root},
    encode::pattern::PatternEncoder,
    Config, Handle,
};

const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Off;

// ISO 8601 timestamp, color coded level, target
#[cfg(feature = "logging")]
const DEFAULT_LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";

static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// Filter levels for the global logger. Only one exists; the public free
/// functions lock it, mutate it and reinstall the logger.
#[derive(Default)]
struct LogConfiguration {
    global_log_level: Option<LevelFilter>,
    module_levels: HashMap<String, LevelFilter>,
    #[cfg(feature = "logging")]
    root_handle: Option<Handle>,
}

impl LogConfiguration {
    fn global_level(&self) -> LevelFilter {
        self.global_log_level.unwrap_or(DEFAULT_LOG_LEVEL)
    }

    fn set_log_level(&mut self, level: LevelFilter) {
        self.global_log_level = Some(level);
        self.install();
    }

    /// Returns true if the configuration changed.
    fn insert_module_filter(&mut self, module: &str, level: LevelFilter) -> bool {
        match self.module_levels.entry(module.to_string()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() == level {
                    return false;
                }
                entry.insert(level);
            }
            Entry::Vacant(entry) => {
                entry.insert(level);
            }
        }
        true
    }

    #[cfg(feature = "logging")]
    fn install(&mut self) {
        let encoder = Box::new(PatternEncoder::new(DEFAULT_LOG_PATTERN));
        let stdout = ConsoleAppender::builder().encoder(encoder).build();
        let mut builder =
            Config::builder().appender(Appender::builder().build("stdout", Box::new(stdout)));
        for (module, level) in &self.module_levels {
            builder = builder.logger(Logger::builder().build(module.clone(), *level));
        }
        let root = Root::builder().appender("stdout").build(self.global_level());
        let config = match builder.build(root) {
            Ok(config) => config,
            Err(e) => panic!("failed to build logging config: {e}"),
        };

        match self.root_handle {
            Some(ref handle) => handle.set_config(config),
            None => match log4rs::init_config(config) {
                Ok(handle) => self.root_handle = Some(handle),
                // Another logger owns the global slot; nothing more to do.
                Err(e) => eprintln!("failed to install logger: {e}"),
            },
        }
    }

    #[cfg(not(feature = "logging"))]
    fn install(&mut self) {
        let most_verbose = self
            .module_levels
            .values()
            .copied()
            .fold(self.global_level(), std::cmp::max);
        ::log::set_max_level(most_verbose);
    }
}

fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION.lock().expect("Mutex poisoned")
}

/// Turns on every log message. Equivalent to `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Turns off every log message. Equivalent to `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the global log level. `LevelFilter::Off` disables logging.
pub fn set_log_level(level: LevelFilter) {
    get_log_configuration().set_log_level(level);
}

/// Sets a level filter for the given module path.
pub fn set_module_filter(module_path: &str, level: LevelFilter) {
    let mut configuration = get_log_configuration();
    if configuration.insert_module_filter(module_path, level) {
        configuration.install();
    }
}

/// Sets several module filters at once, reinstalling the logger only once.
pub fn set_module_filters(module_filters: &[(&str, LevelFilter)]) {
    let mut configuration = get_log_configuration();
    let mut changed = false;
    for (module, level) in module_filters {
        changed |= configuration.insert_module_filter(module, *level);
    }
    if changed {
        configuration.install();
    }
}

/// Removes a module filter so the global level applies to it again.
pub fn remove_module_filter(module_path: &str) {
    let mut configuration = get_log_configuration();
    if configuration.module_levels.remove(module_path).is_some() {
        configuration.install();
    }
}

/// Returns the current global level and the module filters, sorted by module.
#[must_use]
pub fn current_log_levels() -> (LevelFilter, Vec<(String, LevelFilter)>) {
    let configuration = get_log_configuration();
    let mut modules: Vec<_> = configuration
        .module_levels
        .iter()
        .map(|(module, level)| (module.clone(), *level))
        .collect();
    modules.sort();
    (configuration.global_level(), modules)
}

/// A parsed `--log-level` value: an optional global level plus per-module
/// levels, e.g. `warn,outbreak::agent=trace`.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct LogLevelSpec {
    pub global: Option<LevelFilter>,
    pub modules: Vec<(String, LevelFilter)>,
}

impl FromStr for LogLevelSpec {
    type Err = OutbreakError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut parsed = LogLevelSpec::default();
        for item in spec.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            match item.split_once('=') {
                Some((module, level)) => {
                    let level = parse_level(level)?;
                    parsed.modules.push((module.trim().to_string(), level));
                }
                None => {
                    if parsed.global.is_some() {
                        return Err(OutbreakError::config(
                            "log_level",
                            format!("more than one global level in `{spec}`"),
                        ));
                    }
                    parsed.global = Some(parse_level(item)?);
                }
            }
        }
        Ok(parsed)
    }
}

impl LogLevelSpec {
    /// Installs the levels. A spec that names only modules enables those
    /// modules and leaves the global level untouched.
    pub fn apply(&self) {
        if let Some(level) = self.global {
            set_log_level(level);
        }
        let filters: Vec<(&str, LevelFilter)> = self
            .modules
            .iter()
            .map(|(module, level)| (module.as_str(), *level))
            .collect();
        set_module_filters(&filters);
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, OutbreakError> {
    LevelFilter::from_str(level.trim())
        .map_err(|_| OutbreakError::config("log_level", format!("unknown level `{level}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Logging tests share the global logger.
    static TEST_MUTEX: LazyLock<Mutex<()>> = LazyLock::new(Mutex::default);

    #[test]
    fn parses_a_bare_level() {
        let spec: LogLevelSpec = "info".parse().unwrap();
        assert_eq!(spec.global, Some(LevelFilter::Info));
        assert!(spec.modules.is_empty());
    }

    #[test]
    fn parses_module_levels_with_a_global_level() {
        let spec: LogLevelSpec = "outbreak::agent=trace, warn".parse().unwrap();
        assert_eq!(spec.global, Some(LevelFilter::Warn));
        assert_eq!(
            spec.modules,
            vec![("outbreak::agent".to_string(), LevelFilter::Trace)]
        );
    }

    #[test]
    fn rejects_unknown_levels() {
        let err = "outbreak=loud".parse::<LogLevelSpec>().unwrap_err();
        assert!(matches!(
            err,
            OutbreakError::ConfigError {
                field: "log_level",
                ..
            }
        ));
    }

    #[test]
    fn rejects_two_global_levels() {
        assert!("info,debug".parse::<LogLevelSpec>().is_err());
    }

    #[test]
    fn set_and_remove_module_filters() {
        let _guard = TEST_MUTEX.lock().expect("Mutex poisoned");
        set_log_level(LevelFilter::Error);
        set_module_filters(&[
            ("outbreak::agent", LevelFilter::Trace),
            ("outbreak::population", LevelFilter::Debug),
        ]);
        let (global, modules) = current_log_levels();
        assert_eq!(global, LevelFilter::Error);
        assert!(modules.contains(&("outbreak::agent".to_string(), LevelFilter::Trace)));

        remove_module_filter("outbreak::agent");
        remove_module_filter("outbreak::population");
        let (_, modules) = current_log_levels();
        assert!(modules.is_empty());
        disable_logging();
    }
}
