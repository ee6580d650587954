use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};

/// Default trigger schedule, standard five-field cron syntax.
pub const DEFAULT_SCHEDULE: &str = "*/5 * * * *";

/// Compression format applied to rotate entries that do not name one.
pub const DEFAULT_COMPRESSION_FORMAT: &str = "gzip";

/// What an entry does to the files that qualify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Remove the file.
    Delete,
    /// Rename to a timestamped name, optionally compress, optionally prune.
    Rotate,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Delete => write!(f, "delete"),
            ActionType::Rotate => write!(f, "rotate"),
        }
    }
}

/// Ordered set of glob patterns.
///
/// Accepts either a single string or a list in the configuration file.
/// Duplicates are dropped, keeping the first occurrence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PathsRepr", into = "Vec<String>")]
pub struct Paths(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum PathsRepr {
    One(String),
    Many(Vec<String>),
}

impl From<PathsRepr> for Paths {
    fn from(repr: PathsRepr) -> Self {
        match repr {
            PathsRepr::One(pattern) => Paths::new([pattern]),
            PathsRepr::Many(patterns) => Paths::new(patterns),
        }
    }
}

impl From<Paths> for Vec<String> {
    fn from(paths: Paths) -> Self {
        paths.0
    }
}

impl Paths {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered: Vec<String> = Vec::new();
        for pattern in patterns {
            let pattern = pattern.into();
            if !ordered.contains(&pattern) {
                ordered.push(pattern);
            }
        }
        Self(ordered)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Paths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

/// Trigger and retention parameters of an entry.
///
/// Every field is optional; `None` means the condition is not configured.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Minimum age, e.g. `"1h"` or `"7d"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,

    /// Size threshold for rotation, e.g. `"100MB"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Number of rotated copies to keep.
    #[serde(default, alias = "maxKeep", skip_serializing_if = "Option::is_none")]
    pub max_keep: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,

    /// `gzip` or `zip`.
    #[serde(
        default,
        alias = "compressionFormat",
        skip_serializing_if = "Option::is_none"
    )]
    pub compression_format: Option<String>,
}

impl Condition {
    /// Whether rotated files should be compressed. Unset means yes.
    pub fn compress_enabled(&self) -> bool {
        self.compress.unwrap_or(true)
    }

    pub fn compression_tag(&self) -> &str {
        self.compression_format
            .as_deref()
            .unwrap_or(DEFAULT_COMPRESSION_FORMAT)
    }
}

/// One configured policy unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "path", alias = "paths")]
    pub paths: Paths,

    #[serde(rename = "type", alias = "action")]
    pub action: ActionType,

    /// Overrides the top-level schedule for this entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl LogEntry {
    /// Fill in the loader defaults for rotate entries.
    pub fn apply_defaults(&mut self) {
        if self.action != ActionType::Rotate {
            return;
        }

        let condition = self.condition.get_or_insert_with(Condition::default);
        if condition.compress.is_none() {
            condition.compress = Some(true);
        }
        if condition.compression_format.is_none() {
            condition.compression_format = Some(DEFAULT_COMPRESSION_FORMAT.to_string());
        }
    }
}

fn default_schedule() -> String {
    DEFAULT_SCHEDULE.to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Configuration {
    /// Schedule used by entries without their own.
    ///
    /// Env: LOGROTOR__SCHEDULE
    #[serde(default = "default_schedule")]
    pub schedule: String,

    /// Log the actions that would be taken without touching any file.
    ///
    /// Env: LOGROTOR__DRY_RUN
    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            schedule: default_schedule(),
            dry_run: false,
            logs: Vec::new(),
        }
    }
}

impl Configuration {
    /// Schedule expression that applies to `entry`.
    pub fn schedule_for<'a>(&'a self, entry: &'a LogEntry) -> &'a str {
        entry.schedule.as_deref().unwrap_or(&self.schedule)
    }

    /// Load configuration from a YAML file, layered over the defaults and
    /// overridden by `LOGROTOR__*` environment variables.
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        if !path.is_file() {
            return Err(Box::new(figment::Error::from(format!(
                "configuration file {} does not exist",
                path.display()
            ))));
        }

        let mut config: Configuration = Self::figment(path).extract().map_err(Box::new)?;
        for entry in &mut config.logs {
            entry.apply_defaults();
        }

        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("LOGROTOR__").split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    const SAMPLE: &str = r#"
logs:
  - path: "/path/to/log/*.log"
    type: delete
  - path:
      - "/path/to/log1/*.log"
      - "/path/to/log2/*.log"
    type: rotate
    condition:
      size: "100MB"
schedule: "*/5 * * * *"
"#;

    #[test]
    fn test_load_sample_config() {
        Jail::expect_with(|jail| {
            jail.create_file("logrotor.yaml", SAMPLE)?;

            let config = Configuration::load_from_path(Path::new("logrotor.yaml"))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.logs.len(), 2);
            assert_eq!(config.logs[0].action, ActionType::Delete);
            assert_eq!(config.logs[0].paths.len(), 1);
            assert_eq!(config.logs[1].paths.len(), 2);
            assert_eq!(config.schedule, "*/5 * * * *");
            Ok(())
        });
    }

    #[test]
    fn test_rotate_defaults_applied() {
        Jail::expect_with(|jail| {
            jail.create_file("logrotor.yaml", SAMPLE)?;

            let config = Configuration::load_from_path(Path::new("logrotor.yaml"))
                .map_err(|e| e.to_string())?;

            let condition = config.logs[1].condition.as_ref().expect("condition");
            assert_eq!(condition.size.as_deref(), Some("100MB"));
            assert_eq!(condition.compress, Some(true));
            assert_eq!(condition.compression_format.as_deref(), Some("gzip"));
            assert_eq!(condition.max_keep, None);

            // Delete entries are left alone
            assert!(config.logs[0].condition.is_none());
            Ok(())
        });
    }

    #[test]
    fn test_rotate_without_condition_gets_empty_condition() {
        let mut entry = LogEntry {
            paths: Paths::new(["/var/log/app.log"]),
            action: ActionType::Rotate,
            schedule: None,
            condition: None,
        };
        entry.apply_defaults();

        let condition = entry.condition.expect("condition inserted");
        assert!(condition.age.is_none());
        assert!(condition.size.is_none());
        assert!(condition.compress_enabled());
        assert_eq!(condition.compression_tag(), "gzip");
    }

    #[test]
    fn test_explicit_compression_settings_kept() {
        let mut entry = LogEntry {
            paths: Paths::new(["/var/log/app.log"]),
            action: ActionType::Rotate,
            schedule: None,
            condition: Some(Condition {
                compress: Some(false),
                compression_format: Some("zip".to_string()),
                ..Default::default()
            }),
        };
        entry.apply_defaults();

        let condition = entry.condition.expect("condition");
        assert!(!condition.compress_enabled());
        assert_eq!(condition.compression_tag(), "zip");
    }

    #[test]
    fn test_paths_are_deduplicated_in_order() {
        let paths = Paths::new(["b/*.log", "a/*.log", "b/*.log"]);
        let collected: Vec<&str> = paths.iter().collect();
        assert_eq!(collected, vec!["b/*.log", "a/*.log"]);
    }

    #[test]
    fn test_entry_schedule_overrides_default() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "logrotor.yaml",
                r#"
schedule: "0 * * * *"
logs:
  - path: "/tmp/a/*.log"
    type: delete
    schedule: "*/1 * * * *"
  - path: "/tmp/b/*.log"
    type: delete
"#,
            )?;

            let config = Configuration::load_from_path(Path::new("logrotor.yaml"))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.schedule_for(&config.logs[0]), "*/1 * * * *");
            assert_eq!(config.schedule_for(&config.logs[1]), "0 * * * *");
            Ok(())
        });
    }

    #[test]
    fn test_camel_case_condition_keys() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "logrotor.yaml",
                r#"
logs:
  - path: "/tmp/app.log"
    type: rotate
    condition:
      size: "1MB"
      maxKeep: 3
      compressionFormat: zip
"#,
            )?;

            let config = Configuration::load_from_path(Path::new("logrotor.yaml"))
                .map_err(|e| e.to_string())?;

            let condition = config.logs[0].condition.as_ref().expect("condition");
            assert_eq!(condition.max_keep, Some(3));
            assert_eq!(condition.compression_tag(), "zip");
            Ok(())
        });
    }

    #[test]
    fn test_env_var_override() {
        Jail::expect_with(|jail| {
            jail.create_file("logrotor.yaml", SAMPLE)?;
            jail.set_env("LOGROTOR__SCHEDULE", "0 0 * * *");
            jail.set_env("LOGROTOR__DRY_RUN", "true");

            let config = Configuration::load_from_path(Path::new("logrotor.yaml"))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.schedule, "0 0 * * *");
            assert!(config.dry_run);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_is_an_error() {
        Jail::expect_with(|_jail| {
            assert!(Configuration::load_from_path(Path::new("absent.yaml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_defaults_without_file_contents() {
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            .extract::<Configuration>()
            .unwrap();

        assert_eq!(config.schedule, DEFAULT_SCHEDULE);
        assert!(!config.dry_run);
        assert!(config.logs.is_empty());
    }
}
