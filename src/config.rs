use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::Context;
use chrono::{DateTime, Utc};

/// Settings of the headless simulation driver.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Save file the buildings are loaded from
    pub save_file: PathBuf,
    /// Number of simulated minutes to run
    pub minutes: u64,
    /// Simulated wall clock time of the first minute
    pub start_time: DateTime<Utc>,
    /// Where to write the final state, if anywhere
    pub output_file: Option<PathBuf>,
    pub start_paused: bool,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let string = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Could not read config {}", path.as_ref().display()))?;
        Self::from_json(&string)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let loaded: as_loaded::Config = json5::from_str(json)?;
        let converted = loaded.try_into()?;
        Ok(converted)
    }
}

impl TryFrom<as_loaded::Config> for Config {
    type Error = anyhow::Error;
    fn try_from(value: as_loaded::Config) -> Result<Self, Self::Error> {
        let start_time = match value.start_time {
            Some(start_time) => DateTime::parse_from_rfc3339(&start_time)
                .with_context(|| format!("Invalid start_time {:?}", start_time))?
                .with_timezone(&Utc),
            None => DateTime::<Utc>::from(UNIX_EPOCH),
        };
        if value.save_file.as_os_str().is_empty() {
            anyhow::bail!("save_file must not be empty");
        }
        Ok(Config {
            save_file: value.save_file,
            minutes: value.minutes,
            start_time,
            output_file: value.output_file,
            start_paused: value.start_paused,
        })
    }
}

mod as_loaded {
    use std::path::PathBuf;

    use serde::Deserialize;

    #[derive(Clone, Debug, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    pub struct Config {
        pub save_file: PathBuf,
        #[serde(default)]
        pub minutes: u64,
        #[serde(default)]
        pub start_time: Option<String>,
        #[serde(default)]
        pub output_file: Option<PathBuf>,
        #[serde(default)]
        pub start_paused: bool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn full_config() {
        let config = Config::from_json(
            r#"{
                // Morning shift
                save_file: "saves/campus.txt",
                minutes: 90,
                start_time: "2024-03-04T10:00:00+01:00",
                output_file: "saves/after.txt",
                start_paused: true,
            }"#,
        )
        .unwrap();
        assert_eq!(
            config,
            Config {
                save_file: PathBuf::from("saves/campus.txt"),
                minutes: 90,
                start_time: Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
                output_file: Some(PathBuf::from("saves/after.txt")),
                start_paused: true,
            }
        );
    }

    #[test]
    fn minimal_config() {
        let config = Config::from_json(r#"{ save_file: "campus.txt" }"#).unwrap();
        assert_eq!(config.minutes, 0);
        assert_eq!(config.start_time.timestamp(), 0);
        assert_eq!(config.output_file, None);
        assert!(!config.start_paused);
    }

    #[test]
    fn invalid_start_time() {
        Config::from_json(r#"{ save_file: "campus.txt", start_time: "tomorrow" }"#)
            .expect_err("Start time is not RFC 3339");
    }

    #[test]
    fn missing_save_file() {
        Config::from_json("{ minutes: 5 }").expect_err("save_file is required");
        Config::from_json(r#"{ save_file: "" }"#).expect_err("save_file must not be empty");
    }

    #[test]
    fn unknown_field() {
        Config::from_json(r#"{ save_file: "campus.txt", minuets: 5 }"#)
            .expect_err("Misspelled fields are rejected");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ save_file: \"campus.txt\", minutes: 3 }}").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.minutes, 3);

        Config::load(file.path().with_extension("missing")).expect_err("No such file");
    }
}
