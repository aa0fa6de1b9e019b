use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use circuit::Circuit;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::ConfigError;
use crate::proof::{ProofSystem, SnarkjsConfig, SnarkjsToolchain, TransparentProofSystem};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Every identity the gatekeeper holds, fixed for the session.
    pub identities: Vec<String>,
    pub threshold: usize,
    /// Identities whose shares are reencrypted on an accepted proof.
    pub release_set: Vec<String>,
    /// JSON circuit file, or a Bristol file for any other extension.
    pub circuit_file: PathBuf,
    /// Policy circuit that gates release.
    pub circuit_id: String,
    pub oblivious_transfer: bool,
    pub network: NetworkProperties,
    pub proof: ProofProperties,
    pub logging: LoggingProperties,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkProperties {
    /// Where the issuer listens for the gatekeeper and the requester.
    pub issuer_addr: String,
    /// Where the gatekeeper listens for the requester.
    pub gatekeeper_addr: String,
    /// Bound on every blocking read, including the wait for shares.
    pub read_timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ProofProperties {
    Transparent,
    Snarkjs(SnarkjsConfig),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingProperties {
    /// Log verbosity level of the default filter.
    pub level: String,
    /// Custom filtering logic, see
    /// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#directives
    /// Overrides `level` when set.
    pub filter: Option<String>,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            identities: vec!["Alice".into(), "Boris".into(), "Chris".into()],
            threshold: 2,
            release_set: vec!["Alice".into(), "Boris".into()],
            circuit_file: PathBuf::from("circuit/circuit_files/default.json"),
            circuit_id: "Smart".to_string(),
            oblivious_transfer: true,
            network: NetworkProperties::default(),
            proof: ProofProperties::default(),
            logging: LoggingProperties::default(),
        }
    }
}

impl Default for NetworkProperties {
    fn default() -> Self {
        Self {
            issuer_addr: "127.0.0.1:7070".to_string(),
            gatekeeper_addr: "127.0.0.1:7071".to_string(),
            read_timeout_secs: Some(60),
        }
    }
}

impl NetworkProperties {
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ProofProperties {
    fn default() -> Self {
        ProofProperties::Transparent
    }
}

impl Default for LoggingProperties {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            filter: None,
            format: LogFormat::Compact,
        }
    }
}

/// Parse a yaml configuration file into a struct
pub fn parse_config_file<T: DeserializeOwned, P: AsRef<Path>>(location: P) -> Result<T, ConfigError> {
    let file = std::fs::File::open(location)?;
    Ok(serde_yaml::from_reader(file)?)
}

/// Prepend a file path with a base directory if the path is not absolute.
pub fn prepend_file_path(file_path: &Path, base_dir: &Path) -> PathBuf {
    if file_path.is_absolute() {
        file_path.to_path_buf()
    } else {
        base_dir.join(file_path)
    }
}

/// Parse `"1,0"` style attribute lists.
pub fn parse_attributes(text: &str) -> Result<Vec<bool>, ConfigError> {
    text.split(',')
        .map(|bit| match bit.trim() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            _ => Err(ConfigError::InvalidAttributes(text.to_string())),
        })
        .collect()
}

impl ProtocolConfig {
    /// Read `path` if given, otherwise use the defaults. Relative paths in
    /// the file are resolved against the file's directory.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let mut config: ProtocolConfig = parse_config_file(path)?;
                let parent = path.parent().unwrap_or_else(|| Path::new("."));
                config.circuit_file = prepend_file_path(&config.circuit_file, parent);
                if let ProofProperties::Snarkjs(snarkjs) = &mut config.proof {
                    snarkjs.work_dir = prepend_file_path(&snarkjs.work_dir, parent);
                }
                config
            }
            None => ProtocolConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold == 0 {
            return Err(ConfigError::InvalidThreshold);
        }
        let mut names = BTreeSet::new();
        for name in self.identities.iter() {
            if !names.insert(name) {
                return Err(ConfigError::DuplicateIdentity(name.clone()));
            }
        }
        if names.len() < self.threshold {
            return Err(ConfigError::TooFewIdentities {
                threshold: self.threshold,
                supplied: names.len(),
            });
        }
        let mut release = BTreeSet::new();
        for name in self.release_set.iter() {
            if !names.contains(name) {
                return Err(ConfigError::UnknownReleaseIdentity(name.clone()));
            }
            if !release.insert(name) {
                return Err(ConfigError::DuplicateIdentity(name.clone()));
            }
        }
        if release.len() < self.threshold {
            return Err(ConfigError::ReleaseSetTooSmall {
                threshold: self.threshold,
                size: release.len(),
            });
        }
        Ok(())
    }

    pub fn load_circuits(&self) -> Result<Vec<Circuit>, ConfigError> {
        Ok(Circuit::load_any(&self.circuit_file)?)
    }

    /// The circuit named by `circuit_id`.
    pub fn policy_circuit(&self) -> Result<Circuit, ConfigError> {
        self.load_circuits()?
            .into_iter()
            .find(|c| c.id == self.circuit_id)
            .ok_or_else(|| ConfigError::UnknownCircuit(self.circuit_id.clone()))
    }

    pub fn build_proof_system(&self) -> Result<Box<dyn ProofSystem + Send>, ConfigError> {
        Ok(match &self.proof {
            ProofProperties::Transparent => {
                Box::new(TransparentProofSystem::new(self.policy_circuit()?)?)
            }
            ProofProperties::Snarkjs(config) => Box::new(SnarkjsToolchain::new(config.clone())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ProtocolConfig::default();
        config.validate().unwrap();
        assert_eq!(config.release_set.len(), config.threshold);
    }

    #[test]
    fn validation_catches_bad_sets() {
        let mut config = ProtocolConfig::default();
        config.threshold = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidThreshold)));

        let mut config = ProtocolConfig::default();
        config.release_set = vec!["Alice".into(), "Zed".into()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownReleaseIdentity(name)) if name == "Zed"
        ));

        let mut config = ProtocolConfig::default();
        config.release_set = vec!["Alice".into()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ReleaseSetTooSmall { threshold: 2, size: 1 })
        ));

        let mut config = ProtocolConfig::default();
        config.identities.push("Alice".into());
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateIdentity(_))));

        let mut config = ProtocolConfig::default();
        config.threshold = 4;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooFewIdentities { threshold: 4, supplied: 3 })
        ));
    }

    #[test]
    fn yaml_fills_in_defaults() {
        let config: ProtocolConfig = serde_yaml::from_str(
            "threshold: 3\nrelease_set: [Alice, Boris, Chris]\nproof:\n  backend: snarkjs\n  work_dir: zk\nlogging:\n  format: json\n",
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.identities.len(), 3);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        match config.proof {
            ProofProperties::Snarkjs(s) => {
                assert_eq!(s.work_dir, PathBuf::from("zk"));
                assert_eq!(s.binary, "snarkjs");
            }
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_file() {
        let location = "../config/config.yaml";
        let config: Result<ProtocolConfig, ConfigError> = parse_config_file(location);
        assert!(config.is_ok(), "Could not open file or read the file's values.");

        let loaded = ProtocolConfig::load(Some(Path::new(location))).unwrap();
        assert_eq!(
            loaded.circuit_file,
            Path::new("../config").join("../circuit/circuit_files/default.json")
        );
        assert_eq!(loaded.policy_circuit().unwrap().id, "Smart");
        assert!(loaded.build_proof_system().is_ok());
    }

    #[test]
    fn test_prepend_file_path() {
        let base_dir = Path::new("/base/dir");
        assert_eq!(
            prepend_file_path(Path::new("relative/path"), base_dir),
            PathBuf::from("/base/dir/relative/path")
        );
        assert_eq!(
            prepend_file_path(Path::new("/absolute/path"), base_dir),
            PathBuf::from("/absolute/path")
        );
    }

    #[test]
    fn attributes_parse() {
        assert_eq!(parse_attributes("1,0").unwrap(), vec![true, false]);
        assert_eq!(parse_attributes(" 0 , true").unwrap(), vec![false, true]);
        assert!(parse_attributes("1,2").is_err());
    }

    #[test]
    fn unknown_policy_circuit() {
        let mut config = ProtocolConfig::default();
        config.circuit_file = PathBuf::from("../circuit/circuit_files/default.json");
        config.circuit_id = "Nope".into();
        assert!(matches!(
            config.policy_circuit(),
            Err(ConfigError::UnknownCircuit(_))
        ));
    }
}
