//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::naming::RemoteNamer;
use crate::orchestrator::OrchestratorSettings;

/// Port the volume-management service listens on inside the cluster.
pub const CONTROL_PLANE_PORT: u16 = 5656;

/// Service name of the volume-management service.
pub const CONTROL_PLANE_SERVICE: &str = "maya-apiserver-service";

/// Engine settings merged from defaults, configuration files, and
/// environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "CSTOR_BACKUP",
    discovery(
        app_name = "cstor-backup",
        env_var = "CSTOR_BACKUP_CONFIG_PATH",
        config_file_name = "cstor-backup.toml",
        dotfile_name = ".cstor-backup.toml",
        project_file_name = "cstor-backup.toml"
    )
)]
pub struct PluginConfig {
    /// Namespace the storage management services run in.
    #[ortho_config(default = "openebs".to_owned())]
    pub namespace: String,
    /// Base URL of the volume-management service. Derived from `namespace`
    /// when unset.
    pub control_plane_url: Option<String>,
    /// Address (`host:port`) the data mover listens on for the control plane.
    pub server_addr: String,
    /// Timeout applied to each control-plane request.
    #[ortho_config(default = 60)]
    pub request_timeout_secs: u64,
    /// Interval between job status queries.
    #[ortho_config(default = 5)]
    pub poll_interval_secs: u64,
    /// Upper bound on a whole transfer and its confirmation.
    #[ortho_config(default = 3600)]
    pub operation_timeout_secs: u64,
    /// Time allowed for the job to reach a terminal status once the transfer
    /// has finished.
    #[ortho_config(default = 30)]
    pub confirm_grace_secs: u64,
    /// Data mover executable.
    #[ortho_config(default = "cstor-transfer".to_owned())]
    pub transfer_bin: String,
    /// Static path prefix placed in front of every remote object.
    pub object_prefix: Option<String>,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn hint(&self) -> String {
        format!(
            "set {} or add {} to cstor-backup.toml",
            self.env_var, self.toml_key
        )
    }
}

impl PluginConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: {}",
                metadata.description,
                metadata.hint()
            )));
        }
        Ok(())
    }

    fn require_optional(value: Option<&str>, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        match value {
            Some(text) if text.trim().is_empty() => Err(ConfigError::InvalidValue(format!(
                "{} must not be blank when present: {}",
                metadata.description,
                metadata.hint()
            ))),
            _ => Ok(()),
        }
    }

    fn require_positive(value: u64, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value == 0 {
            return Err(ConfigError::InvalidValue(format!(
                "{} must be greater than zero: {}",
                metadata.description,
                metadata.hint()
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("cstor-backup")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages name the environment
    /// variable and TOML key that supply each value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::InvalidValue`] for blank optional values or zero
    /// durations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.namespace,
            &FieldMetadata::new(
                "management namespace",
                "CSTOR_BACKUP_NAMESPACE",
                "namespace",
            ),
        )?;
        Self::require_field(
            &self.server_addr,
            &FieldMetadata::new(
                "data mover address",
                "CSTOR_BACKUP_SERVER_ADDR",
                "server_addr",
            ),
        )?;
        Self::require_field(
            &self.transfer_bin,
            &FieldMetadata::new(
                "data mover executable",
                "CSTOR_BACKUP_TRANSFER_BIN",
                "transfer_bin",
            ),
        )?;
        Self::require_optional(
            self.control_plane_url.as_deref(),
            &FieldMetadata::new(
                "control plane URL",
                "CSTOR_BACKUP_CONTROL_PLANE_URL",
                "control_plane_url",
            ),
        )?;
        Self::require_optional(
            self.object_prefix.as_deref(),
            &FieldMetadata::new(
                "object prefix",
                "CSTOR_BACKUP_OBJECT_PREFIX",
                "object_prefix",
            ),
        )?;
        for (value, metadata) in [
            (
                self.request_timeout_secs,
                FieldMetadata::new(
                    "request timeout",
                    "CSTOR_BACKUP_REQUEST_TIMEOUT_SECS",
                    "request_timeout_secs",
                ),
            ),
            (
                self.poll_interval_secs,
                FieldMetadata::new(
                    "poll interval",
                    "CSTOR_BACKUP_POLL_INTERVAL_SECS",
                    "poll_interval_secs",
                ),
            ),
            (
                self.operation_timeout_secs,
                FieldMetadata::new(
                    "operation timeout",
                    "CSTOR_BACKUP_OPERATION_TIMEOUT_SECS",
                    "operation_timeout_secs",
                ),
            ),
        ] {
            Self::require_positive(value, &metadata)?;
        }
        Ok(())
    }

    /// Returns the configured control-plane URL, or the in-cluster service
    /// address for the management namespace.
    #[must_use]
    pub fn control_plane_url(&self) -> String {
        self.control_plane_url.as_ref().map_or_else(
            || {
                format!(
                    "http://{CONTROL_PLANE_SERVICE}.{}.svc.cluster.local:{CONTROL_PLANE_PORT}",
                    self.namespace.trim()
                )
            },
            |url| url.trim().to_owned(),
        )
    }

    /// Timeout applied to each control-plane request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Builds orchestrator settings from the validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn settings(&self) -> Result<OrchestratorSettings, ConfigError> {
        self.validate()?;
        Ok(OrchestratorSettings {
            server_addr: self.server_addr.trim().to_owned(),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            operation_timeout: Duration::from_secs(self.operation_timeout_secs),
            confirm_grace: Duration::from_secs(self.confirm_grace_secs),
            namer: RemoteNamer::new(self.object_prefix.clone()),
        })
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configuration value is present but unusable.
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn valid_config() -> PluginConfig {
        PluginConfig {
            namespace: String::from("openebs"),
            control_plane_url: None,
            server_addr: String::from("10.0.0.5:9000"),
            request_timeout_secs: 60,
            poll_interval_secs: 5,
            operation_timeout_secs: 3600,
            confirm_grace_secs: 30,
            transfer_bin: String::from("cstor-transfer"),
            object_prefix: None,
        }
    }

    #[rstest]
    fn missing_server_addr_names_env_var_and_key(valid_config: PluginConfig) {
        let cfg = PluginConfig {
            server_addr: String::from("  "),
            ..valid_config
        };

        let error = cfg.validate().expect_err("server_addr is required");
        let ConfigError::MissingField(ref message) = error else {
            panic!("expected MissingField error, got {error}");
        };
        assert!(message.contains("CSTOR_BACKUP_SERVER_ADDR"), "{message}");
        assert!(message.contains("server_addr"), "{message}");
        assert!(message.contains("cstor-backup.toml"), "{message}");
    }

    #[rstest]
    #[case::request_timeout(|cfg: &mut PluginConfig| cfg.request_timeout_secs = 0, "CSTOR_BACKUP_REQUEST_TIMEOUT_SECS")]
    #[case::poll_interval(|cfg: &mut PluginConfig| cfg.poll_interval_secs = 0, "CSTOR_BACKUP_POLL_INTERVAL_SECS")]
    #[case::operation_timeout(|cfg: &mut PluginConfig| cfg.operation_timeout_secs = 0, "CSTOR_BACKUP_OPERATION_TIMEOUT_SECS")]
    #[case::blank_url(|cfg: &mut PluginConfig| cfg.control_plane_url = Some(String::new()), "CSTOR_BACKUP_CONTROL_PLANE_URL")]
    #[case::blank_prefix(|cfg: &mut PluginConfig| cfg.object_prefix = Some(String::from(" ")), "CSTOR_BACKUP_OBJECT_PREFIX")]
    fn unusable_values_are_rejected(
        mut valid_config: PluginConfig,
        #[case] mutate: fn(&mut PluginConfig),
        #[case] env_var: &str,
    ) {
        mutate(&mut valid_config);

        let error = valid_config.validate().expect_err("value should be rejected");

        assert!(matches!(error, ConfigError::InvalidValue(_)), "{error}");
        assert!(error.to_string().contains(env_var), "{error}");
    }

    #[rstest]
    fn zero_grace_is_allowed(valid_config: PluginConfig) {
        let cfg = PluginConfig {
            confirm_grace_secs: 0,
            ..valid_config
        };
        assert!(cfg.validate().is_ok());
    }

    #[rstest]
    fn control_plane_url_is_derived_from_namespace(valid_config: PluginConfig) {
        let cfg = PluginConfig {
            namespace: String::from("storage"),
            ..valid_config
        };
        assert_eq!(
            cfg.control_plane_url(),
            "http://maya-apiserver-service.storage.svc.cluster.local:5656"
        );
    }

    #[rstest]
    fn explicit_control_plane_url_wins(valid_config: PluginConfig) {
        let cfg = PluginConfig {
            control_plane_url: Some(String::from("http://maya.local:5656 ")),
            ..valid_config
        };
        assert_eq!(cfg.control_plane_url(), "http://maya.local:5656");
    }

    #[rstest]
    fn settings_carry_durations_and_prefix(valid_config: PluginConfig) {
        let cfg = PluginConfig {
            object_prefix: Some(String::from("cluster-a")),
            ..valid_config
        };

        let settings = cfg.settings().expect("valid settings");

        assert_eq!(settings.server_addr, "10.0.0.5:9000");
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.operation_timeout, Duration::from_secs(3600));
        assert_eq!(settings.confirm_grace, Duration::from_secs(30));
        assert_eq!(
            settings.namer.object_name("pvc-1", "full-01"),
            "cluster-a/backups/full-01/cstor-pvc-1"
        );
    }
}
