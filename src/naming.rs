//! Remote object naming and backup series derivation.

/// Prefix prepended to the volume identifier in every object name.
pub const OBJECT_PREFIX: &str = "cstor";

const BACKUP_DIR: &str = "backups";

/// Returns the object name holding the data for `backup_name` of `volume_id`.
///
/// Upload, download, and delete all call this function so that they agree on
/// the same object after a process restart.
#[must_use]
pub fn remote_name(volume_id: &str, backup_name: &str) -> String {
    format!("{backup_name}/{OBJECT_PREFIX}-{volume_id}")
}

/// Derives the backup series identifier sent to the control plane.
///
/// Every hyphen-delimited segment except the last one forms the base name, so
/// `daily-01` and `daily-02` belong to the `daily` series and the control
/// plane can compute the second as a delta of the first.
#[must_use]
pub fn backup_base_name(backup_name: &str) -> &str {
    backup_name
        .rsplit_once('-')
        .map_or(backup_name, |(base, _)| base)
}

/// Object namer carrying the static path prefix from configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RemoteNamer {
    path_prefix: Option<String>,
}

impl RemoteNamer {
    /// Creates a namer. Blank prefixes and surrounding slashes are ignored.
    #[must_use]
    pub fn new(prefix: Option<String>) -> Self {
        let path_prefix = prefix
            .map(|value| value.trim().trim_matches('/').to_owned())
            .filter(|value| !value.is_empty());
        Self { path_prefix }
    }

    /// Computes the object name for `(volume_id, backup_name)`.
    #[must_use]
    pub fn object_name(&self, volume_id: &str, backup_name: &str) -> String {
        let name = remote_name(volume_id, backup_name);
        match self.path_prefix.as_deref() {
            Some(prefix) => format!("{prefix}/{BACKUP_DIR}/{name}"),
            None => name,
        }
    }
}
