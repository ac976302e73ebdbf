//! Snapshot identifier codec.
//!
//! The host framework only ever stores the composite identifier
//! `<volumeID>-velero-bkp-<backupName>`, so every restore and delete must be
//! able to recover the volume and backup name from that string alone.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Reserved separator joining the volume identifier and the backup name.
pub const SEPARATOR: &str = "-velero-bkp-";

/// Errors raised while encoding or decoding a snapshot identifier.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum IdentifierError {
    /// Raised when a component is empty.
    #[error("{component} must not be empty")]
    EmptyComponent {
        /// Name of the empty component.
        component: &'static str,
    },
    /// Raised when a component already contains the reserved separator.
    #[error("{component} '{value}' contains the reserved separator '{SEPARATOR}'")]
    ContainsSeparator {
        /// Name of the offending component.
        component: &'static str,
        /// Value supplied by the caller.
        value: String,
    },
    /// Raised when an identifier cannot be split into its two components.
    #[error("malformed snapshot identifier '{id}'")]
    Malformed {
        /// Identifier supplied by the caller.
        id: String,
    },
}

/// Decoded snapshot identifier.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SnapshotId {
    volume_id: String,
    backup_name: String,
}

impl SnapshotId {
    /// Builds an identifier from its components.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when either component is empty or contains
    /// [`SEPARATOR`].
    pub fn new(
        volume_id: impl Into<String>,
        backup_name: impl Into<String>,
    ) -> Result<Self, IdentifierError> {
        let id = Self {
            volume_id: volume_id.into(),
            backup_name: backup_name.into(),
        };
        check_component("volume id", &id.volume_id)?;
        check_component("backup name", &id.backup_name)?;
        Ok(id)
    }

    /// Volume the snapshot was taken from.
    #[must_use]
    pub fn volume_id(&self) -> &str {
        &self.volume_id
    }

    /// Backup request name.
    #[must_use]
    pub fn backup_name(&self) -> &str {
        &self.backup_name
    }

    /// Splits the identifier back into `(volume_id, backup_name)`.
    #[must_use]
    pub fn into_parts(self) -> (String, String) {
        (self.volume_id, self.backup_name)
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.volume_id, self.backup_name)
    }
}

impl FromStr for SnapshotId {
    type Err = IdentifierError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || IdentifierError::Malformed {
            id: value.to_owned(),
        };
        let (volume_id, backup_name) = value.split_once(SEPARATOR).ok_or_else(malformed)?;
        if volume_id.is_empty() || backup_name.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            volume_id: volume_id.to_owned(),
            backup_name: backup_name.to_owned(),
        })
    }
}

/// Encodes `volume_id` and `backup_name` into a snapshot identifier.
///
/// # Errors
///
/// Returns [`IdentifierError`] when either input is empty or contains the
/// separator, since the result could not be decoded unambiguously.
pub fn encode(volume_id: &str, backup_name: &str) -> Result<String, IdentifierError> {
    SnapshotId::new(volume_id, backup_name).map(|id| id.to_string())
}

/// Decodes a snapshot identifier into `(volume_id, backup_name)`.
///
/// The identifier is split on the first separator occurrence.
///
/// # Errors
///
/// Returns [`IdentifierError::Malformed`] when the separator is missing or a
/// component would be empty.
pub fn decode(id: &str) -> Result<(String, String), IdentifierError> {
    id.parse::<SnapshotId>().map(SnapshotId::into_parts)
}

fn check_component(component: &'static str, value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::EmptyComponent { component });
    }
    if value.contains(SEPARATOR) {
        return Err(IdentifierError::ContainsSeparator {
            component,
            value: value.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("pvc-1", "full-01")]
    #[case("pvc-0a1b", "daily")]
    #[case("vol", "a-b-c")]
    #[case("pvc-velero", "bkp-velero")]
    fn decode_reverses_encode(#[case] volume_id: &str, #[case] backup_name: &str) {
        let id = encode(volume_id, backup_name).expect("encode");
        let (decoded_volume, decoded_backup) = decode(&id).expect("decode");
        assert_eq!(decoded_volume, volume_id);
        assert_eq!(decoded_backup, backup_name);
    }

    #[test]
    fn encode_uses_reserved_separator() {
        let id = encode("pvc-1", "full-01").expect("encode");
        assert_eq!(id, "pvc-1-velero-bkp-full-01");
    }

    #[rstest]
    #[case("pvc-velero-bkp-x", "full", "volume id")]
    #[case("pvc-1", "a-velero-bkp-b", "backup name")]
    fn encode_rejects_separator_in_components(
        #[case] volume_id: &str,
        #[case] backup_name: &str,
        #[case] expected: &str,
    ) {
        let err = encode(volume_id, backup_name).expect_err("ambiguous input");
        assert!(
            matches!(err, IdentifierError::ContainsSeparator { component, .. } if component == expected),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn encode_rejects_empty_components() {
        assert_eq!(
            encode("", "b"),
            Err(IdentifierError::EmptyComponent {
                component: "volume id"
            })
        );
        assert_eq!(
            encode("v", ""),
            Err(IdentifierError::EmptyComponent {
                component: "backup name"
            })
        );
    }

    #[rstest]
    #[case("pvc-1")]
    #[case("-velero-bkp-full")]
    #[case("pvc-1-velero-bkp-")]
    #[case("")]
    fn decode_rejects_malformed_identifiers(#[case] id: &str) {
        let err = decode(id).expect_err("malformed");
        assert!(matches!(err, IdentifierError::Malformed { .. }));
    }

    #[test]
    fn decode_splits_on_first_separator() {
        let (volume_id, backup_name) = decode("a-velero-bkp-b-velero-bkp-c").expect("decode");
        assert_eq!(volume_id, "a");
        assert_eq!(backup_name, "b-velero-bkp-c");
    }
}
