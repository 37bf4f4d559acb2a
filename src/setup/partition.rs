//! Fake fileserver partitions.
//!
//! A fileserver attaches `/vicep<id>` directories as partitions. A plain
//! directory only counts when it carries an `AlwaysAttach` marker.

use anyhow::{Result, bail};
use std::path::PathBuf;

use crate::common::Executor;
use crate::common::command::quote;

pub const ALWAYS_ATTACH: &str = "AlwaysAttach";

/// Partition ids run `a`..`z`, then `aa`..`iv`.
pub fn valid_partition_id(id: &str) -> bool {
    match id.as_bytes() {
        &[c] => c.is_ascii_lowercase(),
        &[first, second] => {
            (b'a'..=b'i').contains(&first)
                && second.is_ascii_lowercase()
                && (first != b'i' || second <= b'v')
        }
        _ => false,
    }
}

pub fn partition_path(id: &str) -> PathBuf {
    PathBuf::from(format!("/vicep{}", id))
}

/// Create `/vicep<id>` with its attach marker.
pub fn create_fake_partition(exec: &dyn Executor, id: &str) -> Result<PathBuf> {
    if !valid_partition_id(id) {
        bail!("Invalid partition id '{}'; expected a..z or aa..iv", id);
    }
    let path = partition_path(id);
    let marker = path.join(ALWAYS_ATTACH);
    exec.sudo(&format!("mkdir -p {}", quote(&path.to_string_lossy())))?;
    exec.sudo(&format!("touch {}", quote(&marker.to_string_lossy())))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::command::testing::RecordingExecutor;

    #[test]
    fn test_partition_ids() {
        for id in ["a", "z", "aa", "az", "ha", "ia", "iv"] {
            assert!(valid_partition_id(id), "{}", id);
        }
        for id in ["", "A", "iw", "iz", "ja", "zz", "aaa", "1", "a1"] {
            assert!(!valid_partition_id(id), "{}", id);
        }
    }

    #[test]
    fn test_create_partition_commands() {
        let exec = RecordingExecutor::new();
        let path = create_fake_partition(&exec, "b").unwrap();
        assert_eq!(path, PathBuf::from("/vicepb"));
        assert_eq!(
            exec.calls(),
            vec!["sudo -n mkdir -p /vicepb", "sudo -n touch /vicepb/AlwaysAttach"]
        );
    }

    #[test]
    fn test_invalid_id_runs_nothing() {
        let exec = RecordingExecutor::new();
        assert!(create_fake_partition(&exec, "zz").is_err());
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn test_mkdir_failure_stops() {
        let exec = RecordingExecutor::new().fail("sudo -n mkdir -p /vicepa", 1);
        let err = create_fake_partition(&exec, "a").unwrap_err();
        assert_eq!(err.to_string(), "command failed (rc=1)");
        assert_eq!(exec.calls().len(), 1);
    }
}
