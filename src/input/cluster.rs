//! Code for reading representative periods.
use super::{ClusteringOptions, input_err_msg, read_csv_optional};
use crate::cluster::{RepresentativePeriod, TimeCluster};
use anyhow::{Context, Result};
use log::warn;
use std::path::Path;

const CLUSTERS_FILE_NAME: &str = "clusters.csv";

/// Read the representative periods, if the model uses any.
///
/// Periods are only used when `model.toml` has a `[clustering]` section and the clusters file
/// has at least one row.
pub fn read_time_cluster(
    model_dir: &Path,
    options: Option<&ClusteringOptions>,
) -> Result<Option<TimeCluster>> {
    let file_path = model_dir.join(CLUSTERS_FILE_NAME);
    let periods: Vec<RepresentativePeriod> = read_csv_optional(&file_path)?.collect();

    match (options, periods.is_empty()) {
        (Some(options), false) => TimeCluster::new(options.period_length, periods)
            .map(Some)
            .with_context(|| input_err_msg(&file_path)),
        (Some(_), true) => {
            warn!(
                "Clustering is enabled but {} has no periods; using the full time axis",
                file_path.display()
            );
            Ok(None)
        }
        (None, false) => {
            warn!(
                "Ignoring {} because clustering is not enabled in the model file",
                file_path.display()
            );
            Ok(None)
        }
        (None, true) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_clusters_file(dir_path: &Path) {
        let file_path = dir_path.join(CLUSTERS_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(file, "start_hour,occurrences\n0,200\n48,165").unwrap();
    }

    #[test]
    fn test_read_time_cluster() {
        let dir = tempdir().unwrap();
        create_clusters_file(dir.path());
        let options = ClusteringOptions { period_length: 24 };

        let cluster = read_time_cluster(dir.path(), Some(&options))
            .unwrap()
            .unwrap();
        assert_eq!(cluster.period_length(), 24);
        assert_eq!(cluster.periods().len(), 2);
        assert_eq!(cluster.periods()[1].start_hour, 48);
        assert_eq!(cluster.hours().len(), 48);

        assert!(read_time_cluster(dir.path(), None).unwrap().is_none());
    }

    #[test]
    fn test_read_time_cluster_no_file() {
        let dir = tempdir().unwrap();
        let options = ClusteringOptions { period_length: 24 };
        assert!(
            read_time_cluster(dir.path(), Some(&options))
                .unwrap()
                .is_none()
        );
    }
}
