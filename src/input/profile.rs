//! Code for reading demand and weather profiles.
use super::{input_err_msg, read_csv};
use crate::profile::Profiles;
use anyhow::{Context, Result};
use std::path::Path;

const PROFILES_FILE_NAME: &str = "profiles.csv";

/// Read the hourly profiles of a building.
///
/// Missing columns are taken to be zero throughout.
pub fn read_profiles(model_dir: &Path) -> Result<Profiles> {
    let file_path = model_dir.join(PROFILES_FILE_NAME);
    let rows = read_csv(&file_path)?.collect();
    Profiles::new(rows).with_context(|| input_err_msg(&file_path))
}
