//! Code for reading subsidy rules.
use super::input_err_msg;
use crate::building::BuildingInfo;
use crate::component::ComponentType;
use crate::subsidy::{Bracket, DependentVar, SubsidyLevel, SubsidyRule, SubsidyType};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::warn;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

const SUBSIDIES_FILE_NAME: &str = "subsidies.csv";

/// Value of the `user` and `building_type` columns matching every building
const MATCH_ALL: &str = "all";

/// One bracket of a subsidy rule, as given in the subsidies file
#[derive(PartialEq, Debug, Deserialize)]
struct SubsidyRaw {
    level: SubsidyLevel,
    #[serde(rename = "type")]
    sub_type: SubsidyType,
    user: String,
    building_type: String,
    component: String,
    dependent_var: DependentVar,
    lower: f64,
    upper: Option<f64>,
    coefficient: f64,
    constant: Option<f64>,
}

impl SubsidyRaw {
    /// Whether the row applies to the given building
    fn applies_to(&self, building: &BuildingInfo) -> bool {
        let matches = |value: &str, target: &str| {
            value.eq_ignore_ascii_case(MATCH_ALL) || value.eq_ignore_ascii_case(target)
        };

        matches(&self.user, &building.user)
            && matches(&self.building_type, &building.building_type)
    }

    fn bracket(&self) -> Bracket {
        Bracket {
            lower: self.lower,
            upper: self.upper.unwrap_or(f64::INFINITY),
            coefficient: self.coefficient,
            constant: self.constant.unwrap_or(0.0),
        }
    }
}

/// Read the subsidy rules applying to a building.
///
/// Each row is one bracket; rows sharing level, type, component and dependent variable form one
/// rule. Malformed rows are skipped with a warning, and a missing file means no subsidies.
pub fn read_subsidies(model_dir: &Path, building: &BuildingInfo) -> Result<Vec<SubsidyRule>> {
    let file_path = model_dir.join(SUBSIDIES_FILE_NAME);
    if !file_path.exists() {
        return Ok(Vec::new());
    }

    let rows = read_subsidy_rows(&file_path).with_context(|| input_err_msg(&file_path))?;
    Ok(read_subsidies_from_iter(rows.into_iter(), building))
}

/// Read the rows of the subsidies file, skipping those which cannot be parsed
fn read_subsidy_rows(file_path: &Path) -> Result<Vec<SubsidyRaw>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)?;

    let mut rows = Vec::new();
    for (i, result) in reader.deserialize().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(err) => warn!("Ignoring malformed subsidy row {}: {err}", i + 1),
        }
    }

    Ok(rows)
}

fn read_subsidies_from_iter<I>(iter: I, building: &BuildingInfo) -> Vec<SubsidyRule>
where
    I: Iterator<Item = SubsidyRaw>,
{
    let mut groups: IndexMap<_, Vec<Bracket>> = IndexMap::new();
    for row in iter.filter(|row| row.applies_to(building)) {
        let Ok(component) = ComponentType::from_str(&row.component) else {
            warn!(
                "Ignoring subsidy row for unknown component type {}",
                row.component
            );
            continue;
        };

        groups
            .entry((row.level, row.sub_type, component, row.dependent_var))
            .or_default()
            .push(row.bracket());
    }

    groups
        .into_iter()
        .map(|((level, sub_type, component, dependent_var), brackets)| {
            SubsidyRule::new(level, sub_type, component, dependent_var, brackets)
        })
        .collect()
}
