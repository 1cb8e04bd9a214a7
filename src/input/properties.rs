//! Code for reading the properties of component models.
use super::{input_err_msg, read_csv_optional};
use crate::component::{ComponentProperties, ComponentType};
use anyhow::{Context, Result, ensure};
use log::warn;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

const COMPONENT_PROPERTIES_FILE_NAME: &str = "component_properties.csv";

/// Properties of each component model, keyed by component type and model name
pub type PropertiesMap = HashMap<(ComponentType, String), ComponentProperties>;

/// Read component properties from the model directory.
///
/// A missing file is not an error: every component then uses default properties.
pub fn read_component_properties(model_dir: &Path) -> Result<PropertiesMap> {
    let file_path = model_dir.join(COMPONENT_PROPERTIES_FILE_NAME);
    if !file_path.exists() {
        warn!(
            "{} not found; all components will use default properties",
            file_path.display()
        );
    }

    let rows = read_csv_optional(&file_path)?;
    read_component_properties_from_iter(rows).with_context(|| input_err_msg(&file_path))
}

fn read_component_properties_from_iter<I>(iter: I) -> Result<PropertiesMap>
where
    I: Iterator<Item = ComponentProperties>,
{
    let mut map = PropertiesMap::new();
    for props in iter {
        let Ok(comp_type) = ComponentType::from_str(&props.comp_type) else {
            warn!(
                "Ignoring properties of model {}: unknown component type {}",
                props.model, props.comp_type
            );
            continue;
        };

        let key = (comp_type, props.model.clone());
        ensure!(
            !map.contains_key(&key),
            "Duplicate properties for {comp_type} model {}",
            props.model
        );
        map.insert(key, props);
    }

    Ok(map)
}
