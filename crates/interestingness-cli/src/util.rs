use std::{fs::File, io, path::Path};

use anyhow::Context;
use interestingness_analysis::{
    config::AnalysisParams,
    record::{InteractionRecord, Records},
};

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;
    Ok(value)
}

pub fn read_records_file<P>(path: P) -> anyhow::Result<Records>
where
    P: AsRef<Path>,
{
    let records = read_json_file::<Vec<InteractionRecord>, _>("records", path)?;
    Ok(records.into())
}

pub fn read_params_file<P>(path: Option<P>) -> anyhow::Result<AnalysisParams>
where
    P: AsRef<Path>,
{
    match path {
        Some(path) => read_json_file("configuration", path),
        None => Ok(AnalysisParams::default()),
    }
}
