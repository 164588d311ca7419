//! Episode/timestep-indexed CSV tables
//!
//! Every table has one row per timestep, the `Episode` and `Timestep`
//! (local to the episode) index columns, and one column per derived
//! dimension:
//!
//! ```text
//! Episode,Timestep,Value
//! 0,0,0.41
//! 0,1,0.43
//! 1,0,0.12
//! ```
//!
//! Indices follow the [`Episodes`] convention, so the first record is always
//! episode 0, timestep 0.

use std::{
    io,
    path::{Path, PathBuf},
};

use crate::{episode::Episodes, error::SequenceError};

pub const EPISODE_COLUMN: &str = "Episode";
pub const TIMESTEP_COLUMN: &str = "Timestep";

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ExportError {
    #[display("failed to write table {}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[display("cannot export table {}: {source}", path.display())]
    Shape {
        path: PathBuf,
        source: SequenceError,
    },
}

/// A named per-timestep value column.
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub name: &'a str,
    pub values: &'a [f64],
}

impl<'a> Column<'a> {
    #[must_use]
    pub fn new(name: &'a str, values: &'a [f64]) -> Self {
        Self { name, values }
    }
}

/// Writes an episode/timestep-indexed table to `path`, replacing any
/// existing file.
pub fn write_time_table(
    path: &Path,
    episodes: &Episodes,
    columns: &[Column<'_>],
) -> Result<(), ExportError> {
    check_columns(episodes, columns).map_err(|source| ExportError::Shape {
        path: path.to_owned(),
        source,
    })?;
    let writer = csv::Writer::from_path(path).map_err(|source| ExportError::Csv {
        path: path.to_owned(),
        source,
    })?;
    write_rows(writer, episodes, columns).map_err(|source| ExportError::Csv {
        path: path.to_owned(),
        source,
    })?;
    tracing::info!(
        path = %path.display(),
        rows = episodes.timesteps(),
        columns = columns.len(),
        "saved time table"
    );
    Ok(())
}

/// Writes the same table as [`write_time_table`] to an arbitrary writer.
pub fn write_time_table_to<W>(
    writer: W,
    episodes: &Episodes,
    columns: &[Column<'_>],
) -> Result<(), ExportError>
where
    W: io::Write,
{
    check_columns(episodes, columns).map_err(|source| ExportError::Shape {
        path: PathBuf::new(),
        source,
    })?;
    write_rows(csv::Writer::from_writer(writer), episodes, columns).map_err(|source| {
        ExportError::Csv {
            path: PathBuf::new(),
            source,
        }
    })
}

fn check_columns(episodes: &Episodes, columns: &[Column<'_>]) -> Result<(), SequenceError> {
    for column in columns {
        if column.values.len() != episodes.timesteps() {
            return Err(SequenceError::LengthMismatch {
                column: column.name.to_owned(),
                expected: episodes.timesteps(),
                found: column.values.len(),
            });
        }
    }
    Ok(())
}

fn write_rows<W>(
    mut writer: csv::Writer<W>,
    episodes: &Episodes,
    columns: &[Column<'_>],
) -> Result<(), csv::Error>
where
    W: io::Write,
{
    let header = [EPISODE_COLUMN, TIMESTEP_COLUMN]
        .into_iter()
        .chain(columns.iter().map(|c| c.name));
    writer.write_record(header)?;

    for (t, (episode, local)) in episodes.index_pairs().enumerate() {
        let row = [episode.to_string(), local.to_string()]
            .into_iter()
            .chain(columns.iter().map(|c| c.values[t].to_string()));
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
