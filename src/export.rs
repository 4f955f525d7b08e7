use std::{fs::{self, File}, io, path::{Path, PathBuf}};

use serde::Serialize;
use thiserror::Error;

use crate::{config::ExportFormat, items::JobDetails};


#[derive(Debug, Error)]
pub(crate) enum ExportError {
    #[error("no jobs were collected, so there is nothing to export")]
    NoJobs,
    #[error("failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error
    },
    #[error("failed to write job records: {0}")]
    Csv(#[from] csv::Error)
}


/// One exported row. Field order is column order.
#[derive(Debug, Serialize)]
pub(crate) struct JobRecord<'a> {
    degree_required: bool,
    for_disabled: bool,
    for_students: bool,
    full_time: bool,
    half_time: bool,
    experience_years: Option<u32>,
    max_salary: Option<u64>,
    min_salary: Option<u64>,
    company: Option<&'a str>,
    title: Option<&'a str>
}


impl<'a> From<&'a JobDetails> for JobRecord<'a> {
    fn from(value: &'a JobDetails) -> Self {
        Self {
            degree_required: value.degree_required,
            for_disabled: value.for_disabled,
            for_students: value.for_students,
            full_time: value.full_time,
            half_time: value.half_time,
            experience_years: value.experience_years,
            max_salary: value.max_salary,
            min_salary: value.min_salary,
            company: value.company.as_deref(),
            title: value.title.as_deref()
        }
    }
}


/// Writes a header row followed by one row per job. Returns the number of rows written.
pub(crate) fn write_records<W: io::Write>(writer: W, jobs: &[&JobDetails], format: ExportFormat) -> Result<usize, ExportError> {
    if jobs.is_empty() {
        return Err(ExportError::NoJobs);
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(format.delimiter())
        .from_writer(writer);
    for job in jobs {
        writer.serialize(JobRecord::from(*job))?;
    }
    writer.flush().map_err(csv::Error::from)?;

    Ok(jobs.len())
}


/// Like [`write_records`], into a file at `path`. Missing parent directories are
/// created. Nothing is created when there are no jobs.
pub(crate) fn write_file(path: &Path, jobs: &[&JobDetails], format: ExportFormat) -> Result<usize, ExportError> {
    if jobs.is_empty() {
        return Err(ExportError::NoJobs);
    }

    let io_error = |source| ExportError::Io { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent().filter(|x| !x.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let file = File::create(path).map_err(io_error)?;

    write_records(file, jobs, format)
}
