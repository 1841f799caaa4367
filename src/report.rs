//! Tab-separated output streams. Each report type owns one file whose header
//! is written when the stream is created and whose rows are flushed one by
//! one, so a run that aborts leaves every completed row on disk.
use std::any::TypeId;
use std::cell::RefCell;
use std::fs::{create_dir_all, File};
use std::path::PathBuf;

use csv::{Writer, WriterBuilder};
use log::trace;

use crate::context::Context;
use crate::error::EpisimError;
use crate::{define_data_plugin, HashMap};

pub trait Report: 'static {
    /// Column names, written once as the first line of the stream.
    fn headers() -> &'static [&'static str]
    where
        Self: Sized;

    fn type_id(&self) -> TypeId;

    /// Serializes `self` as one row.
    ///
    /// # Errors
    ///
    /// Returns an `EpisimError::CsvError` if the row cannot be written.
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), EpisimError>;
}

/// Implements `Report` for a `Serialize` row type with the given columns.
#[macro_export]
macro_rules! define_report {
    ($name:ident, [$($column:expr),+ $(,)?]) => {
        impl $crate::report::Report for $name {
            fn headers() -> &'static [&'static str] {
                &[$($column),+]
            }

            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(
                &self,
                writer: &mut $crate::csv::Writer<std::fs::File>,
            ) -> Result<(), $crate::error::EpisimError> {
                writer.serialize(self)?;
                Ok(())
            }
        }
    };
}
pub use define_report;

/// Where report files go and how they are named: `{directory}/{file_prefix}{name}.txt`.
#[derive(Clone, Debug)]
pub struct ReportOptions {
    pub file_prefix: String,
    pub directory: PathBuf,
    pub overwrite: bool,
}

impl ReportOptions {
    #[must_use]
    pub fn new() -> ReportOptions {
        ReportOptions {
            file_prefix: String::new(),
            directory: PathBuf::from("."),
            overwrite: false,
        }
    }

    pub fn file_prefix(&mut self, file_prefix: String) -> &mut ReportOptions {
        self.file_prefix = file_prefix;
        self
    }

    pub fn directory(&mut self, directory: PathBuf) -> &mut ReportOptions {
        self.directory = directory;
        self
    }

    pub fn overwrite(&mut self, overwrite: bool) -> &mut ReportOptions {
        self.overwrite = overwrite;
        self
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::new()
    }
}

struct ReportData {
    file_writers: RefCell<HashMap<TypeId, Writer<File>>>,
    config: ReportOptions,
}

define_data_plugin!(
    ReportPlugin,
    ReportData,
    ReportData {
        file_writers: RefCell::new(HashMap::default()),
        config: ReportOptions::new(),
    }
);

pub trait ContextReportExt {
    /// Mutable access to the naming options used by later `add_report` calls.
    fn report_options(&mut self) -> &mut ReportOptions;

    /// Creates the output stream of report type `T` named `short_name` and
    /// writes its header.
    ///
    /// # Errors
    ///
    /// Returns `EpisimError::ReportError` if the file exists and overwriting
    /// is disabled, or an I/O or CSV error if the file cannot be created.
    fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), EpisimError>;

    /// Appends one row to the stream of `T` and flushes it.
    ///
    /// # Errors
    ///
    /// Returns `EpisimError::ReportError` if no stream was added for `T`, or
    /// the I/O error of the write.
    fn send_report<T: Report>(&self, report: T) -> Result<(), EpisimError>;

    /// Whether `add_report` was called for `T`.
    fn has_report<T: Report>(&self) -> bool;
}

impl ContextReportExt for Context {
    fn report_options(&mut self) -> &mut ReportOptions {
        &mut self.get_data_mut(ReportPlugin).config
    }

    fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), EpisimError> {
        let data_container = self.get_data_mut(ReportPlugin);
        let config = &data_container.config;
        let path = config
            .directory
            .join(format!("{}{short_name}.txt", config.file_prefix));

        if path.exists() && !config.overwrite {
            return Err(EpisimError::ReportError(format!(
                "{} already exists; set overwrite to replace it",
                path.display()
            )));
        }
        create_dir_all(&config.directory)?;
        trace!("creating report {}", path.display());

        let file = File::create(&path)?;
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(file);
        writer.write_record(T::headers())?;
        writer.flush()?;

        data_container
            .file_writers
            .borrow_mut()
            .insert(TypeId::of::<T>(), writer);
        Ok(())
    }

    fn send_report<T: Report>(&self, report: T) -> Result<(), EpisimError> {
        let data_container = self
            .get_data(ReportPlugin)
            .ok_or_else(|| EpisimError::ReportError("no reports have been added".to_string()))?;
        let mut writers = data_container.file_writers.borrow_mut();
        let writer = writers.get_mut(&report.type_id()).ok_or_else(|| {
            EpisimError::ReportError("no writer found for the report type".to_string())
        })?;
        report.serialize(writer)?;
        writer.flush()?;
        Ok(())
    }

    fn has_report<T: Report>(&self) -> bool {
        self.get_data(ReportPlugin)
            .is_some_and(|data| data.file_writers.borrow().contains_key(&TypeId::of::<T>()))
    }
}
