//! CSV reports.
//!
//! A report is a serializable row type. Register it once with
//! [`ContextReportExt::add_report`], which opens
//! `<output_dir>/<file_prefix><short_name>.csv`, then send rows to it.
use std::any::TypeId;
use std::cell::RefCell;
use std::fs::{create_dir_all, File};
use std::path::PathBuf;

use csv::Writer;

use crate::context::Context;
use crate::error::OutbreakError;
use crate::{define_data_plugin, trace, HashMap, HashMapExt};

pub trait Report: 'static {
    // Returns report type
    fn type_id(&self) -> TypeId;
    // Serializes the data with the correct writer
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), csv::Error>;
}

/// Use this macro to make a `Serialize` struct usable as a report row.
#[macro_export]
macro_rules! define_report {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(
                &self,
                writer: &mut $crate::csv::Writer<std::fs::File>,
            ) -> Result<(), $crate::csv::Error> {
                writer.serialize(self)
            }
        }
    };
}
pub use define_report;

/// Where report files go and what happens to files already there.
#[derive(Clone, Debug)]
pub struct ConfigReportOptions {
    pub file_prefix: String,
    pub output_dir: PathBuf,
    pub overwrite: bool,
}

impl ConfigReportOptions {
    #[must_use]
    pub fn new() -> Self {
        ConfigReportOptions {
            file_prefix: String::new(),
            output_dir: PathBuf::from("."),
            overwrite: false,
        }
    }

    pub fn file_prefix(&mut self, file_prefix: String) -> &mut ConfigReportOptions {
        self.file_prefix = file_prefix;
        self
    }

    pub fn directory(&mut self, directory: PathBuf) -> &mut ConfigReportOptions {
        self.output_dir = directory;
        self
    }

    pub fn overwrite(&mut self, overwrite: bool) -> &mut ConfigReportOptions {
        self.overwrite = overwrite;
        self
    }
}

impl Default for ConfigReportOptions {
    fn default() -> Self {
        Self::new()
    }
}

struct ReportData {
    file_writers: RefCell<HashMap<TypeId, Writer<File>>>,
    config: ConfigReportOptions,
}

define_data_plugin!(
    ReportPlugin,
    ReportData,
    ReportData {
        file_writers: RefCell::new(HashMap::new()),
        config: ConfigReportOptions::new(),
    }
);

pub trait ContextReportExt {
    /// Options used by every later `add_report` call.
    fn report_options(&mut self) -> &mut ConfigReportOptions;

    /// Opens the CSV file for report type `T`.
    ///
    /// # Errors
    ///
    /// `ReportError` if the file exists and overwriting is off, or an
    /// `IoError` if the directory or file cannot be created.
    fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), OutbreakError>;

    fn has_report<T: Report>(&self) -> bool;

    /// Writes one row to the file for the report's type and flushes it.
    ///
    /// # Errors
    ///
    /// `ReportError` if the type was never added, or the CSV/IO error.
    fn send_report<T: Report>(&self, report: T) -> Result<(), OutbreakError>;
}

impl ContextReportExt for Context {
    fn report_options(&mut self) -> &mut ConfigReportOptions {
        &mut self.get_data_mut(ReportPlugin).config
    }

    fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), OutbreakError> {
        let data_container = self.get_data_mut(ReportPlugin);
        let config = &data_container.config;
        let path = config
            .output_dir
            .join(format!("{}{short_name}.csv", config.file_prefix));
        if path.exists() && !config.overwrite {
            return Err(OutbreakError::ReportError(format!(
                "{} already exists; enable overwrite to replace it",
                path.display()
            )));
        }
        create_dir_all(&config.output_dir)?;
        let file = File::create(&path)?;
        trace!("writing report {short_name} to {}", path.display());

        data_container
            .file_writers
            .get_mut()
            .insert(TypeId::of::<T>(), Writer::from_writer(file));
        Ok(())
    }

    fn has_report<T: Report>(&self) -> bool {
        self.get_data(ReportPlugin).is_some_and(|data_container| {
            data_container
                .file_writers
                .borrow()
                .contains_key(&TypeId::of::<T>())
        })
    }

    fn send_report<T: Report>(&self, report: T) -> Result<(), OutbreakError> {
        let missing = || OutbreakError::ReportError("No writer found for the report type".into());
        let data_container = self.get_data(ReportPlugin).ok_or_else(missing)?;
        let mut writers = data_container
            .file_writers
            .try_borrow_mut()
            .map_err(|_| OutbreakError::ReportError("report writers are busy".to_string()))?;
        let writer = writers.get_mut(&report.type_id()).ok_or_else(missing)?;
        report.serialize(writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_derive::{Deserialize, Serialize};
    use tempfile::tempdir;

    use super::*;

    #[derive(Serialize, Deserialize)]
    struct SampleReport {
        id: u32,
        value: String,
    }

    define_report!(SampleReport);

    #[test]
    fn add_and_send_report() {
        let mut context = Context::new();
        let temp_dir = tempdir().unwrap();
        context
            .report_options()
            .directory(temp_dir.path().to_path_buf())
            .file_prefix("run_".to_string());
        context.add_report::<SampleReport>("sample").unwrap();
        assert!(context.has_report::<SampleReport>());

        context
            .send_report(SampleReport {
                id: 1,
                value: "Value,1".to_string(),
            })
            .unwrap();
        context
            .send_report(SampleReport {
                id: 2,
                value: "Value 2".to_string(),
            })
            .unwrap();

        let path = temp_dir.path().join("run_sample.csv");
        let mut reader = csv::Reader::from_path(path).unwrap();
        let rows: Vec<SampleReport> = reader.deserialize().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, "Value,1");
        assert_eq!(rows[1].id, 2);
    }

    #[test]
    fn nested_directories_are_created() {
        let mut context = Context::new();
        let temp_dir = tempdir().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        context.report_options().directory(nested.clone());
        context.add_report::<SampleReport>("sample").unwrap();
        assert!(nested.join("sample.csv").exists());
    }

    #[test]
    fn existing_file_needs_overwrite() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(temp_dir.path().join("sample.csv"), "id,value\n").unwrap();

        let mut context = Context::new();
        context
            .report_options()
            .directory(temp_dir.path().to_path_buf());
        assert!(matches!(
            context.add_report::<SampleReport>("sample"),
            Err(OutbreakError::ReportError(_))
        ));

        context.report_options().overwrite(true);
        assert!(context.add_report::<SampleReport>("sample").is_ok());
    }

    #[test]
    fn send_report_without_adding_report() {
        let context = Context::new();
        assert!(!context.has_report::<SampleReport>());
        let result = context.send_report(SampleReport {
            id: 1,
            value: "Test Value".to_string(),
        });
        assert!(matches!(result, Err(OutbreakError::ReportError(_))));
    }
}
