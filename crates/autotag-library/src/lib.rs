//! Crate `autotag_library`: configuración, descubrimiento de ficheros,
//! informes y el bucle de grupos que une todo.

pub mod app_config;
pub mod error;
pub mod extensions;
pub mod orchestrator;
pub mod pipeline;
pub mod report;
pub mod scanner;
pub mod traits;

pub use app_config::{AppConfig, PipelineEntry};
pub use error::{ConfigError, Diagnostic, Stage};
pub use extensions::SupportedExtension;
pub use orchestrator::{Orchestrator, RunSummary};
pub use pipeline::{FileOutcome, PreparedPipeline, ProcessError};
pub use report::{ReportContext, TextReportWriter};
pub use scanner::DirScanner;
pub use traits::{FileDiscovery, ReportWriter};
