//! Optional directory parsers (import, export, resource).

pub mod export;
pub mod import;
pub mod resource;

pub use export::{parse_exports, ExportTable};
pub use import::{parse_imports, ImportTable};
pub use resource::{parse_resources, ResourceTable};
