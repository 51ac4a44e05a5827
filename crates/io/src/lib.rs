// File I/O operations

pub mod cache;
pub mod csv;
pub mod error;
pub mod ingest;
pub mod upload;
pub mod xlsx;

pub use cache::ParseCache;
pub use error::FileError;
pub use ingest::{read_table, FileFormat};
pub use upload::{Upload, UploadSet};
