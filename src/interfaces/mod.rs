//! Adapters between the engine and the outside world: the CSV event stream,
//! the CSV notification sink and the JSON catalog seed file.

pub mod catalog_file;
pub mod csv;
