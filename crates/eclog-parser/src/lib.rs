pub mod errors;
pub mod model;
mod reader;
pub mod schema;

pub use errors::ParserError;
pub use model::{LogReaderOptions, ParsedLogTable};
pub use reader::{read_log_file, read_log_table};

#[cfg(test)]
mod tests;
