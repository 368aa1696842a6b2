/// This module provides a delimited file item reader.
pub mod csv;

/// This module provides a transactional SQLite item writer.
pub mod rdbc;
