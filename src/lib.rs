//! turbine renders files from external data with user-supplied templates.
//! A generator fetches and validates records from its data source, and every
//! record (or the whole set) is rendered into a file whose name and content
//! both come from templates.

/// Command-line interface built from the registered generators
pub mod cli;

/// Configuration resolution from flags, environment and config file
pub mod config;

/// Common constants
pub mod constants;

/// Error types and handling
pub mod error;

/// Filename validation and sanitizing
pub mod filename;

/// The generator contract and the generator registry
pub mod generator;

/// Logger initialisation
pub mod logger;

/// Declared options shared by the command line, environment and config file
pub mod options;

/// File emission: rendering, writing and dry-run tracing
pub mod processor;

/// Template compilation and rendering
pub mod renderer;

/// The Steam owned-games generator
pub mod steam;
