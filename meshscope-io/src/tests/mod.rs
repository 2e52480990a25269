//! Test modules for meshscope-io
//!
//! File-level round trips for the basic OBJ reader and writer.
