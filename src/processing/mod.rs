pub mod boundary;
pub mod buffer;
pub mod splitter;
pub mod statistics;
