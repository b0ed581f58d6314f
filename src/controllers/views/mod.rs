pub mod csv;
pub mod format;
pub mod pages;
