pub(crate) mod job;
pub(crate) mod unit;
pub(crate) mod unit_file;
pub(crate) mod value;
