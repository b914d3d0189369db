pub mod log;
pub(crate) mod which;
