#[path = "../common/mod.rs"]
mod common;

pub mod test_config;
pub mod test_cookies;
pub mod test_errors;
pub mod test_xml;
