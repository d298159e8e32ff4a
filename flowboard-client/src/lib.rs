/// HTTP side of flowboard: the REST gateway implementation and the
/// client configuration file.
pub mod config;
pub mod rest;

pub use config::ClientConfig;
pub use rest::RestGateway;
