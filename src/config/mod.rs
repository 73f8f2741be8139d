//! Configuration module

mod site;

pub use site::SiteConfig;
pub use site::BackendConfig;
pub use site::MailConfig;
pub use site::ServerConfig;
pub use site::UploadConfig;
pub use site::CONFIG_FILE;
