// src/health/probes/mod.rs
mod identity_provider;
mod mail_gateway;
mod object_storage;
pub mod sigv4;

pub use identity_provider::IdentityProviderProbe;
pub use mail_gateway::MailGatewayProbe;
pub use object_storage::ObjectStorageProbe;
