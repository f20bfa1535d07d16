//! Reserved identifiers shared by servers and clients.

/// Application id reserved for tests and demo deployments.
///
/// Licenses issued for this id are never accepted by a production build
/// configured with its own application id.
pub const DEMO_APPLICATION_ID: &str = "08c6925f-a734-4e24-8d84-e06737420766";

/// Field name tagging the originating sender id in correlated output.
pub const SENDER_ID_TOKEN: &str = "sender_id";

/// Field name tagging the originating sender endpoint in correlated output.
pub const SENDER_ENDPOINT_TOKEN: &str = "sender_endpoint";
