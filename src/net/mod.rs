mod endpoint;

pub use endpoint::Endpoint;
pub use endpoint::EndpointError;
