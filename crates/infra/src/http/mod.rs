//! HTTP transport used by the rail data API client

pub mod transport;

pub use transport::{
    HttpTransport, HttpTransportBuilder, Transport, TransportError, TransportRequest,
    TransportResponse,
};
