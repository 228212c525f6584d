//! The seam between the data-model mapper and a DAP2 server.

use crate::das::Das;
use crate::dds::Dds;
use crate::error::TransportResult;

/// Fetches parsed DAP2 responses.
///
/// `url` is the transport URL of the dataset (already `http:`/`file:`).
/// Implementations own the HTTP client or on-disk reader; this crate only
/// defines the shape of what comes back.
pub trait Transport {
    /// Fetch and parse the `.dds` structural description.
    fn fetch_dds(&mut self, url: &str) -> TransportResult<Dds>;

    /// Fetch and parse the `.das` attribute tables.
    fn fetch_das(&mut self, url: &str) -> TransportResult<Das>;

    /// Fetch the `.dods` data response for a constraint expression.
    ///
    /// `ce` is either empty or starts with `?`.
    fn fetch_data(&mut self, url: &str, ce: &str) -> TransportResult<Dds>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn fetch_dds(&mut self, url: &str) -> TransportResult<Dds> {
        (**self).fetch_dds(url)
    }

    fn fetch_das(&mut self, url: &str) -> TransportResult<Das> {
        (**self).fetch_das(url)
    }

    fn fetch_data(&mut self, url: &str, ce: &str) -> TransportResult<Dds> {
        (**self).fetch_data(url, ce)
    }
}
