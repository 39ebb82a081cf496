pub mod error;
pub mod open_meteo;

use crate::provider::error::ProviderError;
use std::future::Future;

/// External service that derives one value per coordinate.
///
/// A request takes parallel latitude/longitude slices and must answer with a
/// parallel vector of results. Implementations bound every request in time and
/// classify failures through [`ProviderError::kind`].
pub trait EnrichmentProvider {
    fn fetch(
        &self,
        latitudes: &[f64],
        longitudes: &[f64],
    ) -> impl Future<Output = Result<Vec<f64>, ProviderError>> + Send;
}
