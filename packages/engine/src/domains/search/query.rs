//! Search query surface.

use typed_builder::TypedBuilder;

use crate::common::GeoPoint;
use crate::domains::services::models::ServiceCategory;

/// One search invocation. The strategy is named at call time and resolved
/// against the strategy table; unknown names fail closed.
#[derive(Debug, Clone, TypedBuilder)]
pub struct SearchQuery {
    /// Strategy name: text, geographic, category, emergency, availability,
    /// or smart.
    #[builder(setter(into))]
    pub strategy: String,

    #[builder(default, setter(strip_option, into))]
    pub free_text: Option<String>,

    #[builder(default, setter(strip_option))]
    pub category: Option<ServiceCategory>,

    #[builder(default, setter(strip_option))]
    pub max_distance_km: Option<f64>,

    #[builder(default, setter(strip_option))]
    pub user_location: Option<GeoPoint>,
}
