pub mod api_endpoint;
pub mod data_source;
pub mod endpoint_call_stats;
pub mod url_replace_rule;

pub use api_endpoint::Entity as ApiEndpointEntity;
pub use data_source::Entity as DataSourceEntity;
pub use endpoint_call_stats::Entity as EndpointCallStatsEntity;
pub use url_replace_rule::Entity as UrlReplaceRuleEntity;
