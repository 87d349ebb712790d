use super::EndpointService;
use crate::errors::Result;
use crate::model::Endpoint;
use crate::services::call_stats::EndpointCalls;

impl EndpointService {
    /// 全部端点（按展示顺序）及其调用计数，未被调用过的端点计数为零
    pub fn list_call_stats(&self) -> Vec<(Endpoint, EndpointCalls)> {
        self.catalog
            .snapshot()
            .endpoints()
            .map(|e| (e.clone(), self.call_stats.get_or_empty(e.id)))
            .collect()
    }

    pub fn get_call_stats(&self, id: i32) -> Result<(Endpoint, EndpointCalls)> {
        let endpoint = self.get_endpoint(id)?;
        let calls = self.call_stats.get_or_empty(id);
        Ok((endpoint, calls))
    }

    pub fn total_calls(&self) -> u64 {
        self.call_stats.total_calls()
    }
}
