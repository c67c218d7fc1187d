use serde::Deserialize;

use crate::store::{CloudProvider, Instance, InstanceStatus};

#[derive(Debug, Default, Deserialize)]
pub struct ListInstancesQuery {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceUsageQuery {
    #[serde(default)]
    pub provider: Option<String>,
}

/// Conjunction of list filters. Unknown provider/status values and blank
/// searches are dropped rather than rejected. A non-blank search is matched as
/// given, surrounding whitespace included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceFilter {
    pub provider: Option<CloudProvider>,
    pub status: Option<InstanceStatus>,
    /// Lowercased needle
    pub search: Option<String>,
}

impl InstanceFilter {
    pub fn from_query(query: &ListInstancesQuery) -> Self {
        let search = query
            .search
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_lowercase);

        Self {
            provider: query.provider.as_deref().and_then(CloudProvider::parse),
            status: query.status.as_deref().and_then(InstanceStatus::parse),
            search,
        }
    }

    /// Running instances, optionally narrowed to one provider
    pub fn running_for(query: &ResourceUsageQuery) -> Self {
        Self {
            provider: query.provider.as_deref().and_then(CloudProvider::parse),
            status: Some(InstanceStatus::Running),
            search: None,
        }
    }

    pub fn matches(&self, instance: &Instance) -> bool {
        if self.provider.is_some_and(|p| instance.provider != p) {
            return false;
        }
        if self.status.is_some_and(|s| instance.status != s) {
            return false;
        }
        match &self.search {
            Some(needle) => matches_search(instance, needle),
            None => true,
        }
    }

    pub fn apply(&self, instances: Vec<Instance>) -> Vec<Instance> {
        instances.into_iter().filter(|i| self.matches(i)).collect()
    }
}

fn matches_search(instance: &Instance, needle: &str) -> bool {
    if instance.name.to_lowercase().contains(needle)
        || instance.instance_id.to_lowercase().contains(needle)
    {
        return true;
    }

    instance.has_ip_address()
        && instance
            .ip_address
            .as_deref()
            .unwrap_or_default()
            .to_lowercase()
            .contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InstanceStore, NewInstance};
    use serde_json::Map;
    use std::time::Duration;

    fn query(
        provider: Option<&str>,
        status: Option<&str>,
        search: Option<&str>,
    ) -> ListInstancesQuery {
        ListInstancesQuery {
            provider: provider.map(String::from),
            status: status.map(String::from),
            search: search.map(String::from),
        }
    }

    async fn fleet() -> Vec<Instance> {
        let store = InstanceStore::new(Duration::from_secs(5));
        let rows = [
            (
                "Web-Server",
                "i-AAA111",
                CloudProvider::Aws,
                InstanceStatus::Running,
                Some("172.31.0.5"),
            ),
            (
                "db-server",
                "gce-bbb222",
                CloudProvider::Gcp,
                InstanceStatus::Running,
                Some("10.0.0.9"),
            ),
            ("batch", "gce-ccc333", CloudProvider::Gcp, InstanceStatus::Stopped, Some("")),
            ("edge", "inst-ddd444", CloudProvider::Openstack, InstanceStatus::Error, None),
        ];
        for (name, instance_id, provider, status, ip) in rows {
            store
                .create_instance(NewInstance {
                    name: name.to_string(),
                    instance_id: instance_id.to_string(),
                    status,
                    provider,
                    ip_address: ip.map(String::from),
                    cpu: 2,
                    memory: 4,
                    cpu_usage: 10,
                    memory_usage: 10,
                    uptime: 0,
                    metadata: Map::new(),
                })
                .await
                .unwrap();
        }
        store.list_instances().await
    }

    fn names(instances: &[Instance]) -> Vec<&str> {
        instances.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn invalid_enum_values_are_ignored() {
        let filter = InstanceFilter::from_query(&query(Some("azure"), Some("booting"), None));
        assert_eq!(filter, InstanceFilter::default());
    }

    #[test]
    fn blank_search_is_ignored() {
        let filter = InstanceFilter::from_query(&query(None, None, Some("   ")));
        assert!(filter.search.is_none());
    }

    #[tokio::test]
    async fn status_filter_returns_exact_subset() {
        let instances = fleet().await;
        let filter = InstanceFilter::from_query(&query(None, Some("running"), None));
        assert_eq!(names(&filter.apply(instances)), vec!["Web-Server", "db-server"]);
    }

    #[tokio::test]
    async fn provider_and_status_compose() {
        let instances = fleet().await;
        let filter = InstanceFilter::from_query(&query(Some("gcp"), Some("stopped"), None));
        assert_eq!(names(&filter.apply(instances)), vec!["batch"]);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_across_fields() {
        let instances = fleet().await;

        let by_name = InstanceFilter::from_query(&query(None, None, Some("web")));
        assert_eq!(names(&by_name.apply(instances.clone())), vec!["Web-Server"]);

        let by_instance_id = InstanceFilter::from_query(&query(None, None, Some("BBB")));
        assert_eq!(names(&by_instance_id.apply(instances.clone())), vec!["db-server"]);

        let by_ip = InstanceFilter::from_query(&query(None, None, Some("10.0.0")));
        assert_eq!(names(&by_ip.apply(instances)), vec!["db-server"]);
    }

    #[test]
    fn search_keeps_surrounding_whitespace() {
        let filter = InstanceFilter::from_query(&query(None, None, Some(" Web ")));
        assert_eq!(filter.search.as_deref(), Some(" web "));
    }

    #[tokio::test]
    async fn padded_search_matches_verbatim() {
        let instances = fleet().await;
        let filter = InstanceFilter::from_query(&query(None, None, Some(" web")));
        assert!(filter.apply(instances).is_empty());
    }

    #[tokio::test]
    async fn empty_search_returns_everything() {
        let instances = fleet().await;
        let filter = InstanceFilter::from_query(&query(None, None, Some("")));
        assert_eq!(filter.apply(instances).len(), 4);
    }

    #[tokio::test]
    async fn running_filter_excludes_other_states() {
        let instances = fleet().await;
        let filter = InstanceFilter::running_for(&ResourceUsageQuery {
            provider: Some("gcp".to_string()),
        });
        assert_eq!(names(&filter.apply(instances)), vec!["db-server"]);
    }
}
