use crate::input::{Nav, apply_nav};
use crate::model::{NodeInfo, PodInfo, PodMetrics, ResourceAmounts, Usage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricsColumn {
    #[default]
    Containers,
    Node,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRow {
    pub name: String,
    pub usage: Option<Usage>,
    pub requests: ResourceAmounts,
    pub limits: ResourceAmounts,
    pub restarts: i32,
}

impl ContainerRow {
    /// Usage as a percentage of the limit, falling back to the request.
    pub fn cpu_percent(&self) -> Option<u64> {
        let used = self.usage?.cpu_millicores;
        let budget = self.limits.cpu_millicores.or(self.requests.cpu_millicores)?;
        percent(used, budget)
    }

    pub fn memory_percent(&self) -> Option<u64> {
        let used = self.usage?.memory_bytes;
        let budget = self.limits.memory_bytes.or(self.requests.memory_bytes)?;
        percent(used, budget)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetricsPanel {
    metrics: Option<PodMetrics>,
    unavailable: Option<String>,
    error: Option<String>,
    node: Option<NodeInfo>,
    node_error: Option<String>,
    column: MetricsColumn,
    scroll: [usize; 2],
}

impl MetricsPanel {
    pub fn set_metrics(&mut self, metrics: Option<PodMetrics>) {
        self.unavailable = match metrics {
            Some(_) => None,
            None => Some("Metrics Server not available".to_string()),
        };
        self.metrics = metrics;
        self.error = None;
    }

    /// Keeps the last usage sample; the error is shown above it until the next good refresh.
    pub fn set_error(&mut self, error: String) {
        self.error = Some(error);
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_node(&mut self, node: Option<Result<NodeInfo, String>>) {
        match node {
            Some(Ok(node)) => {
                self.node = Some(node);
                self.node_error = None;
            }
            Some(Err(error)) => self.node_error = Some(error),
            None => {
                self.node = None;
                self.node_error = None;
            }
        }
    }

    pub fn unavailable(&self) -> Option<&str> {
        self.unavailable.as_deref()
    }

    pub fn node(&self) -> Option<&NodeInfo> {
        self.node.as_ref()
    }

    pub fn node_error(&self) -> Option<&str> {
        self.node_error.as_deref()
    }

    pub fn column(&self) -> MetricsColumn {
        self.column
    }

    pub fn scroll(&self, column: MetricsColumn) -> usize {
        self.scroll[column as usize]
    }

    pub fn total(&self) -> Option<Usage> {
        self.metrics.as_ref().map(PodMetrics::total)
    }

    pub fn container_rows(&self, pod: &PodInfo) -> Vec<ContainerRow> {
        pod.containers
            .iter()
            .map(|container| ContainerRow {
                name: container.name.clone(),
                usage: self
                    .metrics
                    .as_ref()
                    .and_then(|metrics| metrics.usage_for(&container.name)),
                requests: container.requests,
                limits: container.limits,
                restarts: container.restarts,
            })
            .collect()
    }

    pub fn handle_nav(&mut self, nav: Nav, rows: usize, page: usize) {
        match nav {
            Nav::Left => self.column = MetricsColumn::Containers,
            Nav::Right => self.column = MetricsColumn::Node,
            _ => {
                let slot = &mut self.scroll[self.column as usize];
                *slot = apply_nav(*slot, nav, rows, page);
            }
        }
    }
}

fn percent(used: u64, budget: u64) -> Option<u64> {
    (budget > 0).then(|| used.saturating_mul(100) / budget)
}

#[cfg(test)]
mod tests {
    use super::{MetricsColumn, MetricsPanel};
    use crate::input::Nav;
    use crate::model::{ContainerInfo, ContainerUsage, PodInfo, PodMetrics, ResourceAmounts, Usage};

    fn pod() -> PodInfo {
        PodInfo {
            containers: vec![ContainerInfo {
                name: "app".to_string(),
                limits: ResourceAmounts {
                    cpu_millicores: Some(500),
                    memory_bytes: Some(256 * 1_048_576),
                },
                ..ContainerInfo::default()
            }],
            ..PodInfo::default()
        }
    }

    #[test]
    fn missing_metrics_server_is_reported() {
        let mut panel = MetricsPanel::default();
        panel.set_metrics(None);
        assert_eq!(panel.unavailable(), Some("Metrics Server not available"));
        assert_eq!(panel.container_rows(&pod())[0].usage, None);
    }

    #[test]
    fn rows_compare_usage_against_limits() {
        let mut panel = MetricsPanel::default();
        panel.set_metrics(Some(PodMetrics {
            containers: vec![ContainerUsage {
                name: "app".to_string(),
                usage: Usage {
                    cpu_millicores: 250,
                    memory_bytes: 64 * 1_048_576,
                },
            }],
        }));
        let rows = panel.container_rows(&pod());
        assert_eq!(rows[0].cpu_percent(), Some(50));
        assert_eq!(rows[0].memory_percent(), Some(25));
    }

    #[test]
    fn failed_refresh_keeps_last_sample() {
        let mut panel = MetricsPanel::default();
        panel.set_metrics(Some(PodMetrics {
            containers: vec![ContainerUsage {
                name: "app".to_string(),
                usage: Usage {
                    cpu_millicores: 100,
                    memory_bytes: 1_048_576,
                },
            }],
        }));
        panel.set_error("connection reset".to_string());

        assert_eq!(panel.error(), Some("connection reset"));
        assert_eq!(panel.unavailable(), None);
        assert_eq!(
            panel.total(),
            Some(Usage {
                cpu_millicores: 100,
                memory_bytes: 1_048_576,
            })
        );

        panel.set_metrics(None);
        assert_eq!(panel.error(), None);
    }

    #[test]
    fn columns_scroll_independently() {
        let mut panel = MetricsPanel::default();
        panel.handle_nav(Nav::Down, 5, 2);
        panel.handle_nav(Nav::Right, 5, 2);
        assert_eq!(panel.column(), MetricsColumn::Node);
        assert_eq!(panel.scroll(MetricsColumn::Node), 0);
        assert_eq!(panel.scroll(MetricsColumn::Containers), 1);
    }
}
