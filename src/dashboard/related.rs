use crate::input::{Nav, apply_nav};
use crate::model::RelatedResources;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelatedView {
    #[default]
    Related,
    Manifest,
    Describe,
}

impl RelatedView {
    pub fn title(self) -> &'static str {
        match self {
            RelatedView::Related => "Related",
            RelatedView::Manifest => "Manifest",
            RelatedView::Describe => "Describe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Heading,
    Item,
    Detail,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelatedPanel {
    related: Option<RelatedResources>,
    error: Option<String>,
    describe: Option<Result<String, String>>,
    view: RelatedView,
    scroll: usize,
}

impl RelatedPanel {
    pub fn set_related(&mut self, related: RelatedResources) {
        self.related = Some(related);
        self.error = None;
    }

    pub fn set_error(&mut self, error: String) {
        self.error = Some(error);
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn related(&self) -> Option<&RelatedResources> {
        self.related.as_ref()
    }

    pub fn view(&self) -> RelatedView {
        self.view
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn describe(&self) -> Option<&Result<String, String>> {
        self.describe.as_ref()
    }

    pub fn toggle_manifest(&mut self) {
        self.view = match self.view {
            RelatedView::Manifest => RelatedView::Related,
            _ => RelatedView::Manifest,
        };
        self.scroll = 0;
    }

    pub fn show_describe(&mut self, output: Result<String, String>) {
        self.describe = Some(output);
        self.view = RelatedView::Describe;
        self.scroll = 0;
    }

    pub fn scroll_by(&mut self, nav: Nav, len: usize, page: usize) {
        self.scroll = apply_nav(self.scroll, nav, len, page);
    }
}

/// Flattens related resources into display lines grouped by resource kind.
pub fn related_lines(related: &RelatedResources) -> Vec<(LineKind, String)> {
    let mut lines = Vec::new();

    if !related.owners.is_empty() {
        lines.push((LineKind::Heading, "Owners".to_string()));
        for owner in &related.owners {
            let replicas = match (owner.ready_replicas, owner.replicas) {
                (Some(ready), Some(desired)) => format!(" ({ready}/{desired})"),
                (None, Some(desired)) => format!(" (0/{desired})"),
                _ => String::new(),
            };
            lines.push((
                LineKind::Item,
                format!("{} {}{replicas}", owner.kind, owner.name),
            ));
        }
    }

    if !related.services.is_empty() {
        lines.push((LineKind::Heading, "Services".to_string()));
        for service in &related.services {
            lines.push((
                LineKind::Item,
                format!("{} [{}] {}", service.name, service.type_, service.cluster_ip),
            ));
            if !service.ports.is_empty() {
                lines.push((LineKind::Detail, service.ports.clone()));
            }
        }
    }

    if !related.ingresses.is_empty() {
        lines.push((LineKind::Heading, "Ingresses".to_string()));
        for ingress in &related.ingresses {
            let class = ingress.class.as_deref().unwrap_or("-");
            lines.push((LineKind::Item, format!("{} class={class}", ingress.name)));
            for rule in &ingress.rules {
                lines.push((
                    LineKind::Detail,
                    format!("{}{} -> {}", rule.host, rule.path, rule.backend),
                ));
            }
            if !ingress.tls_hosts.is_empty() {
                lines.push((
                    LineKind::Detail,
                    format!("tls: {}", ingress.tls_hosts.join(", ")),
                ));
            }
            for (key, value) in &ingress.debug_annotations {
                lines.push((LineKind::Detail, format!("{key}={value}")));
            }
        }
    }

    if !related.virtual_services.is_empty() {
        lines.push((LineKind::Heading, "VirtualServices".to_string()));
        for virtual_service in &related.virtual_services {
            lines.push((
                LineKind::Item,
                format!("{} hosts={}", virtual_service.name, virtual_service.hosts.join(",")),
            ));
            if !virtual_service.gateways.is_empty() {
                lines.push((
                    LineKind::Detail,
                    format!("gateways: {}", virtual_service.gateways.join(", ")),
                ));
            }
            for destination in &virtual_service.destinations {
                lines.push((LineKind::Detail, format!("-> {destination}")));
            }
        }
    }

    if !related.gateways.is_empty() {
        lines.push((LineKind::Heading, "Gateways".to_string()));
        for gateway in &related.gateways {
            lines.push((
                LineKind::Item,
                format!("{}/{}", gateway.namespace, gateway.name),
            ));
            for server in &gateway.servers {
                lines.push((LineKind::Detail, server.clone()));
            }
        }
    }

    for (title, names) in [
        ("ConfigMaps", &related.config_maps),
        ("Secrets", &related.secrets),
    ] {
        if names.is_empty() {
            continue;
        }
        lines.push((LineKind::Heading, title.to_string()));
        lines.extend(names.iter().map(|name| (LineKind::Item, name.clone())));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::{LineKind, RelatedPanel, RelatedView, related_lines};
    use crate::model::{OwnerLink, RelatedResources, ServiceInfo};

    #[test]
    fn lines_group_resources_under_headings() {
        let related = RelatedResources {
            services: vec![ServiceInfo {
                name: "api".to_string(),
                type_: "ClusterIP".to_string(),
                cluster_ip: "10.0.0.1".to_string(),
                ports: "80/TCP".to_string(),
            }],
            owners: vec![OwnerLink {
                kind: "Deployment".to_string(),
                name: "api".to_string(),
                replicas: Some(3),
                ready_replicas: Some(2),
            }],
            config_maps: vec!["api-config".to_string()],
            ..RelatedResources::default()
        };
        let lines = related_lines(&related);
        assert_eq!(lines[0], (LineKind::Heading, "Owners".to_string()));
        assert_eq!(lines[1], (LineKind::Item, "Deployment api (2/3)".to_string()));
        assert!(lines.contains(&(LineKind::Detail, "80/TCP".to_string())));
        assert_eq!(
            lines.last(),
            Some(&(LineKind::Item, "api-config".to_string()))
        );
    }

    #[test]
    fn manifest_toggle_returns_to_related() {
        let mut panel = RelatedPanel::default();
        panel.show_describe(Ok("Name: api-0".to_string()));
        assert_eq!(panel.view(), RelatedView::Describe);
        panel.toggle_manifest();
        assert_eq!(panel.view(), RelatedView::Manifest);
        panel.toggle_manifest();
        assert_eq!(panel.view(), RelatedView::Related);
    }
}
