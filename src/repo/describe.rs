use chrono::{DateTime, Utc};

use crate::model::{EventInfo, PodInfo, format_age, format_optional_bytes, format_optional_cpu};

const DESCRIBE_EVENT_LIMIT: usize = 15;

pub fn render_pod_description(pod: &PodInfo, events: &[EventInfo], now: DateTime<Utc>) -> String {
    let owner_line = if pod.owners.is_empty() {
        "-".to_string()
    } else {
        pod.owners
            .iter()
            .map(|owner| format!("{}/{}", owner.kind, owner.name))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let label_line = if pod.labels.is_empty() {
        "-".to_string()
    } else {
        pod.labels
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut lines = vec![
        format!("Name:         {}", pod.name),
        format!("Namespace:    {}", pod.namespace),
        format!("Node:         {}", pod.node.as_deref().unwrap_or("<none>")),
        format!("Age:          {}", format_age(pod.created, now)),
        format!("Status:       {} ({})", pod.status, pod.phase),
        format!("IP:           {}", pod.pod_ip.as_deref().unwrap_or("<none>")),
        format!("Host IP:      {}", pod.host_ip.as_deref().unwrap_or("<none>")),
        format!("Controlled By: {owner_line}"),
        format!("Labels:       {label_line}"),
        String::new(),
        "Containers:".to_string(),
    ];

    for container in &pod.containers {
        lines.push(format!("  {}:", container.name));
        lines.push(format!("    Image:          {}", container.image));
        lines.push(format!("    State:          {}", container.state));
        if let Some(message) = container.state_message.as_deref() {
            lines.push(format!("      Message:      {message}"));
        }
        if let Some(reason) = container.last_termination_reason.as_deref() {
            lines.push(format!(
                "    Last State:     Terminated ({reason}, exit {})",
                container.last_exit_code.unwrap_or_default()
            ));
        }
        lines.push(format!("    Ready:          {}", container.ready));
        lines.push(format!("    Restart Count:  {}", container.restarts));
        if !container.ports.is_empty() {
            let ports = container
                .ports
                .iter()
                .map(|port| format!("{port}/TCP"))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("    Ports:          {ports}"));
        }
        lines.push(format!(
            "    Requests:       cpu {} memory {}",
            format_optional_cpu(container.requests.cpu_millicores),
            format_optional_bytes(container.requests.memory_bytes)
        ));
        lines.push(format!(
            "    Limits:         cpu {} memory {}",
            format_optional_cpu(container.limits.cpu_millicores),
            format_optional_bytes(container.limits.memory_bytes)
        ));
    }

    lines.push(String::new());
    lines.push("Conditions:".to_string());
    if pod.conditions.is_empty() {
        lines.push("  <none>".to_string());
    }
    for (type_, status) in &pod.conditions {
        lines.push(format!("  {type_:<24} {status}"));
    }

    lines.push(String::new());
    lines.push("Volumes from:".to_string());
    for name in &pod.config_map_refs {
        lines.push(format!("  ConfigMap {name}"));
    }
    for name in &pod.secret_refs {
        lines.push(format!("  Secret    {name}"));
    }

    lines.push(String::new());
    lines.push("Events:".to_string());
    if events.is_empty() {
        lines.push("  <none>".to_string());
    }
    for event in events.iter().take(DESCRIBE_EVENT_LIMIT) {
        lines.push(format!(
            "  {:<8} {:<20} {:>5} {:<4} {}",
            event.type_,
            event.reason,
            format_age(event.last_seen, now),
            format!("x{}", event.count),
            event.message
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::render_pod_description;
    use crate::model::{ContainerInfo, EventInfo, OwnerRef, PodInfo};
    use chrono::Utc;

    #[test]
    fn description_lists_containers_owners_and_events() {
        let pod = PodInfo {
            namespace: "prod".to_string(),
            name: "api-0".to_string(),
            phase: "Running".to_string(),
            status: "Running".to_string(),
            owners: vec![OwnerRef {
                kind: "StatefulSet".to_string(),
                name: "api".to_string(),
            }],
            containers: vec![ContainerInfo {
                name: "api".to_string(),
                image: "registry/api:1".to_string(),
                state: "Running".to_string(),
                ports: vec![8080],
                ..ContainerInfo::default()
            }],
            ..PodInfo::default()
        };
        let events = vec![EventInfo {
            type_: "Normal".to_string(),
            reason: "Pulled".to_string(),
            message: "Container image already present".to_string(),
            count: 1,
            ..EventInfo::default()
        }];

        let text = render_pod_description(&pod, &events, Utc::now());

        assert!(text.contains("Controlled By: StatefulSet/api"));
        assert!(text.contains("Ports:          8080/TCP"));
        assert!(text.contains("Pulled"));
        assert!(text.contains("Conditions:\n  <none>"));
    }
}
