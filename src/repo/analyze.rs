use crate::model::{DebugHelper, EventInfo, PodInfo, Severity};

const HIGH_RESTART_THRESHOLD: i32 = 5;

/// Turns pod state and recent events into actionable hints, most severe first.
pub fn analyze_pod_issues(pod: &PodInfo, events: &[EventInfo]) -> Vec<DebugHelper> {
    let mut helpers = Vec::new();
    let target = format!("-n {} {}", pod.namespace, pod.name);

    for container in &pod.containers {
        let logs_previous = format!("kubectl logs {target} -c {} --previous", container.name);
        match container.state.as_str() {
            "CrashLoopBackOff" => helpers.push(DebugHelper {
                severity: Severity::Critical,
                title: format!("{} is crash looping", container.name),
                detail: match container.last_termination_reason.as_deref() {
                    Some(reason) => format!(
                        "Last exit: {reason} (code {})",
                        container.last_exit_code.unwrap_or_default()
                    ),
                    None => "The container exits shortly after starting".to_string(),
                },
                commands: vec![logs_previous.clone(), format!("kubectl describe pod {target}")],
            }),
            "ImagePullBackOff" | "ErrImagePull" | "InvalidImageName" => {
                helpers.push(DebugHelper {
                    severity: Severity::Critical,
                    title: format!("{} cannot pull its image", container.name),
                    detail: format!(
                        "Image {} could not be pulled. Check the tag and imagePullSecrets",
                        container.image
                    ),
                    commands: vec![format!(
                        "kubectl get pod {target} -o jsonpath='{{.spec.imagePullSecrets}}'"
                    )],
                })
            }
            "CreateContainerConfigError" => helpers.push(DebugHelper {
                severity: Severity::Critical,
                title: format!("{} has an invalid configuration", container.name),
                detail: container.state_message.clone().unwrap_or_else(|| {
                    "A referenced ConfigMap or Secret key is missing".to_string()
                }),
                commands: pod
                    .config_map_refs
                    .iter()
                    .map(|name| format!("kubectl get configmap -n {} {name}", pod.namespace))
                    .chain(
                        pod.secret_refs
                            .iter()
                            .map(|name| format!("kubectl get secret -n {} {name}", pod.namespace)),
                    )
                    .collect(),
            }),
            _ => {}
        }

        if container.last_termination_reason.as_deref() == Some("OOMKilled") {
            let limit = container
                .limits
                .memory_bytes
                .map(crate::model::format_bytes)
                .unwrap_or_else(|| "unset".to_string());
            helpers.push(DebugHelper {
                severity: Severity::Critical,
                title: format!("{} was OOMKilled", container.name),
                detail: format!("Memory limit {limit}. Raise the limit or reduce usage"),
                commands: vec![logs_previous.clone()],
            });
        } else if container.state != "CrashLoopBackOff"
            && let Some(code) = container.last_exit_code
            && code != 0
        {
            helpers.push(DebugHelper {
                severity: Severity::Warning,
                title: format!("{} exited with code {code}", container.name),
                detail: container
                    .last_termination_reason
                    .clone()
                    .unwrap_or_else(|| "Previous instance terminated with an error".to_string()),
                commands: vec![logs_previous.clone()],
            });
        }

        if container.restarts >= HIGH_RESTART_THRESHOLD && container.state != "CrashLoopBackOff" {
            helpers.push(DebugHelper {
                severity: Severity::Warning,
                title: format!("{} restarted {} times", container.name, container.restarts),
                detail: "Frequent restarts usually point at failing probes or crashes".to_string(),
                commands: vec![logs_previous],
            });
        }
    }

    if pod.phase == "Pending"
        && let Some(event) = events
            .iter()
            .find(|event| event.reason == "FailedScheduling")
    {
        helpers.push(DebugHelper {
            severity: Severity::Critical,
            title: "Pod cannot be scheduled".to_string(),
            detail: event.message.clone(),
            commands: vec![
                "kubectl get nodes".to_string(),
                "kubectl describe nodes | grep -A5 Allocated".to_string(),
            ],
        });
    }

    let probe_failures = events
        .iter()
        .filter(|event| event.reason == "Unhealthy")
        .collect::<Vec<_>>();
    if let Some(latest) = probe_failures.first() {
        let probe = if latest.message.contains("Liveness") {
            "Liveness"
        } else if latest.message.contains("Startup") {
            "Startup"
        } else {
            "Readiness"
        };
        let count = probe_failures
            .iter()
            .map(|event| event.count.max(1))
            .sum::<i32>();
        helpers.push(DebugHelper {
            severity: Severity::Warning,
            title: format!("{probe} probe failing ({count}x)"),
            detail: latest.message.clone(),
            commands: vec![format!("kubectl describe pod {target}")],
        });
    }

    if pod.phase == "Running" && pod.total_containers > 0 && pod.ready_containers == 0
        && helpers.is_empty()
    {
        helpers.push(DebugHelper {
            severity: Severity::Info,
            title: "Pod is running but not ready".to_string(),
            detail: "No container reports ready yet".to_string(),
            commands: vec![format!("kubectl describe pod {target}")],
        });
    }

    helpers.sort_by(|left, right| right.severity.cmp(&left.severity));
    helpers
}

#[cfg(test)]
mod tests {
    use super::analyze_pod_issues;
    use crate::model::{ContainerInfo, EventInfo, PodInfo, Severity};

    fn pod_with(container: ContainerInfo, phase: &str) -> PodInfo {
        PodInfo {
            namespace: "prod".to_string(),
            name: "api-0".to_string(),
            phase: phase.to_string(),
            total_containers: 1,
            containers: vec![container],
            ..PodInfo::default()
        }
    }

    #[test]
    fn crash_loop_with_oom_reports_both() {
        let pod = pod_with(
            ContainerInfo {
                name: "api".to_string(),
                state: "CrashLoopBackOff".to_string(),
                restarts: 9,
                last_termination_reason: Some("OOMKilled".to_string()),
                last_exit_code: Some(137),
                ..ContainerInfo::default()
            },
            "Running",
        );

        let helpers = analyze_pod_issues(&pod, &[]);
        let titles = helpers
            .iter()
            .map(|helper| helper.title.as_str())
            .collect::<Vec<_>>();

        assert_eq!(titles, vec!["api is crash looping", "api was OOMKilled"]);
        assert!(helpers[0].commands[0].contains("--previous"));
    }

    #[test]
    fn pending_pod_uses_failed_scheduling_event() {
        let pod = pod_with(
            ContainerInfo {
                name: "api".to_string(),
                state: "Waiting".to_string(),
                ..ContainerInfo::default()
            },
            "Pending",
        );
        let events = vec![EventInfo {
            type_: "Warning".to_string(),
            reason: "FailedScheduling".to_string(),
            message: "0/3 nodes are available: insufficient cpu".to_string(),
            count: 4,
            ..EventInfo::default()
        }];

        let helpers = analyze_pod_issues(&pod, &events);

        assert_eq!(helpers[0].severity, Severity::Critical);
        assert_eq!(helpers[0].title, "Pod cannot be scheduled");
        assert!(helpers[0].detail.contains("insufficient cpu"));
    }

    #[test]
    fn probe_failures_are_counted() {
        let pod = pod_with(
            ContainerInfo {
                name: "api".to_string(),
                state: "Running".to_string(),
                ready: false,
                ..ContainerInfo::default()
            },
            "Running",
        );
        let events = vec![EventInfo {
            reason: "Unhealthy".to_string(),
            message: "Readiness probe failed: HTTP probe failed with statuscode: 503".to_string(),
            count: 3,
            ..EventInfo::default()
        }];

        let helpers = analyze_pod_issues(&pod, &events);

        assert_eq!(helpers.len(), 1);
        assert_eq!(helpers[0].title, "Readiness probe failing (3x)");
    }

    #[test]
    fn healthy_pod_has_no_helpers() {
        let mut pod = pod_with(
            ContainerInfo {
                name: "api".to_string(),
                state: "Running".to_string(),
                ready: true,
                ..ContainerInfo::default()
            },
            "Running",
        );
        pod.ready_containers = 1;

        assert!(analyze_pod_issues(&pod, &[]).is_empty());
    }
}
