use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{ConfigMap, Event, Namespace, Node, Pod, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{DeleteParams, ListParams, LogParams, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client, Config, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use tracing::{debug, warn};

use super::Repository;
use super::convert::{
    config_map_data, config_map_info, copied_config_map, copied_secret, cronjob_workload,
    daemonset_workload, deployment_workload, event_info, gateway_info, ingress_info, job_workload,
    manifest, namespace_info, node_info, parse_pod_metrics, parse_usage, pod_info, pod_workload,
    secret_data, secret_info, selector_query, service_info, service_selects, statefulset_workload,
    virtual_service_info,
};
use super::describe::render_pod_description;
use crate::error::{RepoError, RepoResult};
use crate::model::{
    ConfigMapData, ConfigMapInfo, EventInfo, GatewayInfo, LogQuery, NamespaceInfo, NodeInfo,
    OwnerLink, PodInfo, PodMetrics, RelatedResources, ResourceType, SecretData, SecretInfo,
    ServiceInfo, VirtualServiceInfo, WorkloadInfo, WorkloadRef,
};

const ISTIO_GROUP: &str = "networking.istio.io";

#[derive(Clone)]
pub struct KubeRepository {
    client: Client,
    context: String,
    cluster: String,
    default_namespace: String,
}

impl KubeRepository {
    pub async fn connect() -> RepoResult<Self> {
        let kubeconfig = Kubeconfig::read().ok();
        let context = kubeconfig
            .as_ref()
            .and_then(|config| config.current_context.clone())
            .unwrap_or_else(|| "in-cluster".to_string());

        let config = match kubeconfig {
            Some(kubeconfig) => {
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|error| {
                        RepoError::Fatal(format!("failed to load kubeconfig: {error}"))
                    })?
            }
            None => Config::infer().await.map_err(|error| {
                RepoError::Fatal(format!("failed to infer Kubernetes configuration: {error}"))
            })?,
        };

        let cluster = config.cluster_url.to_string();
        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config).map_err(|error| {
            RepoError::Fatal(format!("failed to initialize Kubernetes client: {error}"))
        })?;

        Ok(Self {
            client,
            context,
            cluster,
            default_namespace,
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    fn namespaced<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn list<K>(api: &Api<K>) -> RepoResult<Vec<K>>
    where
        K: Clone + DeserializeOwned + Debug,
    {
        Ok(api.list(&list_params()).await?.items)
    }

    async fn pods_matching(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> RepoResult<Vec<PodInfo>> {
        if selector.is_empty() {
            return Ok(Vec::new());
        }
        let pods: Api<Pod> = self.namespaced(namespace);
        let params = list_params().labels(&selector_query(selector));
        let list = pods.list(&params).await?;
        Ok(list.items.iter().map(pod_info).collect())
    }

    async fn cronjob_pods(&self, namespace: &str, name: &str) -> RepoResult<Vec<PodInfo>> {
        let jobs: Api<Job> = self.namespaced(namespace);
        let owned = Self::list(&jobs)
            .await?
            .into_iter()
            .filter(|job| {
                job.owner_references()
                    .iter()
                    .any(|owner| owner.kind == "CronJob" && owner.name == name)
            })
            .map(|job| job.name_any())
            .collect::<Vec<_>>();
        if owned.is_empty() {
            return Ok(Vec::new());
        }

        let pods: Api<Pod> = self.namespaced(namespace);
        let params = list_params().labels(&format!("job-name in ({})", owned.join(",")));
        let list = pods.list(&params).await?;
        Ok(list.items.iter().map(pod_info).collect())
    }

    async fn node_usage(&self, name: &str) -> Option<crate::model::Usage> {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "NodeMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "nodes");
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);
        match api.get(name).await {
            Ok(metrics) => Some(parse_usage(&metrics.data["usage"])),
            Err(error) => {
                debug!("node metrics unavailable for {name}: {error}");
                None
            }
        }
    }

    async fn owner_chain(&self, pod: &PodInfo) -> Vec<OwnerLink> {
        let mut chain = Vec::new();
        for owner in &pod.owners {
            match owner.kind.as_str() {
                "ReplicaSet" => {
                    let replica_sets: Api<ReplicaSet> = self.namespaced(&pod.namespace);
                    match replica_sets.get(&owner.name).await {
                        Ok(replica_set) => {
                            chain.push(OwnerLink {
                                kind: "ReplicaSet".to_string(),
                                name: owner.name.clone(),
                                replicas: replica_set.spec.as_ref().and_then(|spec| spec.replicas),
                                ready_replicas: replica_set
                                    .status
                                    .as_ref()
                                    .and_then(|status| status.ready_replicas),
                            });
                            for parent in replica_set.owner_references() {
                                chain.push(self.owner_link(&pod.namespace, &parent.kind, &parent.name).await);
                            }
                        }
                        Err(error) => {
                            debug!("replicaset {} lookup failed: {error}", owner.name);
                            chain.push(OwnerLink {
                                kind: owner.kind.clone(),
                                name: owner.name.clone(),
                                ..OwnerLink::default()
                            });
                        }
                    }
                }
                "Job" => {
                    chain.push(self.owner_link(&pod.namespace, "Job", &owner.name).await);
                    let jobs: Api<Job> = self.namespaced(&pod.namespace);
                    if let Ok(job) = jobs.get(&owner.name).await {
                        for parent in job.owner_references() {
                            chain.push(OwnerLink {
                                kind: parent.kind.clone(),
                                name: parent.name.clone(),
                                ..OwnerLink::default()
                            });
                        }
                    }
                }
                kind => chain.push(self.owner_link(&pod.namespace, kind, &owner.name).await),
            }
        }
        chain
    }

    async fn owner_link(&self, namespace: &str, kind: &str, name: &str) -> OwnerLink {
        let workload = match kind {
            "Deployment" => {
                let api: Api<Deployment> = self.namespaced(namespace);
                api.get(name).await.ok().map(|value| deployment_workload(&value))
            }
            "StatefulSet" => {
                let api: Api<StatefulSet> = self.namespaced(namespace);
                api.get(name).await.ok().map(|value| statefulset_workload(&value))
            }
            "DaemonSet" => {
                let api: Api<DaemonSet> = self.namespaced(namespace);
                api.get(name).await.ok().map(|value| daemonset_workload(&value))
            }
            _ => None,
        };

        OwnerLink {
            kind: kind.to_string(),
            name: name.to_string(),
            replicas: workload.as_ref().and_then(|workload| workload.replicas),
            ready_replicas: workload.map(|workload| workload.ready_replicas),
        }
    }

    async fn istio_resources(
        &self,
        namespace: &str,
        services: &[String],
    ) -> (Vec<VirtualServiceInfo>, Vec<GatewayInfo>) {
        let group = match kube::discovery::group(&self.client, ISTIO_GROUP).await {
            Ok(group) => group,
            Err(error) => {
                debug!("istio discovery skipped: {error}");
                return (Vec::new(), Vec::new());
            }
        };

        let mut virtual_services = Vec::new();
        if let Some((resource, _)) = group.recommended_kind("VirtualService") {
            let api: Api<DynamicObject> =
                Api::namespaced_with(self.client.clone(), namespace, &resource);
            match api.list(&list_params()).await {
                Ok(list) => {
                    for item in list.items {
                        let name = item.name_any();
                        if let Some(info) =
                            virtual_service_info(&name, &item.data["spec"], services, namespace)
                        {
                            virtual_services.push(info);
                        }
                    }
                }
                Err(error) => debug!("virtualservice list failed: {error}"),
            }
        }

        let mut gateways = Vec::new();
        if let Some((resource, _)) = group.recommended_kind("Gateway") {
            let references = virtual_services
                .iter()
                .flat_map(|service| service.gateways.iter())
                .filter(|gateway| gateway.as_str() != "mesh")
                .map(|gateway| match gateway.split_once('/') {
                    Some((gateway_namespace, name)) => {
                        (gateway_namespace.to_string(), name.to_string())
                    }
                    None => (namespace.to_string(), gateway.clone()),
                })
                .collect::<BTreeSet<_>>();
            for (gateway_namespace, name) in references {
                let api: Api<DynamicObject> =
                    Api::namespaced_with(self.client.clone(), &gateway_namespace, &resource);
                match api.get(&name).await {
                    Ok(gateway) => {
                        gateways.push(gateway_info(&gateway_namespace, &name, &gateway.data["spec"]))
                    }
                    Err(error) => debug!("gateway {gateway_namespace}/{name} lookup failed: {error}"),
                }
            }
        }

        (virtual_services, gateways)
    }
}

#[async_trait]
impl Repository for KubeRepository {
    async fn list_namespaces(&self) -> RepoResult<Vec<NamespaceInfo>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(Self::list(&api).await?.iter().map(namespace_info).collect())
    }

    async fn list_workloads(
        &self,
        namespace: &str,
        kind: ResourceType,
    ) -> RepoResult<Vec<WorkloadInfo>> {
        let workloads = match kind {
            ResourceType::Deployments => Self::list(&self.namespaced::<Deployment>(namespace))
                .await?
                .iter()
                .map(deployment_workload)
                .collect(),
            ResourceType::StatefulSets => Self::list(&self.namespaced::<StatefulSet>(namespace))
                .await?
                .iter()
                .map(statefulset_workload)
                .collect(),
            ResourceType::DaemonSets => Self::list(&self.namespaced::<DaemonSet>(namespace))
                .await?
                .iter()
                .map(daemonset_workload)
                .collect(),
            ResourceType::Jobs => Self::list(&self.namespaced::<Job>(namespace))
                .await?
                .iter()
                .map(job_workload)
                .collect(),
            ResourceType::CronJobs => Self::list(&self.namespaced::<CronJob>(namespace))
                .await?
                .iter()
                .map(cronjob_workload)
                .collect(),
            ResourceType::Pods => self
                .list_all_pods(namespace)
                .await?
                .iter()
                .map(pod_workload)
                .collect(),
        };
        Ok(workloads)
    }

    async fn get_workload_pods(&self, workload: &WorkloadRef) -> RepoResult<Vec<PodInfo>> {
        let namespace = workload.namespace.as_str();
        let name = workload.name.as_str();
        let selector = match workload.kind {
            ResourceType::Deployments => {
                deployment_workload(&self.namespaced::<Deployment>(namespace).get(name).await?)
                    .selector
            }
            ResourceType::StatefulSets => {
                statefulset_workload(&self.namespaced::<StatefulSet>(namespace).get(name).await?)
                    .selector
            }
            ResourceType::DaemonSets => {
                daemonset_workload(&self.namespaced::<DaemonSet>(namespace).get(name).await?)
                    .selector
            }
            ResourceType::Jobs => {
                job_workload(&self.namespaced::<Job>(namespace).get(name).await?).selector
            }
            ResourceType::CronJobs => return self.cronjob_pods(namespace, name).await,
            ResourceType::Pods => return Ok(vec![self.get_pod(namespace, name).await?]),
        };
        self.pods_matching(namespace, &selector).await
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> RepoResult<PodInfo> {
        let mut pod = self.namespaced::<Pod>(namespace).get(name).await?;
        let mut info = pod_info(&pod);
        pod.metadata.managed_fields = None;
        info.manifest = manifest(&pod);
        Ok(info)
    }

    async fn list_all_pods(&self, namespace: &str) -> RepoResult<Vec<PodInfo>> {
        let pods = Self::list(&self.namespaced::<Pod>(namespace)).await?;
        Ok(pods.iter().map(pod_info).collect())
    }

    async fn list_config_maps(&self, namespace: &str) -> RepoResult<Vec<ConfigMapInfo>> {
        let config_maps = Self::list(&self.namespaced::<ConfigMap>(namespace)).await?;
        Ok(config_maps.iter().map(config_map_info).collect())
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> RepoResult<ConfigMapData> {
        let config_map = self.namespaced::<ConfigMap>(namespace).get(name).await?;
        Ok(config_map_data(&config_map))
    }

    async fn list_secrets(&self, namespace: &str) -> RepoResult<Vec<SecretInfo>> {
        let secrets = Self::list(&self.namespaced::<Secret>(namespace)).await?;
        Ok(secrets.iter().map(secret_info).collect())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> RepoResult<SecretData> {
        let secret = self.namespaced::<Secret>(namespace).get(name).await?;
        Ok(secret_data(&secret))
    }

    async fn list_nodes(&self) -> RepoResult<Vec<NodeInfo>> {
        let api: Api<Node> = Api::all(self.client.clone());
        Ok(Self::list(&api).await?.iter().map(node_info).collect())
    }

    async fn get_node(&self, name: &str) -> RepoResult<NodeInfo> {
        let api: Api<Node> = Api::all(self.client.clone());
        let mut info = node_info(&api.get(name).await?);
        info.usage = self.node_usage(name).await;
        Ok(info)
    }

    async fn list_pods_by_node(&self, node: &str) -> RepoResult<Vec<PodInfo>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let params = list_params().fields(&format!("spec.nodeName={node}"));
        let list = api.list(&params).await?;
        Ok(list.items.iter().map(pod_info).collect())
    }

    async fn get_pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        query: &LogQuery,
    ) -> RepoResult<String> {
        let params = LogParams {
            container: query.container.clone(),
            previous: query.previous,
            tail_lines: Some(query.tail_lines),
            timestamps: query.timestamps,
            ..LogParams::default()
        };
        Ok(self.namespaced::<Pod>(namespace).logs(pod, &params).await?)
    }

    async fn get_all_container_logs(
        &self,
        namespace: &str,
        pod: &str,
        tail_lines: i64,
    ) -> RepoResult<String> {
        let info = pod_info(&self.namespaced::<Pod>(namespace).get(pod).await?);
        if info.containers.len() == 1 {
            let query = LogQuery {
                tail_lines,
                ..LogQuery::current(None)
            };
            return self.get_pod_logs(namespace, pod, &query).await;
        }

        let fetches = info.containers.iter().map(|container| {
            let query = LogQuery {
                tail_lines,
                ..LogQuery::current(Some(container.name.clone()))
            };
            async move {
                let logs = self.get_pod_logs(namespace, pod, &query).await;
                (container.name.clone(), logs)
            }
        });

        let mut lines = Vec::new();
        for (container, logs) in join_all(fetches).await {
            match logs {
                Ok(logs) => lines.extend(logs.lines().map(|line| format!("[{container}] {line}"))),
                Err(error) => lines.push(format!("[{container}] <logs unavailable: {error}>")),
            }
        }
        Ok(lines.join("\n"))
    }

    async fn get_previous_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        tail_lines: i64,
    ) -> RepoResult<String> {
        let query = LogQuery {
            container: Some(container.to_string()),
            tail_lines,
            previous: true,
            timestamps: true,
        };
        self.get_pod_logs(namespace, pod, &query).await
    }

    async fn get_pod_events(&self, namespace: &str, pod: &str) -> RepoResult<Vec<EventInfo>> {
        let api: Api<Event> = self.namespaced(namespace);
        let params = list_params().fields(&format!("involvedObject.name={pod}"));
        let list = api.list(&params).await?;
        let mut events = list
            .items
            .iter()
            .filter(|event| event.involved_object.kind.as_deref().unwrap_or("Pod") == "Pod")
            .map(event_info)
            .collect::<Vec<_>>();
        events.sort_by(|left, right| right.last_seen.cmp(&left.last_seen));
        Ok(events)
    }

    async fn get_pod_metrics(&self, namespace: &str, pod: &str) -> RepoResult<Option<PodMetrics>> {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "PodMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "pods");
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &resource);
        match api.get(pod).await {
            Ok(metrics) => Ok(Some(parse_pod_metrics(&metrics.data))),
            Err(error) => {
                let error = RepoError::from(error);
                if error.is_soft() {
                    debug!("pod metrics unavailable for {namespace}/{pod}: {error}");
                    Ok(None)
                } else {
                    Err(error)
                }
            }
        }
    }

    async fn get_related_resources(&self, pod: &PodInfo) -> RepoResult<RelatedResources> {
        let namespace = pod.namespace.as_str();
        let services = Self::list(&self.namespaced::<Service>(namespace))
            .await?
            .into_iter()
            .filter(|service| service_selects(service, &pod.labels))
            .map(|service| service_info(&service))
            .collect::<Vec<ServiceInfo>>();
        let service_names = services
            .iter()
            .map(|service| service.name.clone())
            .collect::<Vec<_>>();

        let ingresses = match Self::list(&self.namespaced::<Ingress>(namespace)).await {
            Ok(ingresses) => ingresses
                .iter()
                .filter_map(|ingress| serde_json::to_value(ingress).ok())
                .filter_map(|value| ingress_info(&value, &service_names))
                .collect(),
            Err(error) => {
                warn!("ingress lookup failed in {namespace}: {error}");
                Vec::new()
            }
        };

        let (virtual_services, gateways) = if service_names.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            self.istio_resources(namespace, &service_names).await
        };

        Ok(RelatedResources {
            services,
            ingresses,
            virtual_services,
            gateways,
            config_maps: pod.config_map_refs.clone(),
            secrets: pod.secret_refs.clone(),
            owners: self.owner_chain(pod).await,
        })
    }

    async fn describe_pod(&self, namespace: &str, name: &str) -> RepoResult<String> {
        let pod = self.get_pod(namespace, name).await?;
        let events = self.get_pod_events(namespace, name).await.unwrap_or_default();
        Ok(render_pod_description(&pod, &events, Utc::now()))
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> RepoResult<()> {
        self.namespaced::<Pod>(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }

    async fn scale_workload(
        &self,
        namespace: &str,
        name: &str,
        kind: ResourceType,
        replicas: i32,
    ) -> RepoResult<()> {
        if replicas < 0 {
            return Err(RepoError::Invalid("replicas must be >= 0".to_string()));
        }
        let patch = serde_json::json!({ "spec": { "replicas": replicas } });
        let params = PatchParams::default();

        match kind {
            ResourceType::Deployments => {
                self.namespaced::<Deployment>(namespace)
                    .patch(name, &params, &Patch::Merge(&patch))
                    .await?;
            }
            ResourceType::StatefulSets => {
                self.namespaced::<StatefulSet>(namespace)
                    .patch(name, &params, &Patch::Merge(&patch))
                    .await?;
            }
            other => {
                return Err(RepoError::Invalid(format!(
                    "scale is not supported for {}",
                    other.title()
                )));
            }
        }

        Ok(())
    }

    async fn restart_workload(
        &self,
        namespace: &str,
        name: &str,
        kind: ResourceType,
    ) -> RepoResult<()> {
        let patch = serde_json::json!({
            "spec": {
                "template": {
                    "metadata": {
                        "annotations": {
                            "kubectl.kubernetes.io/restartedAt": Utc::now().to_rfc3339()
                        }
                    }
                }
            }
        });
        let params = PatchParams::default();

        match kind {
            ResourceType::Deployments => {
                self.namespaced::<Deployment>(namespace)
                    .patch(name, &params, &Patch::Merge(&patch))
                    .await?;
            }
            ResourceType::StatefulSets => {
                self.namespaced::<StatefulSet>(namespace)
                    .patch(name, &params, &Patch::Merge(&patch))
                    .await?;
            }
            ResourceType::DaemonSets => {
                self.namespaced::<DaemonSet>(namespace)
                    .patch(name, &params, &Patch::Merge(&patch))
                    .await?;
            }
            other => {
                return Err(RepoError::Invalid(format!(
                    "restart is not supported for {}",
                    other.title()
                )));
            }
        }

        Ok(())
    }

    async fn copy_config_map_to_namespace(
        &self,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
    ) -> RepoResult<()> {
        let source = self.namespaced::<ConfigMap>(source_namespace).get(name).await?;
        let copy = copied_config_map(&source, target_namespace);
        create_or_replace(&self.namespaced(target_namespace), name, copy).await
    }

    async fn copy_secret_to_namespace(
        &self,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
    ) -> RepoResult<()> {
        let source = self.namespaced::<Secret>(source_namespace).get(name).await?;
        let copy = copied_secret(&source, target_namespace);
        create_or_replace(&self.namespaced(target_namespace), name, copy).await
    }

    async fn force_delete_namespace(&self, name: &str) -> RepoResult<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let patch = serde_json::json!({ "metadata": { "finalizers": null } });
        ignore_not_found(
            api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
                .await
                .map(|_| ()),
        )?;

        match api.get(name).await {
            Ok(mut namespace) => {
                if let Some(spec) = namespace.spec.as_mut() {
                    spec.finalizers = Some(Vec::new());
                }
                ignore_not_found(
                    api.replace_subresource("finalize", name, &PostParams::default(), &namespace)
                        .await
                        .map(|_| ()),
                )?;
            }
            Err(error) => return ignore_not_found(Err(error)),
        }

        ignore_not_found(
            api.delete(name, &DeleteParams::default())
                .await
                .map(|_| ()),
        )
    }
}

async fn create_or_replace<K>(api: &Api<K>, name: &str, object: K) -> RepoResult<()>
where
    K: Resource + Clone + DeserializeOwned + Serialize + Debug,
{
    match api.create(&PostParams::default(), &object).await {
        Ok(_) => Ok(()),
        Err(error) => match RepoError::from(error) {
            RepoError::Conflict(_) => {
                let existing = api.get(name).await?;
                let mut replacement = object;
                replacement.meta_mut().resource_version = existing.meta().resource_version.clone();
                api.replace(name, &PostParams::default(), &replacement).await?;
                Ok(())
            }
            other => Err(other),
        },
    }
}

fn ignore_not_found(result: Result<(), kube::Error>) -> RepoResult<()> {
    match result.map_err(RepoError::from) {
        Err(RepoError::NotFound(_)) => Ok(()),
        other => other,
    }
}

fn list_params() -> ListParams {
    ListParams::default().limit(500)
}
