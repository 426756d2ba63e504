//! Multi-region orchestrator
//!
//! Sequences topology builds, the peering connector and the transit hub, and
//! accumulates everything created into a [`RunReport`].

use crate::error::CloudError;
use crate::peering::PeeringConnector;
use crate::progress::{CancelFlag, NoProgress, ProgressEvent, ProgressSink};
use crate::provider::{ControlPlane, NetworkApi};
use crate::record::{CompleteTopology, ProvisionedTopology, RunReport};
use crate::topology::{BuildFailure, BuildStep, TopologyBuilder};
use crate::transit::TransitHubProvisioner;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use vpcflow_core::{Deployment, FlowError};

/// Where a run stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStage {
    Validation,
    Topology(String),
    Peering,
    TransitHub,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStage::Validation => write!(f, "validation"),
            RunStage::Topology(region) => write!(f, "topology ({})", region),
            RunStage::Peering => write!(f, "peering"),
            RunStage::TransitHub => write!(f, "transit hub"),
        }
    }
}

/// A run aborted on an unrecovered error
///
/// `report` lists every identifier created before the abort. Nothing is
/// rolled back.
#[derive(Debug, Error)]
#[error("run failed during {stage}: {error}")]
pub struct RunFailure {
    pub stage: RunStage,
    pub report: RunReport,
    #[source]
    pub error: CloudError,
}

pub struct Orchestrator {
    control: Arc<dyn ControlPlane>,
    progress: Arc<dyn ProgressSink>,
}

impl Orchestrator {
    pub fn new(control: Arc<dyn ControlPlane>) -> Self {
        Self {
            control,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Build every region, connect the configured pair, then provision the hub
    pub async fn run(&self, deployment: &Deployment) -> Result<RunReport, RunFailure> {
        let mut report = RunReport::new(&deployment.name);

        macro_rules! abort {
            ($stage:expr, $error:expr) => {{
                report.finish();
                return Err(RunFailure {
                    stage: $stage,
                    report,
                    error: $error,
                });
            }};
        }

        if let Err(e) = deployment.validate() {
            abort!(RunStage::Validation, config_error(e));
        }

        info!(
            deployment = %deployment.name,
            regions = deployment.regions.len(),
            parallel = deployment.parallel_regions,
            provider = self.control.name(),
            "starting run"
        );

        let mut apis: HashMap<&str, Arc<dyn NetworkApi>> = HashMap::new();
        for spec in &deployment.regions {
            match self.control.region_api(&spec.region).await {
                Ok(api) => {
                    apis.insert(spec.region.as_str(), api);
                }
                Err(e) => abort!(RunStage::Topology(spec.region.clone()), e),
            }
        }

        // 1. リージョンごとのトポロジー構築
        let completed = match self.build_topologies(deployment, &apis, &mut report).await {
            Ok(completed) => completed,
            Err(failure) => abort!(RunStage::Topology(failure.topology.region), failure.error),
        };

        // 2. ピアリング
        let pair = match deployment.peering_pair() {
            Ok(pair) => pair,
            Err(e) => abort!(RunStage::Peering, config_error(e)),
        };
        if let Some((a, b)) = pair
            && let Some(initiator) = completed.get(a.region.as_str())
            && let Some(accepter) = completed.get(b.region.as_str())
            && let Some(initiator_api) = apis.get(a.region.as_str())
            && let Some(accepter_api) = apis.get(b.region.as_str())
        {
            self.progress.emit(ProgressEvent::PeeringStarted {
                initiator: a.region.clone(),
                accepter: b.region.clone(),
            });

            let connector = PeeringConnector::new(
                initiator_api.clone(),
                accepter_api.clone(),
                deployment.waits.peering,
            );
            match connector.connect(initiator, accepter).await {
                Ok(link) => {
                    self.progress.emit(ProgressEvent::PeeringFinished {
                        peering_id: link.peering_id.clone(),
                        routes: link.routes.len(),
                    });
                    report.links.push(link);
                }
                Err(failure) => {
                    report.dangling_peering_id = failure.peering_id;
                    report.dangling_routes = failure.routes;
                    abort!(RunStage::Peering, failure.error);
                }
            }
        }

        // 3. Transit Gateway
        let anchor = match deployment.hub_anchor() {
            Ok(anchor) => anchor,
            Err(e) => abort!(RunStage::TransitHub, config_error(e)),
        };
        if let Some(anchor) = anchor {
            let (Some(topology), Some(api)) = (
                completed.get(anchor.region.as_str()),
                apis.get(anchor.region.as_str()),
            ) else {
                abort!(
                    RunStage::TransitHub,
                    CloudError::InconsistentState(format!(
                        "no complete topology for hub anchor {}",
                        anchor.region
                    ))
                );
            };

            self.progress.emit(ProgressEvent::HubStarted {
                region: anchor.region.clone(),
            });

            let provisioner = TransitHubProvisioner::new(
                api.clone(),
                deployment.hub.clone(),
                deployment.waits.transit_hub,
                deployment.waits.transit_attachment,
            );
            match provisioner.provision(topology).await {
                Ok(hub) => {
                    self.progress.emit(ProgressEvent::HubFinished {
                        hub_id: hub.hub_id.clone(),
                        attachment_id: hub.attachment_id.clone(),
                    });
                    for link in report.links.iter_mut().filter(|l| l.involves(&hub.region)) {
                        link.transit_hub_id = Some(hub.hub_id.clone());
                        link.transit_attachment_id = Some(hub.attachment_id.clone());
                    }
                    report.hub = Some(hub);
                }
                Err(failure) => {
                    report.dangling_hub_id = failure.hub_id;
                    report.dangling_attachment_id = failure.attachment_id;
                    abort!(RunStage::TransitHub, failure.error);
                }
            }
        }

        report.finish();
        info!(deployment = %deployment.name, links = report.links.len(), "run complete");
        Ok(report)
    }

    /// Build all regions, sequentially or concurrently
    ///
    /// Every attempted topology lands in `report`, complete or partial.
    async fn build_topologies<'d>(
        &self,
        deployment: &'d Deployment,
        apis: &HashMap<&str, Arc<dyn NetworkApi>>,
        report: &mut RunReport,
    ) -> Result<HashMap<&'d str, CompleteTopology>, BuildFailure> {
        let cancel = CancelFlag::new();
        let mut builders = Vec::with_capacity(deployment.regions.len());
        for spec in &deployment.regions {
            let Some(api) = apis.get(spec.region.as_str()) else {
                continue;
            };
            builders.push(
                TopologyBuilder::new(api.clone(), spec, &deployment.instance_type)
                    .peer_cidrs(deployment.peer_cidrs(&spec.region))
                    .nat_wait(deployment.waits.nat_gateway)
                    .cancel_flag(cancel.clone())
                    .progress(self.progress.clone()),
            );
        }

        let results = if deployment.parallel_regions {
            // 最初の失敗で兄弟リージョンの後続ステップを止める
            join_all(builders.iter().map(|builder| {
                let cancel = cancel.clone();
                async move {
                    let result = self.build_one(builder).await;
                    if result.is_err() {
                        cancel.cancel();
                    }
                    result
                }
            }))
            .await
        } else {
            let mut results = Vec::with_capacity(builders.len());
            for builder in &builders {
                let result = self.build_one(builder).await;
                let failed = result.is_err();
                results.push(result);
                if failed {
                    break;
                }
            }
            results
        };

        let mut completed = HashMap::new();
        let mut first_failure: Option<BuildFailure> = None;
        for (spec, result) in deployment.regions.iter().zip(results) {
            match result {
                Ok(topology) => match topology.to_complete() {
                    Ok(complete) => {
                        report.topologies.push(topology);
                        completed.insert(spec.region.as_str(), complete);
                    }
                    Err(error) => {
                        report.topologies.push(topology.clone());
                        keep_root_cause(
                            &mut first_failure,
                            BuildFailure {
                                topology,
                                step: BuildStep::Instances,
                                error,
                            },
                        );
                    }
                },
                Err(failure) => {
                    report.topologies.push(failure.topology.clone());
                    keep_root_cause(&mut first_failure, failure);
                }
            }
        }

        match first_failure {
            Some(failure) => Err(failure),
            None => Ok(completed),
        }
    }

    async fn build_one(
        &self,
        builder: &TopologyBuilder<'_>,
    ) -> Result<ProvisionedTopology, BuildFailure> {
        self.progress.emit(ProgressEvent::RegionStarted {
            region: builder.region().to_string(),
        });
        let result = builder.build().await;
        match &result {
            Ok(topology) => self.progress.emit(ProgressEvent::RegionFinished {
                region: topology.region.clone(),
            }),
            Err(failure) => warn!(
                region = %failure.topology.region,
                step = %failure.step,
                error = %failure.error,
                "region build failed"
            ),
        }
        result
    }
}

/// キャンセルは二次的な失敗なので、根本原因を優先する
fn keep_root_cause(current: &mut Option<BuildFailure>, failure: BuildFailure) {
    let replace = match current {
        None => true,
        Some(existing) => {
            matches!(existing.error, CloudError::Cancelled(_))
                && !matches!(failure.error, CloudError::Cancelled(_))
        }
    };
    if replace {
        *current = Some(failure);
    }
}

fn config_error(error: FlowError) -> CloudError {
    CloudError::InvalidConfig(error.to_string())
}
