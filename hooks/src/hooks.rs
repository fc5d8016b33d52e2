//! Hook registration and dispatch.
//!
//! The orchestrator calls in at a [`HookPoint`]; every action registered for
//! that point runs in registration order against the resolved context.

use chrono::{DateTime, Utc};
use fwdeploy_common::{CompressionRun, HookPoint};
use serde::Serialize;

use crate::compress::AssetCompressor;
use crate::config::HookContext;
use crate::readiness::{GateReport, Probe, ReadinessGate, TcpProbe};

/// Work a hook point can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookAction {
    CompressAssets,
    AwaitDevice,
}

/// Ordered mapping of hook points to actions.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    entries: Vec<(HookPoint, HookAction)>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compression before packaging and before the filesystem upload; the
    /// readiness wait after compression on the upload path.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(HookPoint::BeforePackage, HookAction::CompressAssets);
        registry.register(HookPoint::BeforeSecondaryDeploy, HookAction::CompressAssets);
        registry.register(HookPoint::BeforeSecondaryDeploy, HookAction::AwaitDevice);
        registry
    }

    pub fn register(&mut self, point: HookPoint, action: HookAction) {
        self.entries.push((point, action));
    }

    pub fn actions_for(&self, point: HookPoint) -> Vec<HookAction> {
        self.entries
            .iter()
            .filter(|(p, _)| *p == point)
            .map(|(_, action)| *action)
            .collect()
    }
}

/// Result of one action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionResult {
    CompressAssets { run: CompressionRun },
    /// `gate` is absent when the upload protocol is not network OTA.
    AwaitDevice { gate: Option<GateReport> },
}

/// Everything that happened at one hook point.
#[derive(Debug, Clone, Serialize)]
pub struct HookReport {
    pub point: HookPoint,
    pub started_at: DateTime<Utc>,
    pub results: Vec<ActionResult>,
}

/// Runs registered actions with a given readiness gate.
pub struct HookRunner<P = TcpProbe> {
    registry: HookRegistry,
    gate: ReadinessGate<P>,
}

impl HookRunner<TcpProbe> {
    pub fn standard() -> Self {
        Self::new(HookRegistry::standard(), ReadinessGate::new())
    }
}

impl<P: Probe> HookRunner<P> {
    pub fn new(registry: HookRegistry, gate: ReadinessGate<P>) -> Self {
        Self { registry, gate }
    }

    pub fn gate(&self) -> &ReadinessGate<P> {
        &self.gate
    }

    pub async fn dispatch(&self, point: HookPoint, ctx: &HookContext) -> HookReport {
        let started_at = Utc::now();
        let actions = self.registry.actions_for(point);
        tracing::info!(point = %point, actions = actions.len(), "Running hooks");

        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            let result = match action {
                HookAction::CompressAssets => ActionResult::CompressAssets {
                    run: AssetCompressor::from_context(ctx).run(),
                },
                HookAction::AwaitDevice => ActionResult::AwaitDevice {
                    gate: self.gate.wait(&ctx.target).await,
                },
            };
            results.push(result);
        }

        HookReport {
            point,
            started_at,
            results,
        }
    }
}
