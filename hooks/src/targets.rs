//! Declarative target plan handed to the orchestrator.
//!
//! The orchestrator owns scheduling. This only states the ordering edges,
//! the `upload_all` alias, and which targets carry a hook point.

use std::collections::HashSet;

use fwdeploy_common::{BuildTarget, HookPoint};
use serde::Serialize;

use crate::error::{Error, Result};

/// Name of the combined upload alias.
pub const UPLOAD_ALL: &str = "upload_all";

/// A named group of targets run in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alias {
    pub name: String,
    pub steps: Vec<BuildTarget>,
    /// Run even when the orchestrator considers every step up to date.
    pub always_build: bool,
}

/// Resolved order for one target or alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub name: String,
    pub always_build: bool,
    pub order: Vec<BuildTarget>,
}

#[derive(Debug, Clone, Default)]
pub struct TargetPlan {
    /// `(target, dependency)` pairs.
    depends: Vec<(BuildTarget, BuildTarget)>,
    aliases: Vec<Alias>,
}

impl TargetPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// `uploadfs` after `upload`, and `upload_all` running both.
    pub fn standard() -> Self {
        let mut plan = Self::new();
        plan.depends(BuildTarget::UploadFs, BuildTarget::Upload);
        plan.alias(Alias {
            name: UPLOAD_ALL.to_string(),
            steps: vec![BuildTarget::Upload, BuildTarget::UploadFs],
            always_build: true,
        });
        plan
    }

    pub fn depends(&mut self, target: BuildTarget, on: BuildTarget) {
        if !self.depends.contains(&(target, on)) {
            self.depends.push((target, on));
        }
    }

    pub fn alias(&mut self, alias: Alias) {
        self.aliases.retain(|a| a.name != alias.name);
        self.aliases.push(alias);
    }

    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }

    pub fn find_alias(&self, name: &str) -> Option<&Alias> {
        self.aliases.iter().find(|a| a.name == name)
    }

    pub fn dependencies_of(&self, target: BuildTarget) -> Vec<BuildTarget> {
        self.depends
            .iter()
            .filter(|(t, _)| *t == target)
            .map(|(_, dep)| *dep)
            .collect()
    }

    /// Expand an alias or target name into an order where every dependency
    /// precedes its dependent and nothing runs twice.
    pub fn execution_order(&self, name: &str) -> Result<Plan> {
        let (roots, always_build) = match self.find_alias(name) {
            Some(alias) => (alias.steps.clone(), alias.always_build),
            None => (vec![name.parse::<BuildTarget>()?], false),
        };

        let mut order = Vec::new();
        let mut visiting = HashSet::new();
        for root in roots {
            self.visit(root, &mut visiting, &mut order)?;
        }

        Ok(Plan {
            name: name.to_string(),
            always_build,
            order,
        })
    }

    fn visit(
        &self,
        target: BuildTarget,
        visiting: &mut HashSet<BuildTarget>,
        order: &mut Vec<BuildTarget>,
    ) -> Result<()> {
        if order.contains(&target) {
            return Ok(());
        }
        if !visiting.insert(target) {
            return Err(Error::DependencyCycle(target.to_string()));
        }
        for dep in self.dependencies_of(target) {
            self.visit(dep, visiting, order)?;
        }
        visiting.remove(&target);
        order.push(target);
        Ok(())
    }

    /// Hook point that runs as a pre-action of `target`, if any.
    pub fn hook_point_for(target: BuildTarget) -> Option<HookPoint> {
        match target {
            BuildTarget::BuildFs => Some(HookPoint::BeforePackage),
            BuildTarget::UploadFs => Some(HookPoint::BeforeSecondaryDeploy),
            BuildTarget::Upload => None,
        }
    }
}
