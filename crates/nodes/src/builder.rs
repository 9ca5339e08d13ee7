//! The runtime construction sink.
//!
//! [`OfficeFloorBuilder`] is what a compile drives once the tree is fully
//! wired. Nodes are passed by qualified name; leaf providers are passed as
//! the instances sourcing resolved, so the runtime never looks them up
//! again. [`RecordingBuilder`] keeps every call as a [`BuildCall`].

use std::fmt;
use std::rc::Rc;

use graph::{
    AdministrationSource, GovernanceSource, ManagedObjectPoolSource, ManagedObjectScope,
    ManagedObjectSource, PropertyList, TeamSource,
};
use serde::{Deserialize, Serialize};

/// Receives the deterministic construction calls of a compiled OfficeFloor.
///
/// Every method may fail; the compile reports the failure against the node
/// being built and carries on with the rest of the tree.
pub trait OfficeFloorBuilder {
    fn add_team(
        &mut self,
        name: &str,
        source: Rc<dyn TeamSource>,
        size: usize,
        properties: &PropertyList,
    ) -> anyhow::Result<()>;

    fn add_managed_object_pool(
        &mut self,
        name: &str,
        source: Rc<dyn ManagedObjectPoolSource>,
        properties: &PropertyList,
    ) -> anyhow::Result<()>;

    fn add_managed_object_source(
        &mut self,
        name: &str,
        source: Rc<dyn ManagedObjectSource>,
        properties: &PropertyList,
        timeout: Option<u64>,
    ) -> anyhow::Result<()>;

    fn set_managing_office(&mut self, managed_object_source: &str, office: &str) -> anyhow::Result<()>;

    fn set_managed_object_pool(&mut self, managed_object_source: &str, pool: &str) -> anyhow::Result<()>;

    fn start_before(&mut self, managed_object_source: &str, other: &str) -> anyhow::Result<()>;

    fn start_after(&mut self, managed_object_source: &str, other: &str) -> anyhow::Result<()>;

    fn link_managed_object_flow(
        &mut self,
        managed_object_source: &str,
        flow: &str,
        argument_type: Option<&str>,
        function: &str,
    ) -> anyhow::Result<()>;

    fn link_managed_object_team(
        &mut self,
        managed_object_source: &str,
        team_name: &str,
        team: &str,
    ) -> anyhow::Result<()>;

    fn add_managed_object(
        &mut self,
        name: &str,
        managed_object_source: &str,
        scope: ManagedObjectScope,
    ) -> anyhow::Result<()>;

    fn link_dependency(&mut self, managed_object: &str, dependency: &str, target: &str) -> anyhow::Result<()>;

    fn add_office(&mut self, name: &str) -> anyhow::Result<()>;

    /// Assigns OfficeFloor `team` to the office's `office_team`.
    fn register_team(&mut self, office: &str, office_team: &str, team: &str) -> anyhow::Result<()>;

    fn add_function(
        &mut self,
        office: &str,
        function: &str,
        namespace: &str,
        function_type: &str,
    ) -> anyhow::Result<()>;

    fn set_responsible_team(&mut self, office: &str, function: &str, team: &str) -> anyhow::Result<()>;

    fn link_object(
        &mut self,
        office: &str,
        function: &str,
        object: &str,
        managed_object: &str,
    ) -> anyhow::Result<()>;

    fn link_flow(
        &mut self,
        office: &str,
        function: &str,
        flow: &str,
        argument_type: Option<&str>,
        target: &str,
        spawn: bool,
    ) -> anyhow::Result<()>;

    fn add_administration(
        &mut self,
        office: &str,
        name: &str,
        source: Rc<dyn AdministrationSource>,
        properties: &PropertyList,
        administered: &[String],
    ) -> anyhow::Result<()>;

    fn add_governance(
        &mut self,
        office: &str,
        name: &str,
        source: Rc<dyn GovernanceSource>,
        properties: &PropertyList,
        governed: &[String],
    ) -> anyhow::Result<()>;
}

/// One recorded builder call. Provider instances are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum BuildCall {
    AddTeam {
        name: String,
        size: usize,
        properties: PropertyList,
    },
    AddManagedObjectPool {
        name: String,
        properties: PropertyList,
    },
    AddManagedObjectSource {
        name: String,
        properties: PropertyList,
        timeout: Option<u64>,
    },
    SetManagingOffice {
        managed_object_source: String,
        office: String,
    },
    SetManagedObjectPool {
        managed_object_source: String,
        pool: String,
    },
    StartBefore {
        managed_object_source: String,
        other: String,
    },
    StartAfter {
        managed_object_source: String,
        other: String,
    },
    LinkManagedObjectFlow {
        managed_object_source: String,
        flow: String,
        argument_type: Option<String>,
        function: String,
    },
    LinkManagedObjectTeam {
        managed_object_source: String,
        team_name: String,
        team: String,
    },
    AddManagedObject {
        name: String,
        managed_object_source: String,
        scope: ManagedObjectScope,
    },
    LinkDependency {
        managed_object: String,
        dependency: String,
        target: String,
    },
    AddOffice {
        name: String,
    },
    RegisterTeam {
        office: String,
        office_team: String,
        team: String,
    },
    AddFunction {
        office: String,
        function: String,
        namespace: String,
        function_type: String,
    },
    SetResponsibleTeam {
        office: String,
        function: String,
        team: String,
    },
    LinkObject {
        office: String,
        function: String,
        object: String,
        managed_object: String,
    },
    LinkFlow {
        office: String,
        function: String,
        flow: String,
        argument_type: Option<String>,
        target: String,
        spawn: bool,
    },
    AddAdministration {
        office: String,
        name: String,
        properties: PropertyList,
        administered: Vec<String>,
    },
    AddGovernance {
        office: String,
        name: String,
        properties: PropertyList,
        governed: Vec<String>,
    },
}

impl fmt::Display for BuildCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

/// Builder that records every call and never fails.
#[derive(Debug, Default)]
pub struct RecordingBuilder {
    calls: Vec<BuildCall>,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[BuildCall] {
        &self.calls
    }

    pub fn into_calls(self) -> Vec<BuildCall> {
        self.calls
    }

    fn record(&mut self, call: BuildCall) -> anyhow::Result<()> {
        self.calls.push(call);
        Ok(())
    }
}

impl OfficeFloorBuilder for RecordingBuilder {
    fn add_team(
        &mut self,
        name: &str,
        _source: Rc<dyn TeamSource>,
        size: usize,
        properties: &PropertyList,
    ) -> anyhow::Result<()> {
        self.record(BuildCall::AddTeam {
            name: name.to_owned(),
            size,
            properties: properties.clone(),
        })
    }

    fn add_managed_object_pool(
        &mut self,
        name: &str,
        _source: Rc<dyn ManagedObjectPoolSource>,
        properties: &PropertyList,
    ) -> anyhow::Result<()> {
        self.record(BuildCall::AddManagedObjectPool {
            name: name.to_owned(),
            properties: properties.clone(),
        })
    }

    fn add_managed_object_source(
        &mut self,
        name: &str,
        _source: Rc<dyn ManagedObjectSource>,
        properties: &PropertyList,
        timeout: Option<u64>,
    ) -> anyhow::Result<()> {
        self.record(BuildCall::AddManagedObjectSource {
            name: name.to_owned(),
            properties: properties.clone(),
            timeout,
        })
    }

    fn set_managing_office(&mut self, managed_object_source: &str, office: &str) -> anyhow::Result<()> {
        self.record(BuildCall::SetManagingOffice {
            managed_object_source: managed_object_source.to_owned(),
            office: office.to_owned(),
        })
    }

    fn set_managed_object_pool(&mut self, managed_object_source: &str, pool: &str) -> anyhow::Result<()> {
        self.record(BuildCall::SetManagedObjectPool {
            managed_object_source: managed_object_source.to_owned(),
            pool: pool.to_owned(),
        })
    }

    fn start_before(&mut self, managed_object_source: &str, other: &str) -> anyhow::Result<()> {
        self.record(BuildCall::StartBefore {
            managed_object_source: managed_object_source.to_owned(),
            other: other.to_owned(),
        })
    }

    fn start_after(&mut self, managed_object_source: &str, other: &str) -> anyhow::Result<()> {
        self.record(BuildCall::StartAfter {
            managed_object_source: managed_object_source.to_owned(),
            other: other.to_owned(),
        })
    }

    fn link_managed_object_flow(
        &mut self,
        managed_object_source: &str,
        flow: &str,
        argument_type: Option<&str>,
        function: &str,
    ) -> anyhow::Result<()> {
        self.record(BuildCall::LinkManagedObjectFlow {
            managed_object_source: managed_object_source.to_owned(),
            flow: flow.to_owned(),
            argument_type: argument_type.map(str::to_owned),
            function: function.to_owned(),
        })
    }

    fn link_managed_object_team(
        &mut self,
        managed_object_source: &str,
        team_name: &str,
        team: &str,
    ) -> anyhow::Result<()> {
        self.record(BuildCall::LinkManagedObjectTeam {
            managed_object_source: managed_object_source.to_owned(),
            team_name: team_name.to_owned(),
            team: team.to_owned(),
        })
    }

    fn add_managed_object(
        &mut self,
        name: &str,
        managed_object_source: &str,
        scope: ManagedObjectScope,
    ) -> anyhow::Result<()> {
        self.record(BuildCall::AddManagedObject {
            name: name.to_owned(),
            managed_object_source: managed_object_source.to_owned(),
            scope,
        })
    }

    fn link_dependency(&mut self, managed_object: &str, dependency: &str, target: &str) -> anyhow::Result<()> {
        self.record(BuildCall::LinkDependency {
            managed_object: managed_object.to_owned(),
            dependency: dependency.to_owned(),
            target: target.to_owned(),
        })
    }

    fn add_office(&mut self, name: &str) -> anyhow::Result<()> {
        self.record(BuildCall::AddOffice { name: name.to_owned() })
    }

    fn register_team(&mut self, office: &str, office_team: &str, team: &str) -> anyhow::Result<()> {
        self.record(BuildCall::RegisterTeam {
            office: office.to_owned(),
            office_team: office_team.to_owned(),
            team: team.to_owned(),
        })
    }

    fn add_function(
        &mut self,
        office: &str,
        function: &str,
        namespace: &str,
        function_type: &str,
    ) -> anyhow::Result<()> {
        self.record(BuildCall::AddFunction {
            office: office.to_owned(),
            function: function.to_owned(),
            namespace: namespace.to_owned(),
            function_type: function_type.to_owned(),
        })
    }

    fn set_responsible_team(&mut self, office: &str, function: &str, team: &str) -> anyhow::Result<()> {
        self.record(BuildCall::SetResponsibleTeam {
            office: office.to_owned(),
            function: function.to_owned(),
            team: team.to_owned(),
        })
    }

    fn link_object(
        &mut self,
        office: &str,
        function: &str,
        object: &str,
        managed_object: &str,
    ) -> anyhow::Result<()> {
        self.record(BuildCall::LinkObject {
            office: office.to_owned(),
            function: function.to_owned(),
            object: object.to_owned(),
            managed_object: managed_object.to_owned(),
        })
    }

    fn link_flow(
        &mut self,
        office: &str,
        function: &str,
        flow: &str,
        argument_type: Option<&str>,
        target: &str,
        spawn: bool,
    ) -> anyhow::Result<()> {
        self.record(BuildCall::LinkFlow {
            office: office.to_owned(),
            function: function.to_owned(),
            flow: flow.to_owned(),
            argument_type: argument_type.map(str::to_owned),
            target: target.to_owned(),
            spawn,
        })
    }

    fn add_administration(
        &mut self,
        office: &str,
        name: &str,
        _source: Rc<dyn AdministrationSource>,
        properties: &PropertyList,
        administered: &[String],
    ) -> anyhow::Result<()> {
        self.record(BuildCall::AddAdministration {
            office: office.to_owned(),
            name: name.to_owned(),
            properties: properties.clone(),
            administered: administered.to_vec(),
        })
    }

    fn add_governance(
        &mut self,
        office: &str,
        name: &str,
        _source: Rc<dyn GovernanceSource>,
        properties: &PropertyList,
        governed: &[String],
    ) -> anyhow::Result<()> {
        self.record(BuildCall::AddGovernance {
            office: office.to_owned(),
            name: name.to_owned(),
            properties: properties.clone(),
            governed: governed.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn calls_render_as_tagged_json() {
        let call = BuildCall::LinkObject {
            office: "OfficeA".to_owned(),
            function: "SectionA.process".to_owned(),
            object: "repo".to_owned(),
            managed_object: "Repo".to_owned(),
        };
        assert_eq!(
            call.to_string(),
            r#"{"call":"link_object","office":"OfficeA","function":"SectionA.process","object":"repo","managed_object":"Repo"}"#
        );
    }

    #[test]
    fn recording_keeps_call_order() {
        let mut builder = RecordingBuilder::new();
        builder.add_office("OfficeA").unwrap();
        builder.register_team("OfficeA", "worker", "Pool").unwrap();

        assert_eq!(
            builder.into_calls(),
            vec![
                BuildCall::AddOffice {
                    name: "OfficeA".to_owned()
                },
                BuildCall::RegisterTeam {
                    office: "OfficeA".to_owned(),
                    office_team: "worker".to_owned(),
                    team: "Pool".to_owned(),
                },
            ]
        );
    }
}
