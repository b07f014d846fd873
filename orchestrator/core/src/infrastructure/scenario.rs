// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Scenario Loader
//!
//! Reads a YAML scenario file and materialises it as an [`InMemoryWorld`]
//! plus a [`GridMap`]. Items are named inside the file so requirements can
//! point at them; names are resolved to fresh ids at build time.
//!
//! ```yaml
//! name: steel-run
//! map:
//!   width: 20
//!   height: 10
//!   walls: [{ x: 5, y: 0 }]
//!   hazards: [{ cell: { x: 6, y: 3 }, danger: deadly }]
//! agents:
//!   - name: alice
//!     position: { x: 0, y: 0 }
//!     duty: 1
//! items:
//!   - name: steel-a
//!     def: Steel
//!     count: 75
//!     position: { x: 3, y: 3 }
//! containers:
//!   - label: Pod A
//!     position: { x: 10, y: 5 }
//!     group: 1
//!     requirements:
//!       - count: 100
//!         things: [steel-a]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::agent::{Agent, AgentId};
use crate::domain::container::{Container, ContainerId, DepositTarget, GroupId};
use crate::domain::item::{Item, ItemId, SapientState};
use crate::domain::manifest::{Manifest, Requirement};
use crate::domain::reachability::{Cell, Danger};
use crate::infrastructure::grid::GridMap;
use crate::infrastructure::world::InMemoryWorld;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },

    #[error("container '{container}' references unknown item '{name}'")]
    UnknownThing { container: String, name: String },

    #[error("{what} at {cell} lies outside the {width}x{height} map")]
    OutOfBounds {
        what: String,
        cell: Cell,
        width: i32,
        height: i32,
    },

    #[error("{what} at {cell} is placed on a wall")]
    OnWall { what: String, cell: Cell },

    #[error("item '{0}' has a zero stack count")]
    EmptyStack(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub name: String,
    pub map: MapSpec,
    #[serde(default)]
    pub agents: Vec<AgentSpec>,
    #[serde(default)]
    pub items: Vec<ItemSpec>,
    #[serde(default)]
    pub containers: Vec<ContainerSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSpec {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub walls: Vec<Cell>,
    #[serde(default)]
    pub hazards: Vec<HazardSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardSpec {
    pub cell: Cell,
    pub danger: Danger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    pub name: String,
    pub position: Cell,
    #[serde(default)]
    pub duty: Option<u32>,
    #[serde(default = "default_true")]
    pub can_manipulate: bool,
    #[serde(default)]
    pub max_danger: Danger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSpec {
    pub name: String,
    pub def: String,
    #[serde(default = "default_count")]
    pub count: u32,
    pub position: Cell,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub quality: Option<u8>,
    /// Present for sapient cargo only.
    #[serde(default)]
    pub sapient: Option<SapientState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub label: String,
    pub position: Cell,
    #[serde(default)]
    pub group: Option<u32>,
    #[serde(default = "default_true")]
    pub assembled: bool,
    #[serde(default)]
    pub forbidden: bool,
    /// Capacities of the deposit targets; `null` means unlimited.
    #[serde(default)]
    pub deposit_targets: Vec<Option<u32>>,
    #[serde(default)]
    pub requirements: Vec<RequirementSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementSpec {
    pub count: u32,
    pub things: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_count() -> u32 {
    1
}

/// A scenario materialised into live world state.
#[derive(Debug)]
pub struct Scenario {
    pub name: String,
    pub world: InMemoryWorld,
    pub map: Arc<GridMap>,
    pub agents: HashMap<String, AgentId>,
    pub items: HashMap<String, ItemId>,
    pub containers: HashMap<String, ContainerId>,
}

impl Scenario {
    pub fn agent(&self, name: &str) -> Option<AgentId> {
        self.agents.get(name).copied()
    }

    pub fn item(&self, name: &str) -> Option<ItemId> {
        self.items.get(name).copied()
    }

    pub fn container(&self, label: &str) -> Option<ContainerId> {
        self.containers.get(label).copied()
    }
}

pub struct ScenarioLoader;

impl ScenarioLoader {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<ScenarioFile, ScenarioError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded scenario file from {:?}", path);
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<ScenarioFile, ScenarioError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse, validate and build in one go.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Scenario, ScenarioError> {
        let file = Self::from_yaml_file(path)?;
        Self::build(&file)
    }

    /// Check names, references and placement without building anything.
    pub fn validate(file: &ScenarioFile) -> Result<(), ScenarioError> {
        let map = Self::build_map(&file.map);

        let mut agent_names = HashSet::new();
        for agent in &file.agents {
            if !agent_names.insert(agent.name.as_str()) {
                return Err(ScenarioError::DuplicateName {
                    kind: "agent",
                    name: agent.name.clone(),
                });
            }
            Self::check_placement(&map, format!("agent '{}'", agent.name), agent.position)?;
        }

        let mut item_names = HashSet::new();
        for item in &file.items {
            if !item_names.insert(item.name.as_str()) {
                return Err(ScenarioError::DuplicateName {
                    kind: "item",
                    name: item.name.clone(),
                });
            }
            if item.count == 0 {
                return Err(ScenarioError::EmptyStack(item.name.clone()));
            }
            Self::check_placement(&map, format!("item '{}'", item.name), item.position)?;
        }

        let mut labels = HashSet::new();
        for container in &file.containers {
            if !labels.insert(container.label.as_str()) {
                return Err(ScenarioError::DuplicateName {
                    kind: "container",
                    name: container.label.clone(),
                });
            }
            Self::check_placement(&map, format!("container '{}'", container.label), container.position)?;
            for requirement in &container.requirements {
                if let Some(name) = requirement
                    .things
                    .iter()
                    .find(|name| !item_names.contains(name.as_str()))
                {
                    return Err(ScenarioError::UnknownThing {
                        container: container.label.clone(),
                        name: name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn build(file: &ScenarioFile) -> Result<Scenario, ScenarioError> {
        Self::validate(file)?;

        let world = InMemoryWorld::new();
        let map = Arc::new(Self::build_map(&file.map));

        // Spawn order follows file order; reachability ties depend on it.
        let mut items = HashMap::new();
        let mut templates: HashMap<&str, Item> = HashMap::new();
        for spec in &file.items {
            let item = Self::build_item(spec);
            templates.insert(spec.name.as_str(), item.clone());
            items.insert(spec.name.clone(), world.add_item(item));
        }

        let mut agents = HashMap::new();
        for spec in &file.agents {
            let mut agent = Agent::new(&spec.name, spec.position);
            agent.can_manipulate = spec.can_manipulate;
            agent.max_danger = spec.max_danger;
            if let Some(group) = spec.duty {
                agent = agent.with_duty(GroupId(group));
            }
            agents.insert(spec.name.clone(), world.add_agent(agent));
        }

        let mut containers = HashMap::new();
        for spec in &file.containers {
            let mut container = Container::new(&spec.label, spec.position);
            container.group = spec.group.map(GroupId);
            container.assembled = spec.assembled;
            container.forbidden = spec.forbidden;
            if !spec.deposit_targets.is_empty() {
                container.deposit_targets = spec
                    .deposit_targets
                    .iter()
                    .map(|capacity| match capacity {
                        Some(capacity) => DepositTarget::with_capacity(*capacity),
                        None => DepositTarget::unlimited(),
                    })
                    .collect();
            }

            let requirements = spec
                .requirements
                .iter()
                .map(|req| {
                    let things = req
                        .things
                        .iter()
                        .filter_map(|name| templates.get(name.as_str()).cloned())
                        .collect();
                    Requirement::new(req.count, things)
                })
                .collect();
            container.manifest = Manifest::new(container.id, requirements);

            containers.insert(spec.label.clone(), world.add_container(container));
        }

        info!(
            "Built scenario '{}': {} agents, {} items, {} containers",
            file.name,
            agents.len(),
            items.len(),
            containers.len()
        );

        Ok(Scenario {
            name: file.name.clone(),
            world,
            map,
            agents,
            items,
            containers,
        })
    }

    fn build_map(spec: &MapSpec) -> GridMap {
        let mut map = GridMap::new(spec.width, spec.height);
        map.walls.extend(spec.walls.iter().copied());
        for hazard in &spec.hazards {
            map.danger.insert(hazard.cell, hazard.danger);
        }
        map
    }

    fn build_item(spec: &ItemSpec) -> Item {
        let mut item = match spec.sapient {
            Some(state) => Item::sapient(&spec.def, spec.position, state),
            None => Item::stack(&spec.def, spec.count, spec.position),
        };
        item.material = spec.material.clone();
        item.quality = spec.quality;
        item
    }

    fn check_placement(map: &GridMap, what: String, cell: Cell) -> Result<(), ScenarioError> {
        if !map.in_bounds(cell) {
            return Err(ScenarioError::OutOfBounds {
                what,
                cell,
                width: map.width,
                height: map.height,
            });
        }
        if map.walls.contains(&cell) {
            return Err(ScenarioError::OnWall { what, cell });
        }
        Ok(())
    }
}
