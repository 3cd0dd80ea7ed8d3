//! Scenario files: the bootstrap input plus the fleet that should work it.
//!
//! ```toml
//! [grid]
//! width = 6
//! height = 3
//! contaminated = [[3, 1], [4, 2]]
//!
//! [[agents]]
//! role = "scanner"
//! label = "s1"
//! position = [0, 0]
//!
//! [[agents]]
//! role = "collector"
//! label = "c1"
//! position = [1, 0]
//! fault = "work_fails"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::agent::{Agent, Fault};
use crate::control_loop::BootstrapFeed;
use crate::error::{Result, SimError};
use crate::registry::SpatialRegistry;
use crate::types::{IdAllocator, Position, Role};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub grid: GridSpec,
    #[serde(default)]
    pub agents: Vec<AgentSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridSpec {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub contaminated: Vec<Position>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSpec {
    pub role: Role,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub fault: Option<Fault>,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn feed(&self) -> BootstrapFeed {
        BootstrapFeed {
            width: self.grid.width,
            height: self.grid.height,
            contaminated: self.grid.contaminated.clone(),
        }
    }

    /// Register every agent, in file order, into a fresh registry.
    /// Unlabelled agents are named `<role>-<id>`.
    pub fn build_registry(&self, bucket_size: i32) -> Result<SpatialRegistry> {
        let registry = SpatialRegistry::with_bucket_size(bucket_size);
        let mut ids = IdAllocator::new();
        for spec in &self.agents {
            let mut agent = Agent::new(&mut ids, "", spec.role, spec.position);
            let label = spec
                .label
                .clone()
                .unwrap_or_else(|| format!("{}-{}", spec.role, agent.id()));
            agent = agent.relabel(label);
            if let Some(fault) = spec.fault {
                agent = agent.with_fault(fault);
            }
            let id = agent.id();
            if !registry.register(agent) {
                return Err(SimError::DuplicateAgent(id));
            }
        }
        Ok(registry)
    }
}

/// Grid sized to hold every spot, at least 1x1. Negative spots are ignored
/// for sizing and left for seeding to reject.
pub fn feed_covering(spots: &[Position]) -> BootstrapFeed {
    let width = spots
        .iter()
        .filter(|p| p.x >= 0 && p.y >= 0)
        .map(|p| p.x + 1)
        .max()
        .unwrap_or(1);
    let height = spots
        .iter()
        .filter(|p| p.x >= 0 && p.y >= 0)
        .map(|p| p.y + 1)
        .max()
        .unwrap_or(1);
    BootstrapFeed {
        width,
        height,
        contaminated: spots.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [grid]
        width = 6
        height = 3
        contaminated = [[3, 1], [4, 2]]

        [[agents]]
        role = "scanner"
        label = "s1"
        position = [0, 0]

        [[agents]]
        role = "collector"
        position = [1, 0]
        fault = "work_fails"

        [[agents]]
        role = "finisher"
        label = "f1"
    "#;

    #[test]
    fn parses_grid_and_agents() {
        let scenario = Scenario::from_toml(SAMPLE).expect("scenario parses");
        let feed = scenario.feed();
        assert_eq!((feed.width, feed.height), (6, 3));
        assert_eq!(feed.contaminated, vec![Position::new(3, 1), Position::new(4, 2)]);
        assert_eq!(scenario.agents.len(), 3);
        assert_eq!(scenario.agents[1].fault, Some(Fault::WorkFails));
        assert_eq!(scenario.agents[2].position, Position::new(0, 0));
    }

    #[test]
    fn builds_registry_with_sequential_ids() {
        let scenario = Scenario::from_toml(SAMPLE).expect("scenario parses");
        let registry = scenario.build_registry(10).expect("registry builds");
        let ids: Vec<_> = registry.all().iter().map(Agent::id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(registry.by_id(2).map(|a| a.label().to_string()), Some("collector-2".into()));
        assert_eq!(registry.count_by_role(Role::Finisher), 1);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let raw = "[grid]\nwidth = 1\nheight = 1\n\n[[agents]]\nrole = \"washer\"\n";
        assert!(matches!(Scenario::from_toml(raw), Err(SimError::Toml(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SAMPLE.as_bytes()).expect("write scenario");
        let scenario = Scenario::load(file.path()).expect("scenario loads");
        assert_eq!(scenario.grid.contaminated.len(), 2);
    }

    #[test]
    fn covering_feed_fits_all_spots() {
        let feed = feed_covering(&[Position::new(3, 1), Position::new(0, 5)]);
        assert_eq!((feed.width, feed.height), (4, 6));
        let empty = feed_covering(&[]);
        assert_eq!((empty.width, empty.height), (1, 1));
    }
}
