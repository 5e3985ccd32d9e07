//! Mapping from host paths to synthetic container paths

use crate::error::Result;
use crate::path::{PathStyle, check_mount_source};
use crate::resolver::{PathResolver, Resolution};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// Length of the identifier in a synthetic container path
pub const IDENTIFIER_LEN: usize = 8;

/// How synthetic container path identifiers are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MountNaming {
    /// Random hex identifiers, re-drawn if one is already taken
    #[default]
    Random,
    /// An 8 digit hex counter starting at `00000001`, for reproducible output
    Sequential,
}

/// Injective map from normalized host paths to container paths.
///
/// Entries are created on first sight and never removed; iteration yields
/// them in first-seen order.
#[derive(Debug, Clone)]
pub struct PathMap {
    root: &'static str,
    naming: MountNaming,
    entries: IndexMap<String, String>,
    taken: HashSet<String>,
    counter: u64,
}

impl PathMap {
    /// Create an empty map for containers of the given style
    pub fn new(style: PathStyle, naming: MountNaming) -> Self {
        Self {
            root: style.container_root(),
            naming,
            entries: IndexMap::new(),
            taken: HashSet::new(),
            counter: 0,
        }
    }

    /// Container path already assigned to `host`
    pub fn get(&self, host: &str) -> Option<&str> {
        self.entries.get(host).map(String::as_str)
    }

    /// Container path for `host`, assigning a fresh one on first sight
    pub fn map(&mut self, host: &str) -> String {
        if let Some(existing) = self.entries.get(host) {
            return existing.clone();
        }

        let container = loop {
            let id = self.next_identifier();
            let candidate = format!("{}/.{id}", self.root);
            if !self.taken.contains(&candidate) {
                break candidate;
            }
        };

        debug!(host, container = %container, "mapped host path into container");
        self.taken.insert(container.clone());
        self.entries.insert(host.to_string(), container.clone());
        container
    }

    /// Number of mapped host paths
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been mapped yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(host, container)` pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(h, c)| (h.as_str(), c.as_str()))
    }

    fn next_identifier(&mut self) -> String {
        match self.naming {
            MountNaming::Random => {
                let mut id = Uuid::new_v4().simple().to_string();
                id.truncate(IDENTIFIER_LEN);
                id
            }
            MountNaming::Sequential => {
                self.counter += 1;
                format!("{:0width$x}", self.counter, width = IDENTIFIER_LEN)
            }
        }
    }
}

/// Resolver that maps every path it sees into the container
#[derive(Debug)]
pub struct ContainerPathResolver {
    style: PathStyle,
    map: Mutex<PathMap>,
}

impl ContainerPathResolver {
    /// Create a resolver with an empty map
    pub fn new(style: PathStyle, naming: MountNaming) -> Self {
        Self {
            style,
            map: Mutex::new(PathMap::new(style, naming)),
        }
    }

    /// Copy of the mappings discovered so far
    pub fn snapshot(&self) -> PathMap {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, PathMap> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PathResolver for ContainerPathResolver {
    fn resolve(&self, path: &str) -> Result<Resolution> {
        check_mount_source(path, self.style)?;
        Ok(Resolution::Resolved(self.lock().map(path)))
    }
}
