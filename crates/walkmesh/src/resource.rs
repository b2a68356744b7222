//! Access to raw walkmesh resources
//!
//! Archive handling lives outside this crate. Readers only ever ask a
//! [`ResourceLoader`] for the bytes of one named resource.

use std::collections::HashMap;
use std::path::PathBuf;

use walkmesh_common::Result;

/// Kind of walkmesh resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// Area or tile walkmesh
    Wok,
    /// Placeable walkmesh
    Pwk,
    /// Door walkmesh
    Dwk,
}

impl ResourceType {
    /// File extension of this resource type
    pub fn extension(self) -> &'static str {
        match self {
            ResourceType::Wok => "wok",
            ResourceType::Pwk => "pwk",
            ResourceType::Dwk => "dwk",
        }
    }

    /// Resource type from a file extension, case-insensitive
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "wok" => Some(ResourceType::Wok),
            "pwk" => Some(ResourceType::Pwk),
            "dwk" => Some(ResourceType::Dwk),
            _ => None,
        }
    }
}

/// Source of raw walkmesh bytes
pub trait ResourceLoader {
    /// Returns the bytes of a resource, or `None` if it does not exist
    fn get_resource(&self, name: &str, kind: ResourceType) -> Result<Option<Vec<u8>>>;
}

impl<T: ResourceLoader + ?Sized> ResourceLoader for &T {
    fn get_resource(&self, name: &str, kind: ResourceType) -> Result<Option<Vec<u8>>> {
        (**self).get_resource(name, kind)
    }
}

/// Loads resources from loose files in one directory
///
/// Resource names are case-insensitive; files are looked up as
/// `<lowercase name>.<extension>`.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    /// Creates a loader reading from `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path a resource would be read from
    pub fn resource_path(&self, name: &str, kind: ResourceType) -> PathBuf {
        self.root
            .join(format!("{}.{}", name.to_ascii_lowercase(), kind.extension()))
    }
}

impl ResourceLoader for DirectoryLoader {
    fn get_resource(&self, name: &str, kind: ResourceType) -> Result<Option<Vec<u8>>> {
        let path = self.resource_path(name, kind);
        match std::fs::read(&path) {
            Ok(data) => {
                log::debug!("Read {} bytes from {}", data.len(), path.display());
                Ok(Some(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory resource map
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    resources: HashMap<(String, ResourceType), Vec<u8>>,
}

impl MemoryLoader {
    /// Creates an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a resource
    pub fn insert(&mut self, name: &str, kind: ResourceType, data: impl Into<Vec<u8>>) {
        self.resources
            .insert((name.to_ascii_lowercase(), kind), data.into());
    }

    /// Builder-style [`MemoryLoader::insert`]
    pub fn with(mut self, name: &str, kind: ResourceType, data: impl Into<Vec<u8>>) -> Self {
        self.insert(name, kind, data);
        self
    }

    /// Number of stored resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no resource is stored
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl ResourceLoader for MemoryLoader {
    fn get_resource(&self, name: &str, kind: ResourceType) -> Result<Option<Vec<u8>>> {
        Ok(self
            .resources
            .get(&(name.to_ascii_lowercase(), kind))
            .cloned())
    }
}
