use crate::boxes::FourCC;
use crate::error::{LayoutError, Result};
use crate::instance::BoxInstance;
use crate::known_layouts::KnownLayout;
use crate::layout::LayoutDescriptor;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of layouts keyed by box type.
///
/// Layouts are shared, so instances created from the registry hold an
/// `Arc` to the same descriptor. Build it fluently with
/// [`Registry::with_layout`].
pub struct Registry {
    map: HashMap<FourCC, Arc<LayoutDescriptor>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Return a new registry with `layout` registered for `typ`.
    pub fn with_layout(mut self, typ: FourCC, layout: LayoutDescriptor) -> Self {
        self.map.insert(typ, Arc::new(layout));
        self
    }

    pub fn layout(&self, typ: &FourCC) -> Option<Arc<LayoutDescriptor>> {
        self.map.get(typ).cloned()
    }

    pub fn contains(&self, typ: &FourCC) -> bool {
        self.map.contains_key(typ)
    }

    /// Registered box types, sorted.
    pub fn types(&self) -> Vec<FourCC> {
        let mut v: Vec<FourCC> = self.map.keys().copied().collect();
        v.sort();
        v
    }

    /// A default-valued instance of `typ`, or `None` if it is not registered.
    pub fn instantiate(&self, typ: FourCC) -> Option<BoxInstance> {
        self.layout(&typ).map(|l| BoxInstance::new(typ, l))
    }

    /// Decode a payload of type `typ`.
    ///
    /// Returns `None` if no layout exists for the given type.
    pub fn decode(&self, typ: FourCC, payload: &[u8]) -> Option<Result<(BoxInstance, usize)>> {
        self.layout(&typ)
            .map(|l| BoxInstance::from_bytes(typ, l, payload))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry holding every [`KnownLayout`].
pub fn default_registry() -> std::result::Result<Registry, LayoutError> {
    KnownLayout::ALL
        .iter()
        .try_fold(Registry::new(), |reg, known| {
            Ok(reg.with_layout(known.fourcc(), known.layout()?))
        })
}
