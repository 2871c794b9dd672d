// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pass-through wrapper that intercepts the transform.

use core::fmt;
use std::sync::{Arc, Weak};

use crate::config::{EngineConfig, OverlayDefaults, OverrideKind};
use crate::data::{Container, ContainerHandle, DataSource, Node, Token};
use crate::diagnostics::Diagnostics;
use crate::path::Path;
use crate::registry::AtomicSlot;
use crate::schema;

use super::computed::{ComputedXform, Recipe};

/// Node lookup through the overlay, used to reach ancestors.
///
/// Implemented by the engine; overlay nodes hold it weakly so that the
/// registry owns nodes and never the reverse.
pub trait NodeLookup: Send + Sync {
    /// Returns the overlay's view of `path`.
    fn lookup(&self, path: &Path) -> Node;
}

/// State shared by every overlay node of one engine.
pub struct OverlayContext {
    lookup: Weak<dyn NodeLookup>,
    kind: OverrideKind,
    defaults: OverlayDefaults,
    diagnostics: Diagnostics,
}

impl fmt::Debug for OverlayContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayContext")
            .field("kind", &self.kind)
            .field("defaults", &self.defaults)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

impl OverlayContext {
    /// Creates a context that resolves ancestors through `lookup`.
    #[must_use]
    pub fn new(
        lookup: Weak<dyn NodeLookup>,
        config: &EngineConfig,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            lookup,
            kind: config.kind,
            defaults: config.defaults,
            diagnostics,
        }
    }

    /// The override kind in effect.
    #[must_use]
    pub fn kind(&self) -> OverrideKind {
        self.kind
    }

    /// Fallback values for missing attributes.
    #[must_use]
    pub fn defaults(&self) -> &OverlayDefaults {
        &self.defaults
    }

    /// The diagnostics handle.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Looks up `path` through the overlay, if the engine is still alive.
    #[must_use]
    pub fn lookup(&self, path: &Path) -> Option<Node> {
        Some(self.lookup.upgrade()?.lookup(path))
    }

    /// Returns whether `container` carries override parameters of the
    /// configured kind.
    #[must_use]
    pub fn has_parameters(&self, container: &Container) -> bool {
        let group = match self.kind {
            OverrideKind::Geodetic => schema::LOCAL_POSITION,
            OverrideKind::Metrics => schema::METRICS,
        };
        container.get_container(group).is_some()
    }
}

/// An upstream node's attributes with `xform` replaced by a corrected,
/// cached transform.
///
/// Every other name is forwarded to the upstream container (the
/// *delegate*). The upstream transform stays reachable under
/// [`schema::OVERLAY_PRESERVED_XFORM`] so that descendants can recover their
/// local transforms.
pub struct OverlayNode {
    path: Path,
    context: Arc<OverlayContext>,
    delegate: AtomicSlot<Container>,
    cache: AtomicSlot<Container>,
}

impl fmt::Debug for OverlayNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayNode")
            .field("path", &self.path)
            .field("cached", &self.is_cached())
            .finish_non_exhaustive()
    }
}

impl OverlayNode {
    /// Wraps `delegate` as the node at `path`.
    #[must_use]
    pub fn new(path: Path, delegate: Option<ContainerHandle>, context: Arc<OverlayContext>) -> Self {
        Self {
            path,
            context,
            delegate: delegate.map_or_else(AtomicSlot::empty, AtomicSlot::new),
            cache: AtomicSlot::empty(),
        }
    }

    /// The node's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns whether this node was created by the engine owning `context`.
    #[must_use]
    pub fn shares_context(&self, context: &Arc<OverlayContext>) -> bool {
        Arc::ptr_eq(&self.context, context)
    }

    /// The upstream container.
    #[must_use]
    pub fn delegate(&self) -> Option<ContainerHandle> {
        self.delegate.load()
    }

    /// Replaces the upstream container in place.
    ///
    /// The cached transform is left alone; callers invalidate it as part of
    /// the change that prompted the update.
    pub fn set_delegate(&self, delegate: Option<ContainerHandle>) {
        self.delegate.store(delegate);
    }

    /// Returns the delegate's names plus the preserved-transform name.
    #[must_use]
    pub fn names(&self) -> Vec<Token> {
        let mut names = self.delegate().map(|d| d.names()).unwrap_or_default();
        names.push(Token::new(schema::OVERLAY_PRESERVED_XFORM));
        names
    }

    /// Returns the data source for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<DataSource> {
        match name {
            schema::XFORM => self.xform().map(DataSource::Container),
            schema::OVERLAY_PRESERVED_XFORM => self.delegate()?.get(schema::XFORM),
            _ => self.delegate()?.get(name),
        }
    }

    /// Returns whether a transform is cached.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cache.is_set()
    }

    /// Clears the cached transform; returns whether one was present.
    pub fn invalidate(&self) -> bool {
        self.cache.take().is_some()
    }

    /// Returns the transform container, computing and caching it on a miss.
    #[must_use]
    pub fn xform(&self) -> Option<ContainerHandle> {
        if let Some(cached) = self.cache.load() {
            return Some(cached);
        }
        let computed = self.compute_xform()?;
        Some(self.cache.get_or_publish(computed))
    }

    fn compute_xform(&self) -> Option<ContainerHandle> {
        let delegate = self.delegate()?;
        let upstream = delegate.get_container(schema::XFORM)?;
        let recipe = if self.context.has_parameters(&delegate) {
            self.direct_recipe(&delegate)
        } else if self.has_overridden_ancestor() {
            Recipe::Dependent
        } else {
            return Some(upstream);
        };
        Some(Arc::new(Container::Xform(ComputedXform::new(
            self.path.clone(),
            delegate,
            recipe,
            self.context.clone(),
        ))))
    }

    fn direct_recipe(&self, delegate: &ContainerHandle) -> Recipe {
        match self.context.kind {
            OverrideKind::Metrics => Recipe::Metrics,
            OverrideKind::Geodetic => Recipe::Geodetic {
                reference: self.reference_container(delegate),
            },
        }
    }

    /// Walks ancestors nearest first; the first one with parameters wins.
    fn has_overridden_ancestor(&self) -> bool {
        self.path.ancestors().any(|ancestor| {
            self.context
                .lookup(&ancestor)
                .and_then(|node| node.container)
                .is_some_and(|c| self.context.has_parameters(&c))
        })
    }

    /// Finds the container declaring the geodetic reference frame: this node
    /// or its nearest ancestor.
    fn reference_container(&self, delegate: &ContainerHandle) -> Option<ContainerHandle> {
        if delegate.get_container(schema::REFERENCE_POSITION).is_some() {
            return Some(delegate.clone());
        }
        self.path.ancestors().find_map(|ancestor| {
            self.context
                .lookup(&ancestor)?
                .container
                .filter(|c| c.get_container(schema::REFERENCE_POSITION).is_some())
        })
    }
}
