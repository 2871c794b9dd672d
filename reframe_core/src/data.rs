// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nodes, attribute containers, and leaf values.
//!
//! A node's attributes form a tree of *data sources*: [`Container`]s map names
//! to further data sources, and [`Sampled`] leaves yield a [`Value`] for a
//! given shutter offset. Both are closed sets of variants rather than open
//! trait objects:
//!
//! - [`Container::Retained`]: a static map, as supplied by an upstream scene.
//! - [`Container::Overlay`]: a pass-through wrapper that intercepts the
//!   transform (see [`OverlayNode`]).
//! - [`Container::Xform`]: a lazily computed transform container.
//!
//! Handles are reference counted so that a container can be shared between
//! the upstream scene, the overlay registry, and consumers.

use core::fmt;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::overlay::{ComputedXform, OverlayNode};
use crate::sample::Sampled;
use crate::transform::Transform3d;

/// A shared, immutable name.
///
/// The empty token marks "no type" on placeholder registry entries.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(Arc<str>);

impl Token {
    /// Creates a token from a string.
    #[must_use]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Returns the token text.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether this is the empty token.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

/// The kind of a [`Value`], used in diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`Value::Bool`].
    Bool,
    /// [`Value::Double`].
    Double,
    /// [`Value::Vec3`].
    Vec3,
    /// [`Value::Matrix`].
    Matrix,
    /// [`Value::Token`].
    Token,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bool => "bool",
            Self::Double => "double",
            Self::Vec3 => "vec3",
            Self::Matrix => "matrix",
            Self::Token => "token",
        })
    }
}

/// A leaf attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A boolean flag.
    Bool(bool),
    /// A scalar.
    Double(f64),
    /// A 3-component vector (positions, orientations).
    Vec3([f64; 3]),
    /// A 4×4 transform.
    Matrix(Transform3d),
    /// A symbolic value such as an axis name.
    Token(Token),
}

impl Value {
    /// Returns the kind of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Double(_) => ValueKind::Double,
            Self::Vec3(_) => ValueKind::Vec3,
            Self::Matrix(_) => ValueKind::Matrix,
            Self::Token(_) => ValueKind::Token,
        }
    }

    /// Returns the boolean, if this is a [`Value::Bool`].
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the scalar, if this is a [`Value::Double`].
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the vector, if this is a [`Value::Vec3`].
    #[must_use]
    pub fn as_vec3(&self) -> Option<[f64; 3]> {
        match self {
            Self::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the transform, if this is a [`Value::Matrix`].
    #[must_use]
    pub fn as_matrix(&self) -> Option<Transform3d> {
        match self {
            Self::Matrix(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the token, if this is a [`Value::Token`].
    #[must_use]
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Self::Token(v) => Some(v),
            _ => None,
        }
    }

    /// Linearly interpolates towards `other` by `t` in `[0, 1]`.
    ///
    /// Kinds without a meaningful interpolation, and mismatched kinds, hold
    /// `self`.
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        match (self, other) {
            (Self::Double(a), Self::Double(b)) => Self::Double(mix(*a, *b)),
            (Self::Vec3(a), Self::Vec3(b)) => {
                Self::Vec3([mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])])
            }
            (Self::Matrix(a), Self::Matrix(b)) => {
                let mut out = *a;
                for (o, v) in out.cols.iter_mut().flatten().zip(b.cols.iter().flatten()) {
                    *o = mix(*o, *v);
                }
                Self::Matrix(out)
            }
            _ => self.clone(),
        }
    }
}

/// A shared handle to a [`Container`].
pub type ContainerHandle = Arc<Container>;

/// A shared handle to a [`Sampled`] leaf.
pub type SampledHandle = Arc<Sampled>;

/// Any node in an attribute tree.
#[derive(Clone, Debug)]
pub enum DataSource {
    /// A named collection of further data sources.
    Container(ContainerHandle),
    /// A time-sampled leaf.
    Sampled(SampledHandle),
}

impl DataSource {
    /// Wraps a constant value as a single-sample leaf.
    #[must_use]
    pub fn constant(value: Value) -> Self {
        Self::Sampled(Arc::new(Sampled::constant(value)))
    }
}

impl From<ContainerHandle> for DataSource {
    fn from(c: ContainerHandle) -> Self {
        Self::Container(c)
    }
}

impl From<SampledHandle> for DataSource {
    fn from(s: SampledHandle) -> Self {
        Self::Sampled(s)
    }
}

impl From<Container> for DataSource {
    fn from(c: Container) -> Self {
        Self::Container(Arc::new(c))
    }
}

impl From<Sampled> for DataSource {
    fn from(s: Sampled) -> Self {
        Self::Sampled(Arc::new(s))
    }
}

impl From<Value> for DataSource {
    fn from(v: Value) -> Self {
        Self::constant(v)
    }
}

/// A named attribute collection.
#[derive(Debug)]
pub enum Container {
    /// Static data, typically from an upstream scene.
    Retained(RetainedContainer),
    /// A pass-through wrapper installed by the overlay.
    Overlay(OverlayNode),
    /// A computed transform container.
    Xform(ComputedXform),
}

impl Container {
    /// Returns the names this container answers to.
    #[must_use]
    pub fn names(&self) -> Vec<Token> {
        match self {
            Self::Retained(c) => c.names(),
            Self::Overlay(c) => c.names(),
            Self::Xform(c) => c.names(),
        }
    }

    /// Returns the data source for `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<DataSource> {
        match self {
            Self::Retained(c) => c.get(name),
            Self::Overlay(c) => c.get(name),
            Self::Xform(c) => c.get(name),
        }
    }

    /// Returns the nested container for `name`, if present and a container.
    #[must_use]
    pub fn get_container(&self, name: &str) -> Option<ContainerHandle> {
        match self.get(name)? {
            DataSource::Container(c) => Some(c),
            DataSource::Sampled(_) => None,
        }
    }

    /// Returns the leaf for `name`, if present and sampled.
    #[must_use]
    pub fn get_sampled(&self, name: &str) -> Option<SampledHandle> {
        match self.get(name)? {
            DataSource::Sampled(s) => Some(s),
            DataSource::Container(_) => None,
        }
    }

    /// Returns the overlay wrapper, if this container is one.
    #[must_use]
    pub fn as_overlay(&self) -> Option<&OverlayNode> {
        match self {
            Self::Overlay(node) => Some(node),
            _ => None,
        }
    }
}

impl From<RetainedContainer> for Container {
    fn from(c: RetainedContainer) -> Self {
        Self::Retained(c)
    }
}

/// A static, ordered map from name to data source.
#[derive(Clone, Debug, Default)]
pub struct RetainedContainer {
    entries: BTreeMap<Token, DataSource>,
}

impl RetainedContainer {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces `name`.
    #[must_use]
    pub fn with(mut self, name: &str, source: impl Into<DataSource>) -> Self {
        self.insert(name, source);
        self
    }

    /// Adds or replaces `name` in place.
    pub fn insert(&mut self, name: &str, source: impl Into<DataSource>) {
        self.entries.insert(Token::new(name), source.into());
    }

    /// Removes `name`, returning its previous data source.
    pub fn remove(&mut self, name: &str) -> Option<DataSource> {
        self.entries.remove(name)
    }

    /// Returns the names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<Token> {
        self.entries.keys().cloned().collect()
    }

    /// Returns the data source for `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<DataSource> {
        self.entries.get(name).cloned()
    }

    /// Wraps this container in a shared handle.
    #[must_use]
    pub fn into_handle(self) -> ContainerHandle {
        Arc::new(Container::Retained(self))
    }
}

/// A scene-graph element: a type tag plus its attributes.
#[derive(Clone, Debug, Default)]
pub struct Node {
    /// The node type; empty for unknown or placeholder nodes.
    pub type_tag: Token,
    /// The node's attributes, if any.
    pub container: Option<ContainerHandle>,
}

impl Node {
    /// Creates a node.
    #[must_use]
    pub fn new(type_tag: Token, container: Option<ContainerHandle>) -> Self {
        Self {
            type_tag,
            container,
        }
    }

    /// Returns whether the node carries neither a type nor attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.type_tag.is_empty() && self.container.is_none()
    }
}
