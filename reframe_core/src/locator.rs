// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute locators used in dirty notices.
//!
//! A [`Locator`] addresses a data source inside a node's attribute tree, such
//! as `xform` or `referencePosition/orientation`. Upstream dirty notices carry
//! a [`LocatorSet`]; the overlay reacts only when the set intersects one of
//! the well-known locators below.
//!
//! # Intersection semantics
//!
//! Two locators intersect when one is a prefix of the other. Dirtying
//! `xform` therefore also dirties `xform/matrix`, and dirtying
//! `xform/matrix` affects whoever watches `xform`. The empty locator is a
//! prefix of everything and so intersects every locator.

use core::fmt;

use crate::data::Token;
use crate::schema;

/// A hierarchical attribute address.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Locator {
    elements: Vec<Token>,
}

impl Locator {
    /// The empty locator, which addresses the whole node.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a locator from its elements.
    #[must_use]
    pub fn new<'a>(elements: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            elements: elements.into_iter().map(Token::new).collect(),
        }
    }

    /// Returns a one-element locator.
    #[must_use]
    pub fn single(name: &str) -> Self {
        Self::new([name])
    }

    /// Returns the elements.
    #[must_use]
    pub fn elements(&self) -> &[Token] {
        &self.elements
    }

    /// Returns whether `prefix` is a prefix of this locator.
    #[must_use]
    pub fn has_prefix(&self, prefix: &Self) -> bool {
        self.elements.starts_with(&prefix.elements)
    }

    /// Returns whether either locator is a prefix of the other.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.has_prefix(other) || other.has_prefix(self)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(element.as_str())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Locator({self})")
    }
}

/// A set of locators carried by one dirty notice.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocatorSet {
    locators: Vec<Locator>,
}

impl LocatorSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a locator.
    pub fn insert(&mut self, locator: Locator) {
        if !self.locators.contains(&locator) {
            self.locators.push(locator);
        }
    }

    /// Returns whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    /// Iterates the locators in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Locator> {
        self.locators.iter()
    }

    /// Returns whether any member intersects `locator`.
    #[must_use]
    pub fn intersects(&self, locator: &Locator) -> bool {
        self.locators.iter().any(|l| l.intersects(locator))
    }

    /// Returns whether any member intersects any member of `other`.
    #[must_use]
    pub fn intersects_set(&self, other: &Self) -> bool {
        other.iter().any(|l| self.intersects(l))
    }
}

impl FromIterator<Locator> for LocatorSet {
    fn from_iter<I: IntoIterator<Item = Locator>>(iter: I) -> Self {
        let mut set = Self::new();
        for locator in iter {
            set.insert(locator);
        }
        set
    }
}

impl From<Locator> for LocatorSet {
    fn from(locator: Locator) -> Self {
        Self {
            locators: vec![locator],
        }
    }
}

/// The flattened transform; changes here propagate to every descendant.
#[must_use]
pub fn xform() -> Locator {
    Locator::single(schema::XFORM)
}

/// Geodetic position parameters on the node itself.
#[must_use]
pub fn local_position() -> Locator {
    Locator::single(schema::LOCAL_POSITION)
}

/// Geodetic reference frame parameters, possibly inherited.
#[must_use]
pub fn reference_position() -> Locator {
    Locator::single(schema::REFERENCE_POSITION)
}

/// Unit-scale parameters.
#[must_use]
pub fn metrics() -> Locator {
    Locator::single(schema::METRICS)
}

/// All override-parameter locators; a change to any of them affects the
/// owning node's corrected transform.
#[must_use]
pub fn override_parameters() -> LocatorSet {
    [local_position(), reference_position(), metrics()]
        .into_iter()
        .collect()
}
