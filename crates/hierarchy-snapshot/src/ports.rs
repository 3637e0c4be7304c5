//! Boundary to the live UI hierarchy of the application under test.

use std::fmt;
use std::sync::Arc;

use axbridge_core_types::AxRef;
use thiserror::Error;

use crate::attributes::{Attribute, NativeValue};

/// Fault reported by the native layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{operation} failed: {message}")]
pub struct HostError {
    pub operation: &'static str,
    pub message: String,
}

impl HostError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Live-hierarchy accessor.
///
/// Every call must be issued from the session's single coordinating worker;
/// implementations are not expected to tolerate concurrent queries.
pub trait LiveHierarchy: Send + Sync {
    type Handle: Clone + fmt::Debug + Send + Sync + 'static;

    /// Root element of the application under test.
    fn root(&self) -> Result<Self::Handle, HostError>;

    /// Ordered children of `element` as they exist right now.
    fn children(&self, element: &Self::Handle) -> Result<Vec<Self::Handle>, HostError>;

    fn attribute(
        &self,
        element: &Self::Handle,
        attribute: Attribute,
    ) -> Result<NativeValue, HostError>;

    /// Stable accessibility reference, if the element can produce one.
    fn accessibility_ref(&self, element: &Self::Handle) -> Option<AxRef>;

    /// Finds the element carrying `reference` in the current hierarchy.
    fn relocate(&self, reference: &AxRef) -> Option<Self::Handle>;
}

impl<T> LiveHierarchy for Arc<T>
where
    T: LiveHierarchy,
{
    type Handle = T::Handle;

    fn root(&self) -> Result<Self::Handle, HostError> {
        (**self).root()
    }

    fn children(&self, element: &Self::Handle) -> Result<Vec<Self::Handle>, HostError> {
        (**self).children(element)
    }

    fn attribute(
        &self,
        element: &Self::Handle,
        attribute: Attribute,
    ) -> Result<NativeValue, HostError> {
        (**self).attribute(element, attribute)
    }

    fn accessibility_ref(&self, element: &Self::Handle) -> Option<AxRef> {
        (**self).accessibility_ref(element)
    }

    fn relocate(&self, reference: &AxRef) -> Option<Self::Handle> {
        (**self).relocate(reference)
    }
}
