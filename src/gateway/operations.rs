//! Resource Operations: store, retrieve and delete against the Document Store.
//!
//! Each operation accepts only the [`ResourceRef`] variants it serves; anything
//! else is an `InvalidResourceReference`. Backend faults are wrapped with the
//! operation name and the Location involved.

use crate::core::error::{GatewayError, StoreError};
use crate::core::store::{DocumentStore, Location, StoredDocument, content_hash};
use crate::gateway::address::AddressMapper;
use crate::gateway::mime::{AttachmentPolicy, types};
use crate::gateway::resource::{ResourceKind, ResourceRef};
use std::sync::Arc;

/// Result of a successful store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub location: Location,
    pub content_hash: String,
}

/// Payload returned by a retrieve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Hex SHA-256 of `bytes`.
    pub etag: String,
    pub last_modified: String,
}

#[derive(Clone)]
pub struct ResourceOps {
    store: Arc<dyn DocumentStore>,
    mapper: AddressMapper,
    policy: AttachmentPolicy,
}

impl ResourceOps {
    pub fn new(store: Arc<dyn DocumentStore>, mapper: AddressMapper, policy: AttachmentPolicy) -> Self {
        Self {
            store,
            mapper,
            policy,
        }
    }

    /// Main XML payload of a data or draft instance.
    pub fn store_document(&self, resource: &ResourceRef, content: &[u8]) -> Result<Ack, GatewayError> {
        expect_kind(resource, &[ResourceKind::FormData], "store_document")?;
        self.write(resource, content, types::XML)
    }

    pub fn retrieve_document(&self, resource: &ResourceRef) -> Result<Content, GatewayError> {
        expect_kind(resource, &[ResourceKind::FormData], "retrieve_document")?;
        self.read(resource, Some(types::XML))
    }

    /// Binary payload attached to a data or draft instance.
    pub fn store_attachment(
        &self,
        resource: &ResourceRef,
        content: &[u8],
        declared_type: Option<&str>,
    ) -> Result<Ack, GatewayError> {
        expect_kind(resource, &[ResourceKind::DataAttachment], "store_attachment")?;
        let content_type = self.attachment_type(resource, declared_type)?;
        self.write(resource, content, &content_type)
    }

    pub fn retrieve_attachment(&self, resource: &ResourceRef) -> Result<Content, GatewayError> {
        expect_kind(resource, &[ResourceKind::DataAttachment], "retrieve_attachment")?;
        self.read(resource, None)
    }

    pub fn store_form(&self, resource: &ResourceRef, content: &[u8]) -> Result<Ack, GatewayError> {
        expect_kind(resource, &[ResourceKind::FormDefinition], "store_form")?;
        self.write(resource, content, types::XHTML)
    }

    /// Form definitions are always served as XHTML, whatever was recorded at store time.
    pub fn retrieve_form(&self, resource: &ResourceRef) -> Result<Content, GatewayError> {
        expect_kind(resource, &[ResourceKind::FormDefinition], "retrieve_form")?;
        self.read(resource, Some(types::XHTML))
    }

    pub fn store_form_attachment(
        &self,
        resource: &ResourceRef,
        content: &[u8],
        declared_type: Option<&str>,
    ) -> Result<Ack, GatewayError> {
        expect_kind(resource, &[ResourceKind::FormAttachment], "store_form_attachment")?;
        let content_type = self.attachment_type(resource, declared_type)?;
        self.write(resource, content, &content_type)
    }

    pub fn retrieve_form_attachment(&self, resource: &ResourceRef) -> Result<Content, GatewayError> {
        expect_kind(resource, &[ResourceKind::FormAttachment], "retrieve_form_attachment")?;
        self.read(resource, None)
    }

    /// Remove any resource and its tags. `NotFound` when nothing was stored.
    pub fn delete(&self, resource: &ResourceRef) -> Result<Location, GatewayError> {
        let location = self.mapper.location(resource);
        let existed = self
            .store
            .delete_document(&location)
            .map_err(|source| store_fault("delete", &location, source))?;
        if !existed {
            return Err(GatewayError::NotFound(location.to_string()));
        }
        tracing::debug!(location = %location, "deleted");
        Ok(location)
    }

    /// Store by kind: the dispatcher's single entry point for PUT.
    pub fn store(
        &self,
        resource: &ResourceRef,
        content: &[u8],
        declared_type: Option<&str>,
    ) -> Result<Ack, GatewayError> {
        match resource.kind() {
            ResourceKind::FormData => self.store_document(resource, content),
            ResourceKind::DataAttachment => self.store_attachment(resource, content, declared_type),
            ResourceKind::FormDefinition => self.store_form(resource, content),
            ResourceKind::FormAttachment => {
                self.store_form_attachment(resource, content, declared_type)
            }
        }
    }

    /// Retrieve by kind: the dispatcher's single entry point for GET.
    pub fn retrieve(&self, resource: &ResourceRef) -> Result<Content, GatewayError> {
        match resource.kind() {
            ResourceKind::FormData => self.retrieve_document(resource),
            ResourceKind::DataAttachment => self.retrieve_attachment(resource),
            ResourceKind::FormDefinition => self.retrieve_form(resource),
            ResourceKind::FormAttachment => self.retrieve_form_attachment(resource),
        }
    }

    fn attachment_type(
        &self,
        resource: &ResourceRef,
        declared_type: Option<&str>,
    ) -> Result<String, GatewayError> {
        let name = resource
            .attachment_name()
            .map(|n| n.as_str())
            .unwrap_or_default();
        self.policy.resolve(declared_type, name)
    }

    fn write(&self, resource: &ResourceRef, content: &[u8], content_type: &str) -> Result<Ack, GatewayError> {
        let (location, tags) = self.mapper.map(resource);
        self.store
            .write_document(&location, &tags, content, content_type)
            .map_err(|source| store_fault("write", &location, source))?;
        tracing::debug!(location = %location, bytes = content.len(), content_type, "stored");
        Ok(Ack {
            content_hash: content_hash(content),
            location,
        })
    }

    fn read(&self, resource: &ResourceRef, served_type: Option<&str>) -> Result<Content, GatewayError> {
        let location = self.mapper.location(resource);
        let document = self
            .store
            .read_document(&location)
            .map_err(|source| store_fault("read", &location, source))?
            .ok_or_else(|| GatewayError::NotFound(location.to_string()))?;

        let StoredDocument {
            content,
            content_type,
            content_hash,
            last_modified,
            ..
        } = document;
        let content_type = match served_type {
            Some(t) => t.to_string(),
            None if content_type.is_empty() => types::OCTET_STREAM.to_string(),
            None => content_type,
        };
        Ok(Content {
            bytes: content,
            content_type,
            etag: content_hash,
            last_modified,
        })
    }
}

fn expect_kind(
    resource: &ResourceRef,
    accepted: &[ResourceKind],
    op: &str,
) -> Result<(), GatewayError> {
    if accepted.contains(&resource.kind()) {
        Ok(())
    } else {
        Err(GatewayError::InvalidResourceReference(format!(
            "{op} does not accept a {} reference",
            resource.kind()
        )))
    }
}

fn store_fault(op: &'static str, location: &Location, source: StoreError) -> GatewayError {
    tracing::warn!(op, location = %location, error = %source, "document store fault");
    GatewayError::Store {
        op,
        location: location.to_string(),
        source,
    }
}
