//! Typed identification of addressable resources.
//!
//! A [`ResourceRef`] is a tagged variant: which optional fields exist is fixed by
//! the variant, so a reference with a document id on a form definition cannot be
//! represented. [`ResourceRef::from_parts`] is the one place loose parts are
//! checked and turned into a reference.

use crate::core::error::GatewayError;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;

/// Attachment name marking the main XML payload of a data or draft instance.
pub const PRIMARY_DATA_NAME: &str = "data.xml";
/// Attachment name marking a form definition.
pub const FORM_DEFINITION_NAME: &str = "form.xhtml";
/// Attachment name of the rendered-HTML variant of a data instance.
pub const RENDERED_DATA_NAME: &str = "data.xhtml";

/// A validated identifier: non-empty, no `/`, `\` or control characters, not `.` or `..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Segment(String);

impl Segment {
    pub fn new(field: &str, value: &str) -> Result<Self, GatewayError> {
        if value.is_empty() {
            return Err(GatewayError::InvalidResourceReference(format!(
                "{field} must not be empty"
            )));
        }
        if value == "." || value == ".." {
            return Err(GatewayError::InvalidResourceReference(format!(
                "{field} must not be '{value}'"
            )));
        }
        if value.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
            return Err(GatewayError::InvalidResourceReference(format!(
                "{field} '{}' contains a path separator or control character",
                value.escape_debug()
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Segment {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    FormDefinition,
    FormAttachment,
    FormData,
    DataAttachment,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::FormDefinition => "form definition",
            ResourceKind::FormAttachment => "form attachment",
            ResourceKind::FormData => "form data",
            ResourceKind::DataAttachment => "data attachment",
        };
        f.write_str(name)
    }
}

/// The (application, form) boundary every resource and every search lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FormScope {
    pub app: Segment,
    pub form: Segment,
}

impl FormScope {
    pub fn new(app: &str, form: &str) -> Result<Self, GatewayError> {
        Ok(Self {
            app: Segment::new("application", app)?,
            form: Segment::new("form", form)?,
        })
    }
}

impl fmt::Display for FormScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app, self.form)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceRef {
    FormDefinition {
        app: Segment,
        form: Segment,
    },
    FormAttachment {
        app: Segment,
        form: Segment,
        name: Segment,
    },
    FormData {
        app: Segment,
        form: Segment,
        id: Segment,
        draft: bool,
    },
    DataAttachment {
        app: Segment,
        form: Segment,
        id: Segment,
        draft: bool,
        name: Segment,
    },
}

impl ResourceRef {
    /// Build a reference from loose parts, rejecting any combination the kind forbids.
    pub fn from_parts(
        kind: ResourceKind,
        app: &str,
        form: &str,
        draft: bool,
        id: Option<&str>,
        name: Option<&str>,
    ) -> Result<Self, GatewayError> {
        let scope = FormScope::new(app, form)?;
        let FormScope { app, form } = scope;
        let inconsistent = |what: &str| {
            GatewayError::InvalidResourceReference(format!("{kind} {what}"))
        };

        match kind {
            ResourceKind::FormDefinition | ResourceKind::FormAttachment => {
                if draft {
                    return Err(inconsistent("cannot be a draft"));
                }
                if id.is_some() {
                    return Err(inconsistent("cannot carry a document id"));
                }
            }
            ResourceKind::FormData | ResourceKind::DataAttachment => {
                if id.is_none() {
                    return Err(inconsistent("requires a document id"));
                }
            }
        }

        match (kind, id, name) {
            (ResourceKind::FormDefinition, None, None) => {
                Ok(ResourceRef::FormDefinition { app, form })
            }
            (ResourceKind::FormAttachment, None, Some(name)) if name != FORM_DEFINITION_NAME => {
                Ok(ResourceRef::FormAttachment {
                    app,
                    form,
                    name: Segment::new("attachment name", name)?,
                })
            }
            (ResourceKind::FormData, Some(id), None) => Ok(ResourceRef::FormData {
                app,
                form,
                id: Segment::new("document id", id)?,
                draft,
            }),
            (ResourceKind::DataAttachment, Some(id), Some(name)) if name != PRIMARY_DATA_NAME => {
                Ok(ResourceRef::DataAttachment {
                    app,
                    form,
                    id: Segment::new("document id", id)?,
                    draft,
                    name: Segment::new("attachment name", name)?,
                })
            }
            (ResourceKind::FormDefinition | ResourceKind::FormData, _, Some(_)) => {
                Err(inconsistent("cannot carry an attachment name"))
            }
            (ResourceKind::FormAttachment | ResourceKind::DataAttachment, _, None) => {
                Err(inconsistent("requires an attachment name"))
            }
            (_, _, Some(name)) => Err(inconsistent(&format!(
                "cannot use the reserved name '{name}'"
            ))),
            _ => Err(inconsistent("has inconsistent fields")),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceRef::FormDefinition { .. } => ResourceKind::FormDefinition,
            ResourceRef::FormAttachment { .. } => ResourceKind::FormAttachment,
            ResourceRef::FormData { .. } => ResourceKind::FormData,
            ResourceRef::DataAttachment { .. } => ResourceKind::DataAttachment,
        }
    }

    pub fn app(&self) -> &Segment {
        match self {
            ResourceRef::FormDefinition { app, .. }
            | ResourceRef::FormAttachment { app, .. }
            | ResourceRef::FormData { app, .. }
            | ResourceRef::DataAttachment { app, .. } => app,
        }
    }

    pub fn form(&self) -> &Segment {
        match self {
            ResourceRef::FormDefinition { form, .. }
            | ResourceRef::FormAttachment { form, .. }
            | ResourceRef::FormData { form, .. }
            | ResourceRef::DataAttachment { form, .. } => form,
        }
    }

    pub fn is_draft(&self) -> bool {
        match self {
            ResourceRef::FormData { draft, .. } | ResourceRef::DataAttachment { draft, .. } => {
                *draft
            }
            _ => false,
        }
    }

    pub fn document_id(&self) -> Option<&Segment> {
        match self {
            ResourceRef::FormData { id, .. } | ResourceRef::DataAttachment { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn attachment_name(&self) -> Option<&Segment> {
        match self {
            ResourceRef::FormAttachment { name, .. } | ResourceRef::DataAttachment { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }

    pub fn scope(&self) -> FormScope {
        FormScope {
            app: self.app().clone(),
            form: self.form().clone(),
        }
    }
}

/// Outcome of path resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Route {
    Resource(ResourceRef),
    Search(FormScope),
}
