//! Address Mapper: [`ResourceRef`] to Document Store location and collection tags.
//!
//! Layout under `/<ns>/fr/<app>/<form>/`:
//!
//! | resource                      | location                              |
//! |-------------------------------|---------------------------------------|
//! | form definition               | `definition.xml`                      |
//! | form attachment               | `form/<name>`                         |
//! | form data                     | `data/<id>.xml`                       |
//! | rendered data (`data.xhtml`)  | `data/<id>.xhtml`                     |
//! | data attachment               | `data/attachments/<id>/<name>`        |
//!
//! Drafts use `draft/` in place of `data/`. Every identifier is percent-encoded
//! before it is placed in a location or tag, so an identifier can never introduce
//! a `/` and the layout stays unambiguous.

use crate::core::store::{Location, TagSet};
use crate::gateway::resource::{FormScope, RENDERED_DATA_NAME, ResourceRef, Segment};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Everything except RFC 3986 unreserved characters.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub const TAG_FORM_DEFINITIONS: &str = "formdefinitions";
pub const TAG_FORM_DATA: &str = "formdata";
pub const TAG_ATTACHMENT: &str = "attachment";
pub const TAG_DRAFT: &str = "draft";
pub const SUFFIX_DATA_XML: &str = "formdataxml";
pub const SUFFIX_DATA_HTML: &str = "formdatahtml";
pub const SUFFIX_ATTACHMENT: &str = "attachment";

fn enc(segment: &Segment) -> String {
    utf8_percent_encode(segment.as_str(), SEGMENT).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressMapper {
    namespace: String,
}

impl AddressMapper {
    /// `namespace` is expected to be validated configuration (see `GatewayConfig::validate`).
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn root_tag(&self) -> String {
        format!("{}/fr", self.namespace)
    }

    fn base(&self, scope: &FormScope) -> String {
        format!(
            "/{}/fr/{}/{}",
            self.namespace,
            enc(&scope.app),
            enc(&scope.form)
        )
    }

    fn scope_tags(&self, scope: &FormScope) -> TagSet {
        let mut tags = TagSet::new();
        tags.insert(self.root_tag());
        tags.insert(format!("app/{}", enc(&scope.app)));
        tags.insert(format!("form/{}", enc(&scope.form)));
        tags
    }

    /// Tags every search in `scope` is restricted to.
    pub fn search_tags(&self, scope: &FormScope) -> TagSet {
        let mut tags = self.scope_tags(scope);
        tags.insert(TAG_FORM_DATA);
        tags
    }

    pub fn location(&self, resource: &ResourceRef) -> Location {
        self.map(resource).0
    }

    pub fn map(&self, resource: &ResourceRef) -> (Location, TagSet) {
        let scope = resource.scope();
        let base = self.base(&scope);
        let mut tags = self.scope_tags(&scope);

        let location = match resource {
            ResourceRef::FormDefinition { .. } => {
                tags.insert(TAG_FORM_DEFINITIONS);
                format!("{base}/definition.xml")
            }
            ResourceRef::FormAttachment { name, .. } => {
                tags.insert(TAG_FORM_DEFINITIONS);
                tags.insert(TAG_ATTACHMENT);
                format!("{base}/form/{}", enc(name))
            }
            ResourceRef::FormData { id, draft, .. } => {
                let id = enc(id);
                tags.insert(TAG_FORM_DATA);
                tags.insert(format!("{id}{SUFFIX_DATA_XML}"));
                format!("{base}/{}/{id}.xml", data_dir(*draft))
            }
            ResourceRef::DataAttachment { id, draft, name, .. }
                if name.as_str() == RENDERED_DATA_NAME =>
            {
                let id = enc(id);
                tags.insert(TAG_FORM_DATA);
                tags.insert(format!("{id}{SUFFIX_DATA_HTML}"));
                format!("{base}/{}/{id}.xhtml", data_dir(*draft))
            }
            ResourceRef::DataAttachment { id, draft, name, .. } => {
                let id = enc(id);
                tags.insert(TAG_FORM_DATA);
                tags.insert(TAG_ATTACHMENT);
                tags.insert(format!("{id}{SUFFIX_ATTACHMENT}"));
                format!("{base}/{}/attachments/{id}/{}", data_dir(*draft), enc(name))
            }
        };

        if resource.is_draft() {
            tags.insert(TAG_DRAFT);
        }

        (Location::new(location), tags)
    }
}

fn data_dir(draft: bool) -> &'static str {
    if draft { "draft" } else { "data" }
}

/// Recover the (decoded) document id from an instance-scoped tag, if the set has one.
pub fn instance_id(tags: &TagSet) -> Option<String> {
    tags.iter()
        .filter(|tag| *tag != TAG_ATTACHMENT && !tag.contains('/'))
        .find_map(|tag| {
            [SUFFIX_DATA_XML, SUFFIX_DATA_HTML, SUFFIX_ATTACHMENT]
                .into_iter()
                .find_map(|suffix| tag.strip_suffix(suffix))
                .filter(|id| !id.is_empty())
        })
        .and_then(|id| {
            percent_encoding::percent_decode_str(id)
                .decode_utf8()
                .ok()
                .map(|s| s.into_owned())
        })
}
