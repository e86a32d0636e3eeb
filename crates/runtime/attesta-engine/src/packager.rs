use attesta_types::affidavit::PartySnapshot;
use attesta_types::content::{AttachmentId, ContentStore, UploadStore};
use attesta_types::content_ref::ContentRef;
use attesta_types::error::ProtocolError;
use attesta_types::request::AffidavitRequest;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// An attachment after it has been copied into the content store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PackagedAttachment {
    pub file_name: String,
    pub media_type: String,
    pub content_ref: ContentRef,
}

/// The schema of the single metadata blob anchored per affidavit. The
/// blob commits to every descriptive field, so the ledger only needs to
/// carry its content reference.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AffidavitMetadata {
    pub title: String,
    pub category: String,
    pub description: String,
    pub declaration: String,
    pub details: HashMap<String, serde_json::Value>,
    pub parties: Vec<PartySnapshot>,
    pub attachments: Vec<PackagedAttachment>,
}

impl AffidavitMetadata {
    pub fn from_parts(
        request: &AffidavitRequest,
        parties: &[PartySnapshot],
        attachments: &[PackagedAttachment],
    ) -> Self {
        AffidavitMetadata {
            title: request.title.clone(),
            category: request.category.clone(),
            description: request.description.clone(),
            declaration: request.declaration.clone(),
            details: request.details.clone(),
            parties: parties.to_vec(),
            attachments: attachments.to_vec(),
        }
    }
}

/// Copies a request's attachments into the content store and bundles the
/// descriptive fields into one content-addressed metadata blob.
#[derive(Clone)]
pub struct MetadataPackager {
    uploads: Arc<dyn UploadStore>,
    contents: Arc<dyn ContentStore>,
}

impl MetadataPackager {
    pub fn new(uploads: Arc<dyn UploadStore>, contents: Arc<dyn ContentStore>) -> Self {
        MetadataPackager { uploads, contents }
    }

    /// Push every referenced attachment. The first failure aborts the
    /// whole operation; a partial attachment set is never returned.
    pub async fn package_attachments(
        &self,
        ids: &[AttachmentId],
    ) -> Result<Vec<PackagedAttachment>, ProtocolError> {
        let mut packaged = Vec::with_capacity(ids.len());
        for id in ids {
            let upload = self
                .uploads
                .fetch(id)
                .await
                .map_err(|e| ProtocolError::StorageUnavailable(e.to_string()))?
                .ok_or_else(|| {
                    ProtocolError::StorageUnavailable(format!(
                        "attachment {} missing from upload store",
                        id
                    ))
                })?;
            let content_ref = self
                .contents
                .push(&upload.bytes)
                .await
                .map_err(|e| ProtocolError::StorageUnavailable(e.to_string()))?;
            packaged.push(PackagedAttachment {
                file_name: upload.file_name,
                media_type: upload.media_type,
                content_ref,
            });
        }
        Ok(packaged)
    }

    /// Push the metadata blob, returning its content reference.
    pub async fn package_metadata(
        &self,
        metadata: &AffidavitMetadata,
    ) -> Result<ContentRef, ProtocolError> {
        let value = serde_json::to_value(metadata)
            .map_err(|e| ProtocolError::StorageUnavailable(e.to_string()))?;
        self.contents
            .push_json(&value)
            .await
            .map_err(|e| ProtocolError::StorageUnavailable(e.to_string()))
    }
}
