//! Pipeline orchestration: the translate and edit workflows.
//!
//! Composes Extractor -> Translator -> Rebuilder -> Storage into the
//! end-to-end operations, owns error classification at the workflow
//! level, and tracks every invocation through an explicit state machine.
//! CPU-bound steps run on the blocking pool so request-handling threads
//! never stall on parsing or OCR.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{FileType, Lang};
use crate::editor::{EditOutcome, EditSpec, PdfEditor};
use crate::error::{Error, Result};
use crate::extract::ContentExtractor;
use crate::rebuild::DocumentRebuilder;
use crate::storage::{DocumentHandle, StorageAdapter, VersionHandle};
use crate::translate::TranslationService;

/// All states of a translate-workflow invocation.
///
/// A workflow walks the happy path strictly in order; `Failed` is the
/// single terminal error state, unreachable only after persistence has
/// been acknowledged (`Done`). There are no retry loop-backs across
/// steps: retries live inside the Translator alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    Received,
    Extracting,
    Translating,
    Rebuilding,
    Persisting,
    Done,
    Failed,
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Received => "Received",
            Self::Extracting => "Extracting",
            Self::Translating => "Translating",
            Self::Rebuilding => "Rebuilding",
            Self::Persisting => "Persisting",
            Self::Done => "Done",
            Self::Failed => "Failed",
        };
        write!(f, "{name}")
    }
}

impl WorkflowState {
    /// Returns whether transitioning from `self` to `next` is valid.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Received, Self::Extracting)
                | (Self::Extracting, Self::Translating)
                | (Self::Translating, Self::Rebuilding)
                | (Self::Rebuilding, Self::Persisting)
                | (Self::Persisting, Self::Done)
        ) || (next == Self::Failed && !matches!(self, Self::Done | Self::Failed))
    }
}

/// Per-invocation workflow tracker with validated, traced transitions.
struct Workflow {
    id: Uuid,
    state: WorkflowState,
}

impl Workflow {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: WorkflowState::Received,
        }
    }

    fn advance(&mut self, next: WorkflowState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid workflow transition {} -> {}",
            self.state,
            next
        );
        info!(workflow = %self.id, from = %self.state, to = %next, "workflow transition");
        self.state = next;
    }

    fn fail(&mut self, err: &Error) {
        error!(
            workflow = %self.id,
            state = %self.state,
            code = err.code(),
            detail = %err,
            "workflow failed"
        );
        self.state = WorkflowState::Failed;
    }
}

/// Input to the translate workflow.
#[derive(Debug, Clone)]
pub struct TranslateRequest {
    pub owner_id: String,
    pub filename: String,
    pub bytes: Bytes,
    pub file_type: FileType,
    pub target_lang: Lang,
}

/// Outcome of the translate workflow.
#[derive(Debug, Clone)]
pub struct TranslatedDocument {
    pub document: DocumentHandle,
    pub version: VersionHandle,
    /// Best-known source language of the original
    pub source_lang: Lang,
    /// False when the passthrough fallback fired and the artifact carries
    /// the untranslated text
    pub translated: bool,
}

/// Outcome of the edit workflow.
#[derive(Debug, Clone)]
pub struct EditedVersion {
    pub version: VersionHandle,
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

/// The orchestrator. One instance per process, safe for concurrent
/// workflows; every collaborator behind it is shared and thread-safe.
pub struct DocumentPipeline {
    extractor: Arc<ContentExtractor>,
    translator: TranslationService,
    rebuilder: Arc<DocumentRebuilder>,
    editor: Arc<PdfEditor>,
    storage: Arc<StorageAdapter>,
}

impl DocumentPipeline {
    pub fn new(
        extractor: Arc<ContentExtractor>,
        translator: TranslationService,
        rebuilder: Arc<DocumentRebuilder>,
        storage: Arc<StorageAdapter>,
    ) -> Self {
        Self {
            extractor,
            translator,
            rebuilder,
            editor: Arc::new(PdfEditor::new()),
            storage,
        }
    }

    pub fn storage(&self) -> &Arc<StorageAdapter> {
        &self.storage
    }

    /// Translate workflow: extract -> translate -> rebuild -> persist.
    ///
    /// All-or-nothing: extraction and rebuild failures abort before any
    /// write. Translation failures never abort (passthrough policy); the
    /// outcome's `translated` flag reports them.
    pub async fn translate_document(
        &self,
        request: TranslateRequest,
    ) -> Result<TranslatedDocument> {
        let mut workflow = Workflow::new();
        let result = self.translate_inner(&mut workflow, request).await;
        if let Err(e) = &result {
            workflow.fail(e);
        }
        result
    }

    async fn translate_inner(
        &self,
        workflow: &mut Workflow,
        request: TranslateRequest,
    ) -> Result<TranslatedDocument> {
        workflow.advance(WorkflowState::Extracting);
        let extracted = {
            let extractor = Arc::clone(&self.extractor);
            let bytes = request.bytes.clone();
            let file_type = request.file_type;
            tokio::task::spawn_blocking(move || extractor.extract(&bytes, file_type))
                .await
                .map_err(|e| Error::Extraction(format!("extraction task panicked: {e}")))??
        };

        workflow.advance(WorkflowState::Translating);
        let translation = self
            .translator
            .translate(&extracted.text, &request.target_lang, &extracted.language)
            .await;
        if !translation.translated {
            warn!(
                filename = %request.filename,
                "translation degraded to passthrough, persisting original text"
            );
        }

        workflow.advance(WorkflowState::Rebuilding);
        let rebuilt = {
            let rebuilder = Arc::clone(&self.rebuilder);
            let bytes = request.bytes.clone();
            let file_type = request.file_type;
            let text = translation.text.clone();
            tokio::task::spawn_blocking(move || rebuilder.rebuild(&bytes, &text, file_type))
                .await
                .map_err(|e| Error::Rebuild(format!("rebuild task panicked: {e}")))??
        };

        workflow.advance(WorkflowState::Persisting);
        let document = self
            .storage
            .save_document(
                &request.owner_id,
                &request.filename,
                &request.bytes,
                request.file_type,
                &translation.source_lang,
            )
            .await?;
        let version = self
            .storage
            .save_version(&document.id, &rebuilt, Some(&request.target_lang), None)
            .await?;

        workflow.advance(WorkflowState::Done);
        info!(
            document_id = %document.id,
            version_id = %version.id,
            translated = translation.translated,
            "translate workflow complete"
        );

        Ok(TranslatedDocument {
            document,
            version,
            source_lang: translation.source_lang,
            translated: translation.translated,
        })
    }

    /// Edit workflow: load the latest version of an owned document, apply
    /// the edit spec, persist the result as a new version.
    ///
    /// Fails with `Error::NotFound` when the document does not exist or
    /// does not belong to `owner_id`. The prior version is never touched.
    pub async fn edit_document(
        &self,
        owner_id: &str,
        document_id: &str,
        spec: EditSpec,
    ) -> Result<EditedVersion> {
        let document = self
            .storage
            .get_document(document_id, owner_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("document {document_id}")))?;

        if document.file_type != FileType::Pdf {
            return Err(Error::Edit(format!(
                "only PDF documents can be edited, {} is {}",
                document_id, document.file_type
            )));
        }

        // Edits stack on the newest artifact; a document with no versions
        // yet is edited from its original content.
        let base_content = match self.storage.get_latest_version(document_id).await? {
            Some(version) => version.content,
            None => document.content,
        };

        let outcome: EditOutcome = {
            let editor = Arc::clone(&self.editor);
            let spec = spec.clone();
            tokio::task::spawn_blocking(move || editor.edit(&base_content, &spec))
                .await
                .map_err(|e| Error::Edit(format!("edit task panicked: {e}")))??
        };

        let annotations = if spec.annotations.is_empty() {
            None
        } else {
            Some(
                serde_json::to_value(&spec.annotations)
                    .map_err(|e| Error::Edit(format!("unserializable annotations: {e}")))?,
            )
        };

        let version = self
            .storage
            .save_version(document_id, &outcome.bytes, None, annotations.as_ref())
            .await?;

        info!(
            document_id,
            version_id = %version.id,
            applied = outcome.applied.len(),
            skipped = outcome.skipped.len(),
            "edit workflow complete"
        );

        Ok(EditedVersion {
            version,
            applied: outcome.applied,
            skipped: outcome.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_valid() {
        let order = [
            WorkflowState::Received,
            WorkflowState::Extracting,
            WorkflowState::Translating,
            WorkflowState::Rebuilding,
            WorkflowState::Persisting,
            WorkflowState::Done,
        ];
        for pair in order.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be valid",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn no_step_can_be_skipped() {
        assert!(!WorkflowState::Received.can_transition_to(WorkflowState::Translating));
        assert!(!WorkflowState::Extracting.can_transition_to(WorkflowState::Rebuilding));
        assert!(!WorkflowState::Translating.can_transition_to(WorkflowState::Persisting));
        assert!(!WorkflowState::Rebuilding.can_transition_to(WorkflowState::Done));
    }

    #[test]
    fn no_backwards_transitions() {
        assert!(!WorkflowState::Translating.can_transition_to(WorkflowState::Extracting));
        assert!(!WorkflowState::Done.can_transition_to(WorkflowState::Received));
    }

    #[test]
    fn failed_is_reachable_until_persistence_is_acknowledged() {
        assert!(WorkflowState::Received.can_transition_to(WorkflowState::Failed));
        assert!(WorkflowState::Extracting.can_transition_to(WorkflowState::Failed));
        assert!(WorkflowState::Persisting.can_transition_to(WorkflowState::Failed));
        assert!(!WorkflowState::Done.can_transition_to(WorkflowState::Failed));
        assert!(!WorkflowState::Failed.can_transition_to(WorkflowState::Failed));
    }
}
