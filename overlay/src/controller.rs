//! Popup state machine.
//!
//! DESIGN
//! ======
//! `Controller` is sans-IO: every entry point takes an event and returns the
//! [`Action`]s the host must perform, in order. It never awaits, sleeps, or
//! touches the page. The [`Driver`](crate::Driver) turns actions into store
//! calls, timers, and surface updates, and feeds their outcomes back in as
//! [`Event`]s.
//!
//! The popup slot holds at most one occupant. Every transition that opens a
//! popup first retires the current one (emitting `ClosePopup` if it is on
//! screen) and mints a fresh token, so a visible popup is always the only one.
//!
//! Content is owned here between passes: the anchoring engine rewrites it on
//! load and after each successful create, and the result is handed to the
//! surface with `InstallContent`. The surface is the only writer of the page.

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anchor::annotation::is_valid_context;
use anchor::{AnchorResult, Annotation, AnnotationId, anchor, markers, wrap_new};
use wire::{AnnotationDetail, AnnotationRecord, CreatedAnnotation, DocumentId};

use crate::config::OverlayConfig;
use crate::geometry::{Placement, Viewport, place_compose, place_detail};
use crate::input::{Event, HighlightRef, Selection};
use crate::popup::{ComposeView, DetailView, PopupState, PopupToken, PopupView, RequestId, TimerId};
use crate::store::{Identity, StoreError};

/// Work the host performs on the controller's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replace the annotatable container's content.
    InstallContent(String),
    /// Highlights for these annotations are on the page and need listeners.
    HighlightAttached(Vec<AnnotationId>),
    /// Remove every listener the overlay installed.
    DetachListeners,
    ShowPopup { token: PopupToken, view: PopupView, placement: Placement },
    ClosePopup(PopupToken),
    StartTimer { id: TimerId, after: Duration },
    CancelTimer(TimerId),
    FetchAnnotations { document_id: DocumentId },
    CreateAnnotation {
        request: RequestId,
        document_id: DocumentId,
        context_text: String,
        comment_text: String,
        actor_id: Option<String>,
    },
    FetchDetail { token: PopupToken, annotation_id: AnnotationId },
    RedirectToSignIn { url: String },
    ReportError { message: String },
}

/// Pointer resting on a highlight, waiting out the dwell.
#[derive(Debug, Clone, Copy)]
struct Hover {
    timer: TimerId,
    highlight: HighlightRef,
}

/// Submitted draft waiting for the store.
#[derive(Debug, Clone)]
struct PendingCreate {
    selection: Selection,
    draft: String,
}

/// Interaction controller for one document view.
pub struct Controller {
    config: OverlayConfig,
    identity: Arc<dyn Identity>,
    content: String,
    annotations: Vec<Annotation>,
    popup: PopupState,
    hover: Option<Hover>,
    creates: HashMap<RequestId, PendingCreate>,
    viewport: Viewport,
    next_id: u64,
    torn_down: bool,
}

impl Controller {
    pub fn new(config: OverlayConfig, identity: Arc<dyn Identity>) -> Self {
        Self {
            config,
            identity,
            content: String::new(),
            annotations: Vec::new(),
            popup: PopupState::Idle,
            hover: None,
            creates: HashMap::new(),
            viewport: Viewport::default(),
            next_id: 0,
            torn_down: false,
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Take ownership of the page's current content and request the
    /// document's annotations.
    pub fn start(&mut self, content: impl Into<String>) -> Vec<Action> {
        if self.torn_down {
            return Vec::new();
        }
        self.content = content.into();
        tracing::debug!(document_id = %self.config.document_id, len = self.content.len(), "overlay started");
        vec![Action::FetchAnnotations { document_id: self.config.document_id.clone() }]
    }

    /// Close everything and stop reacting to events.
    pub fn teardown(&mut self) -> Vec<Action> {
        if self.torn_down {
            return Vec::new();
        }
        let mut out = Vec::new();
        self.cancel_hover(&mut out);
        self.close_popup(&mut out);
        self.creates.clear();
        out.push(Action::DetachListeners);
        self.torn_down = true;
        tracing::debug!(document_id = %self.config.document_id, "overlay torn down");
        out
    }

    /// Apply one event.
    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        if self.torn_down {
            tracing::trace!(event = event.name(), "event after teardown ignored");
            return Vec::new();
        }
        let mut out = Vec::new();
        match event {
            Event::Selected(selection) => self.on_selected(selection, &mut out),
            Event::DraftChanged(text) => {
                if let PopupState::Composing { draft, .. } = &mut self.popup {
                    *draft = text;
                }
            }
            Event::Submit => self.on_submit(&mut out),
            Event::Cancel => {
                if matches!(self.popup, PopupState::Composing { .. }) {
                    self.close_popup(&mut out);
                }
            }
            Event::KeyDown(key) => {
                if key.is_escape() {
                    self.cancel_hover(&mut out);
                    self.close_popup(&mut out);
                }
            }
            Event::HighlightEnter(highlight) => self.on_highlight_enter(highlight, &mut out),
            Event::HighlightLeave(id) => {
                if self.hover.is_some_and(|h| h.highlight.annotation_id == id) {
                    self.cancel_hover(&mut out);
                }
            }
            Event::HighlightClick(highlight) => {
                self.cancel_hover(&mut out);
                self.begin_detail(highlight, &mut out);
            }
            Event::PopupEnter => self.restart_dismiss(&mut out),
            Event::OutsideClick => self.on_outside_click(&mut out),
            Event::ViewportChanged(viewport) => self.viewport = viewport,
            Event::TimerFired(id) => self.on_timer(id, &mut out),
            Event::Loaded(result) => self.on_loaded(result, &mut out),
            Event::Created { request, result } => self.on_created(request, result, &mut out),
            Event::DetailLoaded { token, result } => self.on_detail(token, result, &mut out),
        }
        out
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    #[must_use]
    pub fn state(&self) -> &PopupState {
        &self.popup
    }

    /// Content as last installed.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Annotations known to this view, loaded and created.
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    #[must_use]
    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Creates submitted and not yet answered.
    #[must_use]
    pub fn pending_creates(&self) -> usize {
        self.creates.len()
    }

    // =========================================================================
    // GESTURES
    // =========================================================================

    fn on_selected(&mut self, selection: Selection, out: &mut Vec<Action>) {
        if selection.on_highlight {
            return;
        }
        let text = selection.text.trim();
        if !is_valid_context(text) {
            return;
        }
        if !self.identity.is_authenticated() {
            let url = self.identity.sign_in_url(&self.config.location);
            tracing::info!(location = %self.config.location, "selection while signed out; redirecting to sign-in");
            out.push(Action::RedirectToSignIn { url });
            return;
        }
        let selection = Selection { text: text.to_owned(), ..selection };
        self.open_compose(selection, String::new(), None, out);
    }

    fn on_submit(&mut self, out: &mut Vec<Action>) {
        let PopupState::Composing { selection, draft, .. } = &self.popup else {
            return;
        };
        let comment = draft.trim().to_owned();
        if comment.is_empty() {
            return;
        }
        let pending = PendingCreate { selection: selection.clone(), draft: draft.clone() };

        let request = RequestId(self.mint());
        self.close_popup(out);
        out.push(Action::CreateAnnotation {
            request,
            document_id: self.config.document_id.clone(),
            context_text: pending.selection.text.clone(),
            comment_text: comment,
            actor_id: self.identity.current_actor_id(),
        });
        tracing::debug!(%request, "annotation submitted");
        self.creates.insert(request, pending);
    }

    fn on_highlight_enter(&mut self, highlight: HighlightRef, out: &mut Vec<Action>) {
        if let PopupState::DetailShown { annotation_id, .. } = self.popup {
            if annotation_id == highlight.annotation_id {
                self.restart_dismiss(out);
                return;
            }
        }
        if matches!(self.popup, PopupState::Composing { .. }) {
            return;
        }
        if self.hover.is_some_and(|h| h.highlight.annotation_id == highlight.annotation_id) {
            return;
        }
        self.cancel_hover(out);
        let timer = TimerId(self.mint());
        out.push(Action::StartTimer { id: timer, after: self.config.hover_delay });
        self.hover = Some(Hover { timer, highlight });
    }

    fn on_outside_click(&mut self, out: &mut Vec<Action>) {
        let close = match &self.popup {
            PopupState::Idle => false,
            PopupState::Composing { draft, .. } => draft.trim().is_empty(),
            PopupState::DetailPending { .. } | PopupState::DetailShown { .. } => true,
        };
        if close {
            self.close_popup(out);
        }
    }

    // =========================================================================
    // COMPLETIONS
    // =========================================================================

    fn on_timer(&mut self, id: TimerId, out: &mut Vec<Action>) {
        if let Some(hover) = self.hover.filter(|h| h.timer == id) {
            self.hover = None;
            self.begin_detail(hover.highlight, out);
            return;
        }
        if let PopupState::DetailShown { dismiss, token, .. } = self.popup {
            if dismiss == id {
                tracing::debug!(%token, "detail popup dismissed after inactivity");
                self.close_popup(out);
                return;
            }
        }
        tracing::trace!(timer = %id, "stale timer ignored");
    }

    fn on_loaded(&mut self, result: Result<Vec<AnnotationRecord>, StoreError>, out: &mut Vec<Action>) {
        let records = match result {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(document_id = %self.config.document_id, error = %e, "loading annotations failed");
                return;
            }
        };

        let mut loaded: Vec<Annotation> = Vec::with_capacity(records.len());
        for record in records {
            let annotation = record.into_annotation();
            if !is_valid_context(&annotation.context_text) {
                tracing::warn!(annotation_id = %annotation.id, "stored annotation has empty context; skipped");
                continue;
            }
            if loaded.iter().any(|a| a.id == annotation.id) {
                continue;
            }
            loaded.push(annotation);
        }

        let anchored = anchor(&self.content, &loaded, &self.config.anchor);
        tracing::info!(
            document_id = %self.config.document_id,
            total = loaded.len(),
            matched = anchored.matched_count(),
            "annotations anchored"
        );
        let attached: Vec<AnnotationId> =
            anchored.results.iter().filter(|r| r.is_matched()).map(|r| r.annotation_id).collect();

        self.annotations = loaded;
        if anchored.content != self.content {
            self.content = anchored.content;
            out.push(Action::InstallContent(self.content.clone()));
        }
        if !attached.is_empty() {
            out.push(Action::HighlightAttached(attached));
        }
    }

    fn on_created(
        &mut self,
        request: RequestId,
        result: Result<CreatedAnnotation, StoreError>,
        out: &mut Vec<Action>,
    ) {
        let Some(pending) = self.creates.remove(&request) else {
            tracing::trace!(%request, "unknown create completion ignored");
            return;
        };

        match result {
            Ok(created) => {
                let annotation = created.into_annotation();
                let anchored = wrap_new(&self.content, &annotation, &self.config.anchor);
                let matched = anchored.result_for(annotation.id).is_some_and(AnchorResult::is_matched);
                tracing::info!(annotation_id = %annotation.id, matched, "annotation created");
                if matched {
                    self.content = anchored.content;
                    out.push(Action::InstallContent(self.content.clone()));
                    out.push(Action::HighlightAttached(vec![annotation.id]));
                } else {
                    tracing::warn!(annotation_id = %annotation.id, "created annotation did not anchor in current content");
                }
                self.annotations.push(annotation);
            }
            Err(StoreError::NotAuthenticated) => {
                tracing::info!(%request, "create rejected: not signed in");
                out.push(Action::RedirectToSignIn { url: self.identity.sign_in_url(&self.config.location) });
            }
            Err(e) => {
                tracing::warn!(%request, error = %e, "create failed");
                let message = e.to_string();
                out.push(Action::ReportError { message: message.clone() });
                if self.popup.is_idle() {
                    self.open_compose(pending.selection, pending.draft, Some(message), out);
                }
            }
        }
    }

    fn on_detail(&mut self, token: PopupToken, result: Result<AnnotationDetail, StoreError>, out: &mut Vec<Action>) {
        let PopupState::DetailPending { token: current, annotation_id, anchor: rect } = self.popup else {
            tracing::trace!(%token, "detail for closed popup ignored");
            return;
        };
        if current != token {
            tracing::trace!(%token, %current, "detail for replaced popup ignored");
            return;
        }

        let view = match result {
            Ok(detail) if detail.id == annotation_id => DetailView::from_detail(detail),
            Ok(detail) => {
                tracing::warn!(expected = %annotation_id, got = %detail.id, "detail id mismatch; using local metadata");
                self.fallback_view(annotation_id)
            }
            Err(e) => {
                tracing::debug!(%annotation_id, error = %e, "detail unavailable; using local metadata");
                self.fallback_view(annotation_id)
            }
        };

        let dismiss = TimerId(self.mint());
        let placement = place_detail(rect, self.viewport, &self.config);
        self.popup = PopupState::DetailShown { token, annotation_id, dismiss };
        out.push(Action::ShowPopup { token, view: PopupView::Detail(view), placement });
        out.push(Action::StartTimer { id: dismiss, after: self.config.dismiss_after });
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    fn mint(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Retire the current occupant of the popup slot.
    fn close_popup(&mut self, out: &mut Vec<Action>) {
        match std::mem::take(&mut self.popup) {
            PopupState::Idle => {}
            PopupState::Composing { token, .. } => out.push(Action::ClosePopup(token)),
            PopupState::DetailPending { token, .. } => {
                tracing::trace!(%token, "pending detail abandoned");
            }
            PopupState::DetailShown { token, dismiss, .. } => {
                out.push(Action::CancelTimer(dismiss));
                out.push(Action::ClosePopup(token));
            }
        }
    }

    fn cancel_hover(&mut self, out: &mut Vec<Action>) {
        if let Some(hover) = self.hover.take() {
            out.push(Action::CancelTimer(hover.timer));
        }
    }

    fn open_compose(&mut self, selection: Selection, draft: String, error: Option<String>, out: &mut Vec<Action>) {
        self.cancel_hover(out);
        self.close_popup(out);
        let token = PopupToken(self.mint());
        let placement = place_compose(selection.rect, self.viewport, &self.config);
        let view = PopupView::Compose(ComposeView { context_text: selection.text.clone(), draft: draft.clone(), error });
        out.push(Action::ShowPopup { token, view, placement });
        self.popup = PopupState::Composing { token, selection, draft };
    }

    fn begin_detail(&mut self, highlight: HighlightRef, out: &mut Vec<Action>) {
        self.close_popup(out);
        let token = PopupToken(self.mint());
        self.popup =
            PopupState::DetailPending { token, annotation_id: highlight.annotation_id, anchor: highlight.rect };
        out.push(Action::FetchDetail { token, annotation_id: highlight.annotation_id });
    }

    fn restart_dismiss(&mut self, out: &mut Vec<Action>) {
        let PopupState::DetailShown { dismiss, .. } = self.popup else {
            return;
        };
        let next = TimerId(self.mint());
        out.push(Action::CancelTimer(dismiss));
        out.push(Action::StartTimer { id: next, after: self.config.dismiss_after });
        if let PopupState::DetailShown { dismiss, .. } = &mut self.popup {
            *dismiss = next;
        }
    }

    /// Detail built from the highlight marker on the page, or from the
    /// loaded annotation when the marker is gone.
    fn fallback_view(&self, annotation_id: AnnotationId) -> DetailView {
        let id = annotation_id.to_string();
        if let Some(marker) = markers(&self.content).into_iter().find(|m| m.id == id) {
            return DetailView::fallback(annotation_id, &marker.comment);
        }
        match self.annotations.iter().find(|a| a.id == annotation_id) {
            Some(annotation) => DetailView::from_annotation(annotation),
            None => DetailView::fallback(annotation_id, ""),
        }
    }
}
