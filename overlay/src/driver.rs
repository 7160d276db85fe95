//! Async executor for controller actions.
//!
//! ARCHITECTURE
//! ============
//! One task owns the [`Controller`], the [`Surface`], the armed timers, and
//! every in-flight store call. Its loop selects over three sources:
//!
//! ```text
//!   gestures (mpsc) ──┐
//!   earliest timer ───┼──► Controller::handle ──► actions ──► surface / store / timers
//!   store futures ────┘
//! ```
//!
//! Each event is handled to completion, including any anchoring pass and
//! surface update, before the next one is taken. Store calls never block the
//! loop: they are queued as futures and their outcomes come back as events.
//! A timer is disarmed by removing it from the table, so a cancelled timer
//! can never fire.

#[cfg(test)]
#[path = "driver_test.rs"]
mod driver_test;

use std::collections::HashMap;
use std::sync::Arc;

use anchor::AnnotationId;
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use crate::controller::{Action, Controller};
use crate::geometry::Placement;
use crate::input::Event;
use crate::popup::{PopupToken, PopupView, TimerId};
use crate::store::CommentStore;

/// The page the overlay decorates.
pub trait Surface: Send {
    /// Current content of the annotatable container.
    fn content(&self) -> String;

    /// Replace the container's content. The only place the page is written.
    fn install_content(&mut self, content: &str);

    fn attach_highlights(&mut self, ids: &[AnnotationId]);

    fn detach_listeners(&mut self);

    fn show_popup(&mut self, token: PopupToken, view: &PopupView, placement: Placement);

    fn close_popup(&mut self, token: PopupToken);

    fn navigate(&mut self, url: &str);

    fn report_error(&mut self, message: &str);
}

/// Runs one controller against its collaborators.
pub struct Driver<S: Surface> {
    controller: Controller,
    store: Arc<dyn CommentStore>,
    surface: S,
    timers: HashMap<TimerId, Instant>,
    in_flight: FuturesUnordered<BoxFuture<'static, Event>>,
}

impl<S: Surface> Driver<S> {
    pub fn new(controller: Controller, store: Arc<dyn CommentStore>, surface: S) -> Self {
        Self { controller, store, surface, timers: HashMap::new(), in_flight: FuturesUnordered::new() }
    }

    #[must_use]
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Timers currently armed.
    #[must_use]
    pub fn armed_timers(&self) -> usize {
        self.timers.len()
    }

    /// Hand the surface's content to the controller and start loading.
    pub fn start(&mut self) {
        let content = self.surface.content();
        let actions = self.controller.start(content);
        self.apply(actions);
    }

    /// Handle one event synchronously.
    pub fn dispatch(&mut self, event: Event) {
        tracing::trace!(event = event.name(), state = self.controller.state().name(), "dispatch");
        let actions = self.controller.handle(event);
        self.apply(actions);
    }

    /// Await every in-flight store call, dispatching each outcome.
    pub async fn settle(&mut self) {
        while let Some(event) = self.in_flight.next().await {
            self.dispatch(event);
        }
    }

    /// Tear the controller down and apply its final actions.
    pub fn shutdown(&mut self) {
        let actions = self.controller.teardown();
        self.apply(actions);
        self.timers.clear();
        self.in_flight = FuturesUnordered::new();
    }

    /// Event loop. Returns the surface once the gesture channel closes.
    pub async fn run(mut self, mut gestures: mpsc::Receiver<Event>) -> S {
        self.start();
        loop {
            let deadline = self.next_deadline();
            let sleep_until = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                gesture = gestures.recv() => match gesture {
                    Some(event) => self.dispatch(event),
                    None => break,
                },
                Some(event) = self.in_flight.next(), if !self.in_flight.is_empty() => self.dispatch(event),
                () = tokio::time::sleep_until(sleep_until), if deadline.is_some() => self.fire_due(),
            }
        }
        tracing::debug!("gesture channel closed; shutting down overlay");
        self.shutdown();
        self.surface
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().min().copied()
    }

    /// Fire every timer whose deadline has passed, earliest first.
    fn fire_due(&mut self) {
        let now = Instant::now();
        let mut due: Vec<(Instant, TimerId)> =
            self.timers.iter().filter(|&(_, at)| *at <= now).map(|(id, at)| (*at, *id)).collect();
        due.sort();
        for (_, id) in due {
            if self.timers.remove(&id).is_some() {
                self.dispatch(Event::TimerFired(id));
            }
        }
    }

    fn apply(&mut self, actions: Vec<Action>) {
        for action in actions {
            self.apply_one(action);
        }
    }

    fn apply_one(&mut self, action: Action) {
        match action {
            Action::InstallContent(content) => self.surface.install_content(&content),
            Action::HighlightAttached(ids) => self.surface.attach_highlights(&ids),
            Action::DetachListeners => self.surface.detach_listeners(),
            Action::ShowPopup { token, view, placement } => self.surface.show_popup(token, &view, placement),
            Action::ClosePopup(token) => self.surface.close_popup(token),
            Action::StartTimer { id, after } => {
                self.timers.insert(id, Instant::now() + after);
            }
            Action::CancelTimer(id) => {
                self.timers.remove(&id);
            }
            Action::FetchAnnotations { document_id } => {
                let store = Arc::clone(&self.store);
                self.in_flight.push(Box::pin(async move { Event::Loaded(store.list_approved(&document_id).await) }));
            }
            Action::CreateAnnotation { request, document_id, context_text, comment_text, actor_id } => {
                let store = Arc::clone(&self.store);
                self.in_flight.push(Box::pin(async move {
                    let result = store.create(&document_id, &context_text, &comment_text, actor_id.as_deref()).await;
                    Event::Created { request, result }
                }));
            }
            Action::FetchDetail { token, annotation_id } => {
                let store = Arc::clone(&self.store);
                self.in_flight.push(Box::pin(async move {
                    Event::DetailLoaded { token, result: store.get_by_id(annotation_id).await }
                }));
            }
            Action::RedirectToSignIn { url } => self.surface.navigate(&url),
            Action::ReportError { message } => self.surface.report_error(&message),
        }
    }
}
