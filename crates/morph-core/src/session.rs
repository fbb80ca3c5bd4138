//! Async driver that owns one session's state.
//!
//! Actions arrive on a channel and are folded through [`reduce`] one at a
//! time. Effects are executed here: module acquisition goes through the
//! shared [`ModuleLoader`], recomputation runs on the blocking pool, and both
//! report back as actions. Every `Render` effect publishes a snapshot on a
//! watch channel.

use crate::loader::{Acquire, ModuleLoader};
use crate::state::{Action, Effect, SessionState, reduce};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, thiserror::Error)]
#[error("session has ended")]
pub struct SessionClosed;

/// Client side of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    actions: mpsc::UnboundedSender<Action>,
    snapshots: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn dispatch(&self, action: Action) -> Result<(), SessionClosed> {
        self.actions.send(action).map_err(|_| SessionClosed)
    }

    pub fn snapshot(&self) -> SessionState {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.snapshots.clone()
    }
}

pub struct Session {
    state: SessionState,
    loader: Arc<ModuleLoader>,
    feedback: mpsc::UnboundedSender<Action>,
    snapshots: watch::Sender<SessionState>,
}

impl Session {
    /// Starts a session on the current tokio runtime. The driver stops once
    /// every [`SessionHandle`] has been dropped.
    pub fn spawn(loader: Arc<ModuleLoader>) -> SessionHandle {
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let (feedback_tx, feedback_rx) = mpsc::unbounded_channel();
        let state = SessionState::new();
        let (snapshots_tx, snapshots_rx) = watch::channel(state.clone());

        let session = Session {
            state,
            loader,
            feedback: feedback_tx,
            snapshots: snapshots_tx,
        };
        tokio::spawn(session.run(actions_rx, feedback_rx));

        SessionHandle {
            actions: actions_tx,
            snapshots: snapshots_rx,
        }
    }

    async fn run(
        mut self,
        mut actions: mpsc::UnboundedReceiver<Action>,
        mut feedback: mpsc::UnboundedReceiver<Action>,
    ) {
        tracing::debug!("session started");
        let initial = self.state.initial_effects();
        self.execute(initial);

        loop {
            let action = tokio::select! {
                biased;
                Some(action) = feedback.recv() => action,
                action = actions.recv() => match action {
                    Some(action) => action,
                    None => break,
                },
            };
            self.apply(action);
        }
        tracing::debug!(revision = self.state.revision(), "session ended");
    }

    fn apply(&mut self, action: Action) {
        let transition = reduce(&self.state, action);
        if transition.is_identity() {
            return;
        }
        self.state = transition.state;
        self.execute(transition.effects);
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Acquire(module) => {
                    let feedback = self.feedback.clone();
                    let acquired = self.loader.acquire(module, move |result| {
                        let action = match result {
                            Ok(capability) => Action::ModuleLoaded(capability),
                            Err(err) => Action::ModuleFailed {
                                module,
                                message: err.to_string(),
                            },
                        };
                        let _ = feedback.send(action);
                    });
                    if let Acquire::Ready(capability) = acquired {
                        let _ = self.feedback.send(Action::ModuleLoaded(capability));
                    }
                }
                Effect::Recompute(job) => {
                    let feedback = self.feedback.clone();
                    tokio::spawn(async move {
                        let revision = job.revision;
                        let action = match tokio::task::spawn_blocking(move || job.run()).await {
                            Ok(Ok(output)) => Action::OutputComputed { revision, output },
                            Ok(Err(err)) => Action::ComputeFailed {
                                revision,
                                message: err.to_string(),
                            },
                            Err(join) => Action::ComputeFailed {
                                revision,
                                message: format!("pipeline task aborted: {join}"),
                            },
                        };
                        let _ = feedback.send(action);
                    });
                }
                Effect::Render => {
                    self.snapshots.send_replace(self.state.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capability, Highlighter, Minifier, ModuleId, Stage, TransformError};
    use crate::loader::{LoadError, LoadResult, ModuleSource};
    use futures::future::{BoxFuture, FutureExt};
    use std::time::Duration;

    struct Squash;

    impl Minifier for Squash {
        fn minify(&self, source: &str) -> Result<String, TransformError> {
            if source.contains(':') {
                return Err(TransformError::new(Stage::Minify, "unexpected ':'"));
            }
            Ok(source.split_whitespace().collect())
        }
    }

    struct Plain;

    impl Highlighter for Plain {
        fn highlight(&self, source: &str, _lang: &str) -> Result<String, TransformError> {
            Ok(source.to_string())
        }
    }

    /// Provides a minifier and, optionally, a highlighter. The transpiler is
    /// never available.
    struct FakeSource {
        highlighter: bool,
    }

    impl ModuleSource for FakeSource {
        fn fetch(&self, module: ModuleId) -> BoxFuture<'static, LoadResult> {
            let highlighter = self.highlighter;
            async move {
                match module {
                    ModuleId::Minifier => Ok(Capability::Minifier(Arc::new(Squash))),
                    ModuleId::Highlighter if highlighter => {
                        Ok(Capability::Highlighter(Arc::new(Plain)))
                    }
                    _ => Err(LoadError::Unavailable(module)),
                }
            }
            .boxed()
        }
    }

    fn start() -> SessionHandle {
        Session::spawn(Arc::new(ModuleLoader::new(FakeSource { highlighter: true })))
    }

    async fn wait_for<F>(handle: &SessionHandle, mut done: F) -> SessionState
    where
        F: FnMut(&SessionState) -> bool,
    {
        let mut rx = handle.subscribe();
        let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| done(s)))
            .await
            .expect("session did not settle")
            .expect("session dropped")
            .clone();
        state
    }

    #[tokio::test]
    async fn highlighter_is_loaded_on_start() {
        let handle = start();
        let state = wait_for(&handle, |s| s.is_loaded(ModuleId::Highlighter)).await;
        assert!(!state.is_loaded(ModuleId::Minifier));
    }

    #[tokio::test]
    async fn input_flows_to_output() {
        let handle = start();
        handle.dispatch(Action::ChangeInput("let a = 1".into())).unwrap();
        let state = wait_for(&handle, |s| s.output_text() == "let a = 1").await;
        assert_eq!(state.byte_count(), 9);
    }

    #[tokio::test]
    async fn minify_toggle_loads_module_and_recomputes() {
        let handle = start();
        handle.dispatch(Action::ChangeInput("let a = 1".into())).unwrap();
        handle.dispatch(Action::ToggleMinify(true)).unwrap();
        let state = wait_for(&handle, |s| s.output_text() == "leta=1").await;
        assert!(state.is_loaded(ModuleId::Minifier));
        assert!(state.minify_enabled());
    }

    #[tokio::test]
    async fn last_input_wins() {
        let handle = start();
        for text in ["a", "ab", "abc", "abcd"] {
            handle.dispatch(Action::ChangeInput(text.into())).unwrap();
        }
        let state = wait_for(&handle, |s| s.output_text() == "abcd").await;
        assert_eq!(state.input_text(), "abcd");
        assert_eq!(state.revision(), 4);
    }

    #[tokio::test]
    async fn failed_module_load_surfaces_error() {
        let handle = Session::spawn(Arc::new(ModuleLoader::new(FakeSource { highlighter: false })));
        let state = wait_for(&handle, |s| s.last_error().is_some()).await;
        assert_eq!(
            state.last_error(),
            Some("failed to load highlighter: module highlighter is not provided by this source")
        );
        assert!(!state.is_loaded(ModuleId::Highlighter));
    }

    #[tokio::test]
    async fn unavailable_transpiler_stays_pass_through() {
        let handle = start();
        handle.dispatch(Action::ToggleTranspile(true)).unwrap();
        handle.dispatch(Action::ChangeInput("const x: number = 1".into())).unwrap();
        let state = wait_for(&handle, |s| s.output_text() == "const x: number = 1").await;
        assert!(state.transpile_enabled());
        assert!(!state.is_loaded(ModuleId::Transpiler));
    }

    #[tokio::test]
    async fn minify_failure_keeps_last_good_output() {
        let handle = start();
        handle.dispatch(Action::ToggleMinify(true)).unwrap();
        wait_for(&handle, |s| s.is_loaded(ModuleId::Minifier)).await;
        handle.dispatch(Action::ChangeInput("a b".into())).unwrap();
        wait_for(&handle, |s| s.output_text() == "ab").await;

        handle.dispatch(Action::ChangeInput("a: b".into())).unwrap();
        let state = wait_for(&handle, |s| s.last_error().is_some()).await;
        assert_eq!(state.output_text(), "ab");
        assert_eq!(state.last_error(), Some("minify failed: unexpected ':'"));
    }

    #[tokio::test]
    async fn driver_stops_when_handle_dropped() {
        let handle = start();
        let rx = handle.subscribe();
        drop(handle);
        let closed = tokio::time::timeout(Duration::from_secs(5), async {
            let mut rx = rx;
            while rx.changed().await.is_ok() {}
        })
        .await;
        assert!(closed.is_ok());
    }
}
