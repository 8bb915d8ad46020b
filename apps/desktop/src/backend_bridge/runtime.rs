//! Runtime bridge between the front-end command queue and the relationship views.

use std::{sync::Arc, thread};

use anyhow::Context;
use client_core::{
    ClientError, ControllerConfig, HttpRelationshipStore, LearnerView, MentorView,
    RelationshipController, SessionCredentials,
};
use crossbeam_channel::{Receiver, Sender};
use shared::domain::{Decision, Role};
use tokio::runtime::Runtime;

use crate::{
    backend_bridge::commands::BackendCommand,
    config::Settings,
    controller::events::{UiError, UiErrorContext, UiEvent, ViewModel},
};

enum ActiveView {
    Mentor(MentorView),
    Learner(LearnerView),
}

impl ActiveView {
    fn build(settings: &Settings) -> anyhow::Result<Self> {
        let viewer = settings.viewer()?;
        let store = HttpRelationshipStore::new(&settings.server_url)
            .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
        let credentials = match &settings.token {
            Some(token) => SessionCredentials::new(token.clone()),
            None => SessionCredentials::empty(),
        };
        let controller = RelationshipController::with_config(
            viewer,
            Arc::new(store),
            Arc::new(credentials),
            ControllerConfig {
                request_timeout: settings.request_timeout(),
            },
        );

        Ok(match viewer.role {
            Role::Mentor => ActiveView::Mentor(MentorView::new(controller)?),
            Role::Learner => ActiveView::Learner(LearnerView::new(controller)?),
        })
    }

    fn role(&self) -> Role {
        match self {
            ActiveView::Mentor(_) => Role::Mentor,
            ActiveView::Learner(_) => Role::Learner,
        }
    }

    async fn execute(&mut self, cmd: BackendCommand) -> Result<Option<String>, UiError> {
        let context = command_context(&cmd);
        let role = self.role();
        let unavailable = |operation: &'static str| {
            UiError::from_client(context, &ClientError::RoleMismatch { operation, role })
        };
        let client_err = |err: ClientError| UiError::from_client(context, &err);

        match (self, cmd) {
            (ActiveView::Mentor(view), BackendCommand::Mount) => {
                view.on_mount().await.map_err(client_err)?
            }
            (ActiveView::Learner(view), BackendCommand::Mount) => {
                view.on_mount().await.map_err(client_err)?
            }
            (ActiveView::Mentor(view), BackendCommand::Refresh) => {
                view.refresh().await.map_err(client_err)?
            }
            (ActiveView::Learner(view), BackendCommand::Refresh) => {
                view.refresh().await.map_err(client_err)?
            }
            (ActiveView::Mentor(view), BackendCommand::Search { query }) => {
                view.set_search_text(query);
                let results = view.submit_search().await.map_err(client_err)?;
                if view.search_text().trim().is_empty() {
                    return Ok(Some("search cleared".to_string()));
                }
                return Ok(Some(format!("{} learner(s) found", results.len())));
            }
            (ActiveView::Mentor(view), BackendCommand::SendRequest { user_id }) => {
                let created = view.send_request(user_id).await.map_err(client_err)?;
                return Ok(Some(format!(
                    "request #{} sent to {}",
                    created.id,
                    created.counterpart.display_name()
                )));
            }
            (ActiveView::Learner(view), BackendCommand::Respond { request_id, decision }) => {
                let updated = match decision {
                    Decision::Accepted => view.accept(request_id).await,
                    Decision::Rejected => view.reject(request_id).await,
                }
                .map_err(client_err)?;
                return Ok(Some(format!("request #{} {}", updated.id, decision)));
            }
            (_, BackendCommand::Show) => {}
            (ActiveView::Learner(_), BackendCommand::Search { .. }) => {
                return Err(unavailable("search"))
            }
            (ActiveView::Learner(_), BackendCommand::SendRequest { .. }) => {
                return Err(unavailable("send request"))
            }
            (ActiveView::Mentor(_), BackendCommand::Respond { .. }) => {
                return Err(unavailable("respond"))
            }
        }
        Ok(None)
    }

    async fn model(&self) -> ViewModel {
        match self {
            ActiveView::Mentor(view) => ViewModel::Mentor(view.model().await),
            ActiveView::Learner(view) => ViewModel::Learner(view.model().await),
        }
    }
}

fn command_context(cmd: &BackendCommand) -> UiErrorContext {
    match cmd {
        BackendCommand::Mount | BackendCommand::Refresh | BackendCommand::Show => {
            UiErrorContext::Refresh
        }
        BackendCommand::Search { .. } => UiErrorContext::Search,
        BackendCommand::SendRequest { .. } => UiErrorContext::SendRequest,
        BackendCommand::Respond { .. } => UiErrorContext::Respond,
    }
}

fn startup_failure(ui_tx: &Sender<UiEvent>, message: String) {
    tracing::error!("backend worker startup failure: {message}");
    let _ = ui_tx.send(UiEvent::Error(UiError::from_message(
        UiErrorContext::BackendStartup,
        message,
    )));
}

/// Spawns the backend worker. Commands run one at a time in queue order; the
/// thread exits once every command sender has been dropped.
pub fn launch(
    settings: Settings,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match Runtime::new() {
            Ok(runtime) => runtime,
            Err(err) => {
                startup_failure(&ui_tx, format!("failed to build backend runtime: {err}"));
                return;
            }
        };

        let mut view = match ActiveView::build(&settings) {
            Ok(view) => view,
            Err(err) => {
                startup_failure(&ui_tx, format!("{err:#}"));
                return;
            }
        };
        tracing::info!(
            role = %view.role(),
            user_id = ?settings.user_id,
            server_url = %settings.server_url,
            "backend worker ready"
        );

        while let Ok(cmd) = cmd_rx.recv() {
            let cmd_name = cmd.name();
            let outcome = runtime.block_on(view.execute(cmd));
            match outcome {
                Ok(Some(info)) => {
                    let _ = ui_tx.send(UiEvent::Info(info));
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(command = cmd_name, error = %err, "backend command failed");
                    let _ = ui_tx.send(UiEvent::Error(err));
                }
            }
            let model = runtime.block_on(view.model());
            if ui_tx.send(UiEvent::ViewUpdated(model)).is_err() {
                break;
            }
        }
        tracing::debug!("backend worker stopped");
    })
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::bounded;

    use super::*;
    use crate::controller::events::UiErrorCategory;

    #[test]
    fn missing_identity_fails_startup_and_closes_the_event_stream() {
        let (cmd_tx, cmd_rx) = bounded(4);
        let (ui_tx, ui_rx) = bounded(4);

        let worker = launch(Settings::default(), cmd_rx, ui_tx);
        worker.join().expect("worker thread");

        let events: Vec<UiEvent> = ui_rx.iter().collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            UiEvent::Error(err) => {
                assert_eq!(err.context(), UiErrorContext::BackendStartup);
                assert_eq!(err.category(), UiErrorCategory::Validation);
                assert!(err.message().contains("missing role"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(cmd_tx.send(BackendCommand::Show).is_err());
    }

    #[test]
    fn learner_worker_rejects_mentor_commands_without_network() {
        let settings = Settings {
            role: Some(Role::Learner),
            user_id: Some(42),
            token: Some("t".to_string()),
            ..Settings::default()
        };
        let (cmd_tx, cmd_rx) = bounded(4);
        let (ui_tx, ui_rx) = bounded(8);

        let worker = launch(settings, cmd_rx, ui_tx);
        cmd_tx
            .send(BackendCommand::Search {
                query: "ann".to_string(),
            })
            .expect("queue");
        drop(cmd_tx);
        worker.join().expect("worker thread");

        let events: Vec<UiEvent> = ui_rx.iter().collect();
        assert!(matches!(
            &events[0],
            UiEvent::Error(err) if err.context() == UiErrorContext::Search
                && err.category() == UiErrorCategory::Validation
        ));
        assert!(matches!(
            &events[1],
            UiEvent::ViewUpdated(ViewModel::Learner(model)) if model.incoming.is_empty()
        ));
    }
}
