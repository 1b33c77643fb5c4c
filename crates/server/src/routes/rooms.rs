use std::time::Duration;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use db::models::project::Project;
use deployment::Deployment;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use services::services::presence::{ClientEvent, PresenceStore, ServerEvent, UserPresence};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::DeploymentImpl;

/// A connection that never manages a valid join gets dropped.
const JOIN_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn rooms_ws(
    ws: WebSocketUpgrade,
    State(deployment): State<DeploymentImpl>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = handle_rooms_ws(socket, deployment).await {
            tracing::warn!("room WS closed: {}", e);
        }
    })
}

struct JoinedConnection {
    project_id: Uuid,
    connection_id: Uuid,
    user: UserPresence,
    rx: mpsc::UnboundedReceiver<ServerEvent>,
}

async fn handle_rooms_ws(socket: WebSocket, deployment: DeploymentImpl) -> anyhow::Result<()> {
    let (mut sender, mut receiver) = socket.split();

    // Joining phase: nothing is relayed and no room state exists until a
    // join passes the access gate.
    let join = tokio::time::timeout(
        JOIN_TIMEOUT,
        wait_for_join(&deployment, &mut sender, &mut receiver),
    )
    .await;
    let Ok(Some(joined)) = join else {
        let _ = sender.close().await;
        return Ok(());
    };

    let JoinedConnection {
        project_id,
        connection_id,
        user,
        mut rx,
    } = joined;
    let presence = deployment.presence().clone();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(event) => {
                        if send_event(&mut sender, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        presence.touch(project_id, connection_id);
                        handle_client_frame(
                            &presence,
                            &mut sender,
                            project_id,
                            connection_id,
                            &user,
                            text.as_str(),
                        )
                        .await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        presence.touch(project_id, connection_id);
                    }
                    Some(Err(_)) => break,
                }
            }
        }
    }

    let _ = presence.leave(project_id, connection_id);
    let _ = sender.close().await;
    Ok(())
}

/// Drives the `disconnected -> joining -> joined` edge: reads frames until a
/// `join:project` passes the access gate, answering everything else with a
/// scoped `error` event.
async fn wait_for_join(
    deployment: &DeploymentImpl,
    sender: &mut SplitSink<WebSocket, Message>,
    receiver: &mut SplitStream<WebSocket>,
) -> Option<JoinedConnection> {
    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => return None,
            _ => continue,
        };

        let event = match serde_json::from_str::<ClientEvent>(text.as_str()) {
            Ok(event) => event,
            Err(err) => {
                send_error(sender, &format!("Malformed event: {err}")).await?;
                continue;
            }
        };

        let ClientEvent::JoinProject {
            project_id,
            user_id,
            user_name,
        } = event
        else {
            send_error(sender, "Join the project room first").await?;
            continue;
        };

        if user_name.trim().is_empty() {
            send_error(sender, "A user name is required to join").await?;
            continue;
        }

        let project = match Project::find_by_id(&deployment.db().pool, project_id).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                send_error(sender, "Project not found").await?;
                continue;
            }
            Err(err) => {
                tracing::error!("room join lookup failed: {}", err);
                send_error(sender, "Project lookup failed").await?;
                continue;
            }
        };

        match project.is_accessible_by(&deployment.db().pool, user_id).await {
            Ok(true) => {}
            Ok(false) => {
                send_error(sender, "You do not have access to this project").await?;
                continue;
            }
            Err(err) => {
                tracing::error!("room access check failed: {}", err);
                send_error(sender, "Project lookup failed").await?;
                continue;
            }
        }

        let user = UserPresence { user_id, user_name };
        let connection_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        deployment
            .presence()
            .join(project_id, connection_id, user.clone(), tx);

        tracing::debug!(
            project_id = %project_id,
            user_id = %user.user_id,
            "connection joined project room"
        );

        return Some(JoinedConnection {
            project_id,
            connection_id,
            user,
            rx,
        });
    }

    None
}

/// Relays one client frame to the rest of the room, tagged with the sender's
/// identity. Bad frames answer the origin only; the room never sees them.
async fn handle_client_frame(
    presence: &PresenceStore,
    sender: &mut SplitSink<WebSocket, Message>,
    project_id: Uuid,
    connection_id: Uuid,
    user: &UserPresence,
    raw: &str,
) {
    let event = match serde_json::from_str::<ClientEvent>(raw) {
        Ok(event) => event,
        Err(err) => {
            let _ = send_error(sender, &format!("Malformed event: {err}")).await;
            return;
        }
    };

    let outgoing = match event {
        ClientEvent::JoinProject { .. } => {
            let _ = send_error(sender, "Already joined a project room").await;
            return;
        }
        ClientEvent::CardMove {
            project_id: event_project_id,
            card_id,
            source_list_id,
            destination_list_id,
            position,
        } => {
            if event_project_id != project_id {
                let _ = send_error(sender, "Event is scoped to a different project").await;
                return;
            }
            ServerEvent::CardMoved {
                project_id,
                card_id,
                source_list_id,
                destination_list_id,
                position,
                moved_by: Some(user.clone()),
            }
        }
        ClientEvent::CardUpdate(payload) => {
            if payload.project_id != project_id {
                let _ = send_error(sender, "Event is scoped to a different project").await;
                return;
            }
            ServerEvent::CardUpdated {
                project_id,
                data: payload.data,
                updated_by: Some(user.clone()),
            }
        }
        ClientEvent::ListUpdate(payload) => {
            if payload.project_id != project_id {
                let _ = send_error(sender, "Event is scoped to a different project").await;
                return;
            }
            ServerEvent::ListUpdated {
                project_id,
                data: payload.data,
                updated_by: Some(user.clone()),
            }
        }
        ClientEvent::ChecklistUpdate(payload) => {
            if payload.project_id != project_id {
                let _ = send_error(sender, "Event is scoped to a different project").await;
                return;
            }
            ServerEvent::ChecklistUpdated {
                project_id,
                data: payload.data,
                updated_by: Some(user.clone()),
            }
        }
        ClientEvent::PresenceUpdate(payload) => {
            if payload.project_id != project_id {
                let _ = send_error(sender, "Event is scoped to a different project").await;
                return;
            }
            ServerEvent::UserPresenceUpdate {
                project_id,
                user: user.clone(),
                data: payload.data,
            }
        }
    };

    presence.broadcast(project_id, outgoing, Some(connection_id));
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}

async fn send_error(sender: &mut SplitSink<WebSocket, Message>, message: &str) -> Option<()> {
    send_event(
        sender,
        &ServerEvent::Error {
            message: message.to_string(),
        },
    )
    .await
    .ok()
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/rooms/ws", get(rooms_ws))
}
