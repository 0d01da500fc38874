// src/core/handler/session.rs

//! Handlers for account lifecycle: REGISTER, LOGIN, LOGOUT, SET_STATUS.
//!
//! REGISTER, LOGIN, and the SET_STATUS payload read *unframed* strings: the
//! name is however many bytes the first receive returns. This is an inherited
//! wire quirk, preserved for client compatibility.

use super::Conversation;
use crate::core::protocol::Status;
use crate::core::{ChatError, MAX_STATUS_LENGTH};
use tracing::info;

/// REGISTER: create a new user. Names are unique for the life of the journal.
pub(super) async fn register(conversation: &mut Conversation<'_>) -> Result<(), ChatError> {
    let name = conversation.read_unframed_string().await?;

    let state = conversation.state.clone();
    let mut store = state.store.lock().await;
    if name.is_empty() || store.find_user_by_name(&name).is_some() {
        drop(store);
        info!("Rejected registration of \"{name}\": empty or already taken");
        return conversation.write_status(Status::InvalidRequest).await;
    }
    store.add_user(&name).await;
    drop(store);

    info!("Registered user: {name}");
    conversation.write_status(Status::Success).await
}

/// LOGIN: bind a name to a fresh session id and this connection. The failure
/// reply carries `-1` where the session id would go.
pub(super) async fn login(conversation: &mut Conversation<'_>) -> Result<(), ChatError> {
    let name = conversation.read_unframed_string().await?;

    let state = conversation.state.clone();
    let mut store = state.store.lock().await;
    let index = store
        .find_user_by_name(&name)
        .filter(|&i| !store.user(i).logged_in);
    let Some(index) = index else {
        drop(store);
        info!("User \"{name}\" already logged in or does not exist");
        conversation.write_i32(-1).await?;
        return conversation.write_status(Status::InvalidRequest).await;
    };

    let session_id = store.allocate_id().await;
    store.login_user(index, session_id, conversation.conn_id);
    drop(store);

    info!("User logged in: {name}");
    conversation.write_i32(session_id).await?;
    conversation.write_status(Status::Success).await
}

/// LOGOUT: release the session. The TCP connection stays open.
pub(super) async fn logout(conversation: &mut Conversation<'_>) -> Result<(), ChatError> {
    let session_id = conversation.read_i32().await?;

    let state = conversation.state.clone();
    let mut store = state.store.lock().await;
    match store.authenticated(session_id, conversation.conn_id) {
        Some(index) => {
            let name = store.user(index).name.clone();
            store.logout_user(index);
            drop(store);
            info!("User logged out: {name}");
            conversation.write_status(Status::Success).await
        }
        None => {
            drop(store);
            info!("Session {session_id} is not logged in on this connection");
            conversation.write_status(Status::InvalidRequest).await
        }
    }
}

/// SET_STATUS: authenticate, acknowledge, then read and apply the new status.
pub(super) async fn set_status(conversation: &mut Conversation<'_>) -> Result<(), ChatError> {
    let session_id = conversation.read_i32().await?;

    let state = conversation.state.clone();
    let index = {
        let store = state.store.lock().await;
        store.authenticated(session_id, conversation.conn_id)
    };
    let Some(index) = index else {
        return conversation.write_status(Status::InvalidRequest).await;
    };
    conversation.write_status(Status::Success).await?;

    let status = conversation.read_unframed_string().await?;
    if status.is_empty() || status.len() > MAX_STATUS_LENGTH {
        return conversation.write_status(Status::InvalidRequest).await;
    }

    let mut store = state.store.lock().await;
    store.set_user_status(index, &status);
    let name = store.user(index).name.clone();
    drop(store);

    info!("User \"{name}\" updated status to \"{status}\"");
    conversation.write_status(Status::Success).await
}
