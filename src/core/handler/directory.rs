// src/core/handler/directory.rs

//! Handlers for the directories: GET_USERS, GET_GROUPS, REGISTER_GROUP.

use super::Conversation;
use crate::core::ChatError;
use crate::core::protocol::Status;
use tracing::info;

/// Resolves the caller for a directory listing. Distinguishes an unknown
/// session (`InvalidRequest`) from a user that exists but is logged out
/// (`Unauthorized`).
async fn directory_caller(
    conversation: &mut Conversation<'_>,
    session_id: i32,
) -> Result<Option<usize>, ChatError> {
    let state = conversation.state.clone();
    let store = state.store.lock().await;
    let Some(index) = store.find_user_by_session(session_id) else {
        drop(store);
        conversation.write_status(Status::InvalidRequest).await?;
        return Ok(None);
    };
    if !store.user(index).logged_in {
        drop(store);
        conversation.write_status(Status::Unauthorized).await?;
        return Ok(None);
    }
    if store.user(index).connection != Some(conversation.conn_id) {
        drop(store);
        conversation.write_status(Status::InvalidRequest).await?;
        return Ok(None);
    }
    Ok(Some(index))
}

/// GET_USERS: the full user directory with statuses, in insertion order.
pub(super) async fn get_users(conversation: &mut Conversation<'_>) -> Result<(), ChatError> {
    let session_id = conversation.read_i32().await?;
    let Some(index) = directory_caller(conversation, session_id).await? else {
        return Ok(());
    };

    let state = conversation.state.clone();
    let roster = {
        let mut store = state.store.lock().await;
        // The directory poll doubles as the caller's heartbeat in the user
        // record; only the liveness table matters for pruning.
        store.touch_user(index);
        store
            .users()
            .iter()
            .map(|u| (u.name.clone(), u.status.clone()))
            .collect::<Vec<_>>()
    };

    conversation.write_status(Status::Success).await?;
    conversation.write_u32(roster.len() as u32).await?;
    for (name, status) in &roster {
        conversation.write_string(name).await?;
        conversation.write_string(status).await?;
    }
    conversation.write_status(Status::Success).await
}

/// GET_GROUPS: every registered group with its member list.
pub(super) async fn get_groups(conversation: &mut Conversation<'_>) -> Result<(), ChatError> {
    let session_id = conversation.read_i32().await?;
    if directory_caller(conversation, session_id).await?.is_none() {
        return Ok(());
    }

    let state = conversation.state.clone();
    let groups = {
        let store = state.store.lock().await;
        store
            .groups()
            .iter()
            .map(|g| (g.name.clone(), g.members.clone()))
            .collect::<Vec<_>>()
    };

    conversation.write_status(Status::Success).await?;
    conversation.write_u32(groups.len() as u32).await?;
    for (name, members) in &groups {
        conversation.write_string(name).await?;
        conversation.write_u32(members.len() as u32).await?;
        for member in members {
            conversation.write_string(member).await?;
        }
    }
    conversation.write_status(Status::Success).await
}

/// REGISTER_GROUP: create a new group.
///
/// The name is vetted (and acknowledged) before the member list is read. A
/// single unknown member rejects the whole group; nothing partial is
/// committed. Members are kept in request order, duplicates included.
pub(super) async fn register_group(conversation: &mut Conversation<'_>) -> Result<(), ChatError> {
    let name = conversation.read_string().await?;

    let state = conversation.state.clone();
    let name_taken = {
        let store = state.store.lock().await;
        store.find_group_by_name(&name).is_some()
    };
    if name.is_empty() || name_taken {
        info!("Rejected group \"{name}\": empty or already registered");
        return conversation.write_status(Status::InvalidRequest).await;
    }
    conversation.write_status(Status::Success).await?;

    let count = conversation.read_u32().await?;
    if count == 0 {
        return conversation.write_status(Status::InvalidRequest).await;
    }
    let mut members = Vec::new();
    for _ in 0..count {
        members.push(conversation.read_string().await?);
    }

    let mut store = state.store.lock().await;
    let all_resolved = members.iter().all(|m| store.find_user_by_name(m).is_some());
    if !all_resolved || store.find_group_by_name(&name).is_some() {
        drop(store);
        info!("Rejected group \"{name}\": unresolved member or name raced");
        return conversation.write_status(Status::InvalidRequest).await;
    }
    store.add_group(&name, members).await;
    drop(store);

    info!("Registered group: {name}");
    conversation.write_status(Status::Success).await
}
