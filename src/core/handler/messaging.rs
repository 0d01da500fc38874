// src/core/handler/messaging.rs

//! Handlers for the message graph: SEND_MESSAGE, DELETE_MESSAGE, GET_MESSAGES.

use super::Conversation;
use crate::core::protocol::{RecipientType, Status};
use crate::core::store::{Message, Recipient};
use crate::core::{ChatError, MAX_MESSAGE_LENGTH};
use tracing::{debug, info};

/// SEND_MESSAGE: deliver one message to a user or group.
///
/// A user-addressed send journals `UPDATE_ID` + `NEW_MESSAGE` and stores one
/// message. A group-addressed send journals a single `NEW_MESSAGE` naming the
/// group, then fans out: one stored (unjournaled) message per member, each
/// with a freshly allocated id. Replay re-expands the group record the same
/// way.
pub(super) async fn send_message(conversation: &mut Conversation<'_>) -> Result<(), ChatError> {
    let session_id = conversation.read_i32().await?;

    let state = conversation.state.clone();
    let sender = {
        let store = state.store.lock().await;
        store
            .authenticated(session_id, conversation.conn_id)
            .map(|index| store.user(index).name.clone())
    };
    let Some(sender) = sender else {
        return conversation.write_status(Status::InvalidRequest).await;
    };
    conversation.write_status(Status::Success).await?;

    let type_byte = conversation.read_u8().await?;
    let recipient_name = conversation.read_string().await?;
    let content = conversation.read_string().await?;

    let Some(recipient_type) = RecipientType::from_u8(type_byte) else {
        return conversation.write_status(Status::InvalidRequest).await;
    };
    if content.is_empty() || content.len() > MAX_MESSAGE_LENGTH {
        return conversation.write_status(Status::InvalidRequest).await;
    }

    let mut store = state.store.lock().await;
    let resolved = match recipient_type {
        RecipientType::User => store
            .find_user_by_name(&recipient_name)
            .map(|_| Recipient::User(recipient_name.clone())),
        RecipientType::Group => store.find_group_by_name(&recipient_name).map(|index| {
            let group = store.group(index);
            Recipient::Group {
                name: group.name.clone(),
                members: group.members.clone(),
            }
        }),
    };
    let Some(recipient) = resolved else {
        drop(store);
        debug!("Unresolved recipient \"{recipient_name}\"");
        return conversation.write_status(Status::InvalidRequest).await;
    };

    match recipient {
        Recipient::User(name) => {
            let id = store.allocate_id().await;
            store
                .journal_message(&sender, RecipientType::User, &name, &content)
                .await;
            store.store_message(Message {
                id,
                content,
                sender: sender.clone(),
                recipient: Recipient::User(name),
            });
        }
        Recipient::Group { name, members } => {
            store
                .journal_message(&sender, RecipientType::Group, &name, &content)
                .await;
            for member in members {
                let id = store.allocate_id().await;
                store.store_message(Message {
                    id,
                    content: content.clone(),
                    sender: sender.clone(),
                    recipient: Recipient::User(member),
                });
            }
        }
    }
    drop(store);

    info!("Stored message from \"{sender}\" to \"{recipient_name}\"");
    conversation.write_status(Status::Success).await
}

/// DELETE_MESSAGE: recipient-only deletion by id.
pub(super) async fn delete_message(conversation: &mut Conversation<'_>) -> Result<(), ChatError> {
    let session_id = conversation.read_i32().await?;

    let state = conversation.state.clone();
    let caller = {
        let store = state.store.lock().await;
        store
            .authenticated(session_id, conversation.conn_id)
            .map(|index| store.user(index).name.clone())
    };
    let Some(caller) = caller else {
        return conversation.write_status(Status::InvalidRequest).await;
    };
    conversation.write_status(Status::Success).await?;

    let message_id = conversation.read_i32().await?;

    let mut store = state.store.lock().await;
    let Some(index) = store.find_message_by_id(message_id) else {
        drop(store);
        return conversation.write_status(Status::InvalidRequest).await;
    };
    if store.messages()[index].recipient.primary_username() != Some(caller.as_str()) {
        drop(store);
        info!("User \"{caller}\" may not delete message {message_id}: not the recipient");
        return conversation.write_status(Status::Unauthorized).await;
    }
    store.delete_message(index).await;
    drop(store);

    info!("Deleted message {message_id}");
    conversation.write_status(Status::Success).await
}

/// GET_MESSAGES: return every stored message addressed to the caller.
pub(super) async fn get_messages(conversation: &mut Conversation<'_>) -> Result<(), ChatError> {
    let session_id = conversation.read_i32().await?;

    let state = conversation.state.clone();
    let inbox = {
        let store = state.store.lock().await;
        store
            .authenticated(session_id, conversation.conn_id)
            .map(|index| {
                let name = &store.user(index).name;
                store
                    .messages()
                    .iter()
                    .filter(|m| m.recipient.contains_user(name))
                    .map(|m| (m.id, m.sender.clone(), m.content.clone()))
                    .collect::<Vec<_>>()
            })
    };
    let Some(inbox) = inbox else {
        return conversation.write_status(Status::InvalidRequest).await;
    };

    conversation.write_status(Status::Success).await?;
    conversation.write_u32(inbox.len() as u32).await?;
    for (id, sender, content) in &inbox {
        conversation.write_i32(*id).await?;
        conversation.write_string(sender).await?;
        conversation.write_string(content).await?;
    }
    conversation.write_status(Status::Success).await
}
