//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Builders for the kinds of [`Content`] the bridge sends.

use chatbridge_core::{Aci, Timestamp};
use chatbridge_protocol::proto::service::{
    data_message, receipt_message, typing_message, Content, DataMessage, GroupContextV2,
    ReceiptMessage, TypingMessage,
};

pub fn text_content(text: impl Into<String>, timestamp: Timestamp) -> Content {
    Content {
        data_message: Some(DataMessage {
            body: Some(text.into()),
            timestamp: Some(timestamp.epoch_millis()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Marks `content`'s data message as a reply to the message `author` sent at `quoted_timestamp`.
///
/// Content without a data message is returned unchanged.
pub fn with_quote(
    mut content: Content,
    author: Aci,
    quoted_timestamp: Timestamp,
    quoted_text: Option<String>,
) -> Content {
    if let Some(message) = &mut content.data_message {
        message.quote = Some(data_message::Quote {
            id: Some(quoted_timestamp.epoch_millis()),
            author_aci: Some(author.service_id_string()),
            text: quoted_text,
        });
    }
    content
}

/// Addresses `content`'s data message to the group identified by `master_key`.
pub fn group_content(mut content: Content, master_key: &[u8], revision: u32) -> Content {
    if let Some(message) = &mut content.data_message {
        message.group_v2 = Some(GroupContextV2 {
            master_key: Some(master_key.to_vec()),
            revision: Some(revision),
        });
    }
    content
}

pub fn typing_content(started: bool, timestamp: Timestamp, group_id: Option<Vec<u8>>) -> Content {
    let action = if started {
        typing_message::Action::Started
    } else {
        typing_message::Action::Stopped
    };
    Content {
        typing_message: Some(TypingMessage {
            timestamp: Some(timestamp.epoch_millis()),
            action: Some(action.into()),
            group_id,
        }),
        ..Default::default()
    }
}

pub fn read_receipt_content(timestamps: impl IntoIterator<Item = Timestamp>) -> Content {
    Content {
        receipt_message: Some(ReceiptMessage {
            r#type: Some(receipt_message::Type::Read.into()),
            timestamp: timestamps.into_iter().map(|t| t.epoch_millis()).collect(),
        }),
        ..Default::default()
    }
}
