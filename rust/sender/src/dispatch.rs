//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use chatbridge_core::{ServiceId, Timestamp};
use chatbridge_net_chat::api::messages::{
    AuthenticatedChatApi as _, OutgoingMessage, OutgoingMessages, SendMessageFailure,
    SendMessageResponse, UnauthenticatedChatApi as _,
};
use chatbridge_net_chat::api::{RequestError, UserBasedAuthorization};

use crate::sealed::SendAuthorization;
use crate::Device;

pub(crate) type DispatchResult = Result<SendMessageResponse, RequestError<SendMessageFailure>>;

impl Device {
    /// Sends one attempt's envelopes over the connection matching `authorization`.
    pub(crate) async fn dispatch(
        &self,
        recipient: ServiceId,
        timestamp: Timestamp,
        messages: Vec<OutgoingMessage>,
        authorization: &SendAuthorization,
    ) -> DispatchResult {
        let request = OutgoingMessages {
            timestamp,
            online: self.config.online,
            urgent: self.config.urgent,
            messages,
        };

        let send = async {
            match authorization {
                SendAuthorization::Sealed { access_key, .. } => {
                    self.connections
                        .unauth
                        .send_sealed_message(
                            recipient,
                            &request,
                            UserBasedAuthorization::AccessKey(*access_key),
                        )
                        .await
                }
                SendAuthorization::Authenticated => {
                    self.connections.auth.send_message(recipient, &request).await
                }
            }
        };

        match self.config.response_timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .unwrap_or_else(|_elapsed| Err(RequestError::Timeout)),
            None => send.await,
        }
    }
}
