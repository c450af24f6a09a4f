//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Interpreting the server's answer to one send attempt.

use chatbridge_core::DeviceId;
use chatbridge_net_chat::api::messages::{SendMessageFailure, SendMessageResponse};
use chatbridge_net_chat::api::RequestError;

use crate::SendError;

/// A change to the recipient's local sessions to make before the next attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Repair {
    /// Fetch a pre-key bundle for the device and start a new session with it.
    Establish(DeviceId),
    /// Drop the session for the device.
    Remove(DeviceId),
}

/// What to do after an attempt made at some retry depth.
#[derive(Debug)]
pub(crate) enum Step {
    Sent { needs_sync: bool },
    /// Apply `repairs` in order, then try again at `depth`.
    Retry { repairs: Vec<Repair>, depth: u32 },
    Failed(SendError),
}

/// Decides the next step for an attempt made at `depth`.
///
/// Whether the next depth is still allowed is left to the caller, which checks it before every
/// attempt.
pub(crate) fn next_step(
    response: Result<SendMessageResponse, RequestError<SendMessageFailure>>,
    depth: u32,
) -> Step {
    let failure = match response {
        Ok(SendMessageResponse { needs_sync }) => return Step::Sent { needs_sync },
        Err(RequestError::Other(failure)) => failure,
        Err(e) => return Step::Failed(request_error(e)),
    };

    let repairs = match failure {
        SendMessageFailure::MismatchedDevices {
            missing_devices,
            extra_devices,
        } => missing_devices
            .into_iter()
            .map(Repair::Establish)
            .chain(extra_devices.into_iter().map(Repair::Remove))
            .collect(),
        SendMessageFailure::StaleDevices { stale_devices } => stale_devices
            .into_iter()
            .flat_map(|device| [Repair::Remove(device), Repair::Establish(device)])
            .collect(),
        SendMessageFailure::ProofRequired { .. } | SendMessageFailure::ServiceUnavailable(_) => {
            vec![]
        }
        SendMessageFailure::Rejected(status) => {
            return Step::Failed(SendError::ProtocolStatus(status.as_u16()))
        }
    };

    Step::Retry {
        repairs,
        depth: depth + 1,
    }
}

fn request_error(error: RequestError<SendMessageFailure>) -> SendError {
    match error {
        RequestError::Timeout => SendError::Transport("timed out waiting for a response".into()),
        RequestError::Disconnected(d) => SendError::Transport(d.to_string()),
        // Not one of the statuses we retry on.
        RequestError::RetryLater(_) => SendError::ProtocolStatus(429),
        RequestError::ServerSideError => {
            SendError::UnexpectedResponse("server-side error".to_owned())
        }
        RequestError::Unexpected { log_safe } => SendError::UnexpectedResponse(log_safe),
        RequestError::Other(failure) => SendError::UnexpectedResponse(failure.to_string()),
    }
}
