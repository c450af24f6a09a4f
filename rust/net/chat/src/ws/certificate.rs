//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::convert::Infallible;

use async_trait::async_trait;
use chatbridge_net::chat::Request;
use serde_with::base64::{Base64, Standard};
use serde_with::formats::Padded;
use serde_with::serde_as;

use super::{CustomError, TryIntoResponse, WsConnection};
use crate::api::{Auth, RequestError};

const DELIVERY_CERTIFICATE_PATH: &str = "/v1/certificate/delivery";

#[serde_as]
#[derive(serde::Deserialize)]
struct SenderCertificateResponse {
    #[serde_as(as = "Base64<Standard, Padded>")]
    certificate: Vec<u8>,
}

#[async_trait]
impl<T: WsConnection> crate::api::certificate::AuthenticatedChatApi for Auth<T> {
    async fn get_sender_certificate(&self) -> Result<Vec<u8>, RequestError<Infallible>> {
        let response = self
            .send(
                "auth",
                DELIVERY_CERTIFICATE_PATH,
                Request {
                    method: http::Method::GET,
                    path: http::uri::PathAndQuery::from_static(DELIVERY_CERTIFICATE_PATH),
                    headers: http::HeaderMap::new(),
                    body: None,
                },
            )
            .await?;

        let SenderCertificateResponse { certificate } = response
            .try_into_response()
            .map_err(|e| e.into_request_error(|_| CustomError::NoCustomHandling))?;
        Ok(certificate)
    }
}
