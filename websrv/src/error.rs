// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{convert::Infallible, error::Error as StdError, result::Result as StdResult};

use serde::Serialize;
use thiserror::Error;
use warp::{
    Reply,
    body::BodyDeserializeError,
    http::StatusCode,
    reject::{self, InvalidHeader, LengthRequired, MethodNotAllowed, PayloadTooLarge, Reject, Rejection},
};

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error(transparent)]
    BadRequest(anyhow::Error),

    #[error(transparent)]
    TaskScheduling(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Reject for Error {}

pub(crate) fn reject_on_error(err: impl Into<Error>) -> Rejection {
    reject::custom(err.into())
}

pub(crate) fn after_blocking_task_finished<T, E1, E2>(
    res: StdResult<StdResult<T, E1>, E2>,
) -> StdResult<T, Rejection>
where
    E1: Into<Error>,
    E2: Into<Error>,
{
    res.map_err(reject_on_error)
        .and_then(|res| res.map_err(reject_on_error))
}

/// Runs file I/O on the blocking thread pool of the runtime.
pub(crate) async fn spawn_blocking_task<H, T, E>(handler: H) -> StdResult<T, Rejection>
where
    H: FnOnce() -> StdResult<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<Error> + Send + 'static,
{
    after_blocking_task_finished(tokio::task::spawn_blocking(handler).await)
}

/// An error serializable to JSON.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponseBody {
    code: u16,
    message: String,
}

fn status_code_to_string(code: StatusCode) -> String {
    code.canonical_reason()
        .unwrap_or_else(|| code.as_str())
        .to_string()
}

fn source_or_self_to_string(err: &dyn StdError) -> String {
    err.source()
        .map_or_else(|| err.to_string(), ToString::to_string)
}

#[allow(clippy::unused_async)] // async needed for warp filter
pub(crate) async fn handle_rejection(reject: Rejection) -> StdResult<impl Reply, Infallible> {
    let code;
    let message;

    if reject.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = status_code_to_string(code);
    } else if let Some(err) = reject.find::<Error>() {
        match err {
            Error::BadRequest(err) => {
                code = StatusCode::BAD_REQUEST;
                message = err.to_string();
            }
            Error::TaskScheduling(err) => {
                code = StatusCode::INTERNAL_SERVER_ERROR;
                message = err.to_string();
            }
            Error::Other(err) => {
                code = StatusCode::INTERNAL_SERVER_ERROR;
                message = err.to_string();
            }
        }
    } else if let Some(err) = reject.find::<PayloadTooLarge>() {
        code = StatusCode::PAYLOAD_TOO_LARGE;
        message = err.to_string();
    } else if let Some(err) = reject.find::<LengthRequired>() {
        code = StatusCode::LENGTH_REQUIRED;
        message = err.to_string();
    } else if let Some(err) = reject.find::<InvalidHeader>() {
        code = StatusCode::BAD_REQUEST;
        message = source_or_self_to_string(err);
    } else if let Some(err) = reject.find::<BodyDeserializeError>() {
        code = StatusCode::BAD_REQUEST;
        message = source_or_self_to_string(err);
    } else if let Some(err) = reject.find::<MethodNotAllowed>() {
        // This must have the least priority, because most rejections
        // contain a MethodNotAllowed element!
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = err.to_string();
    } else {
        log::error!("Unhandled rejection {reject:?}");
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = format!("{reject:?}");
    }

    if code.is_server_error() {
        log::warn!("Request failed with status code {code}: {message}");
    } else {
        log::debug!("Request rejected with status code {code}: {message}");
    }

    let json_reply = warp::reply::json(&ErrorResponseBody {
        code: code.as_u16(),
        message,
    });

    Ok(warp::reply::with_status(json_reply, code))
}
