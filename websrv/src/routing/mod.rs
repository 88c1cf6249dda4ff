// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{convert::Infallible, pin::pin, str::FromStr as _, sync::Arc};

use bytes::{BufMut as _, BytesMut};
use futures_util::TryStreamExt as _;
use serde::Deserialize;
use warp::{
    Filter, Rejection, Reply,
    filters::{BoxedFilter, multipart::FormData},
    http::{Uri, header::SET_COOKIE},
};

use takrar_core::{
    asset::{UploadedFile, catalog::AssetKey},
    playback::TransportCommand,
};

use crate::{
    config::Config,
    error::{Error, reject_on_error, spawn_blocking_task},
    page,
    session::{SESSION_COOKIE_NAME, Session, SessionId, SessionStore},
};

/// Upper bound for the url-encoded body of a page interaction.
const FORM_BODY_MAX_BYTES: u64 = 16 * 1024;

const UPLOAD_FIELD_NAME: &str = "file";

/// State that is shared by all requests.
#[derive(Debug)]
pub(crate) struct AppContext {
    pub(crate) config: Config,
    pub(crate) sessions: SessionStore,
}

impl AppContext {
    #[must_use]
    pub(crate) fn new(config: Config) -> Self {
        let sessions = SessionStore::new(
            config.session.default_repeat_count,
            config.session.max_uploads,
            config.session.max_sessions,
            config.session.idle_timeout(),
        );
        Self { config, sessions }
    }

    fn uploads_left(&self, session: &Session) -> usize {
        self.config
            .session
            .max_uploads
            .saturating_sub(session.uploads.len())
    }
}

/// The fields of all forms on the page.
///
/// Numbers are received as text. Malformed values are ignored instead
/// of rejecting the whole request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PageParams {
    command: Option<String>,
    preset: Option<String>,
    reps: Option<String>,
    asset: Option<String>,
}

impl PageParams {
    /// Updates the session and returns the transport command.
    ///
    /// A preset that is sent together with a manual value wins.
    fn apply_to(&self, session: &mut Session) -> Option<TransportCommand> {
        if let Some(asset_key) = self.asset.as_deref().and_then(AssetKey::parse) {
            session.selected = Some(asset_key);
        }
        let preset = self
            .preset
            .as_deref()
            .and_then(|preset| preset.trim().parse::<u64>().ok())
            .and_then(|preset| session.repeat_count.set_from_preset(preset));
        if preset.is_none() {
            if let Some(reps) = self.reps.as_deref() {
                if session.repeat_count.set_from_manual_input(reps).is_none() {
                    log::debug!("Ignoring manual repeat count input \"{reps}\"");
                }
            }
        }
        self.command.as_deref().and_then(|command| {
            TransportCommand::from_str(command.trim())
                .map_err(|err| {
                    log::debug!("Ignoring transport command \"{command}\": {err}");
                })
                .ok()
        })
    }
}

fn with_session_cookie(reply: impl Reply, session_id: SessionId) -> impl Reply {
    warp::reply::with_header(reply, SET_COOKIE, session_id.set_cookie_header_value())
}

async fn render_page(
    context: Arc<AppContext>,
    session_cookie: Option<String>,
    params: PageParams,
) -> Result<impl Reply, Rejection> {
    let session_id = context.sessions.resolve(session_cookie.as_deref());
    let command = context
        .sessions
        .update(session_id, |session| params.apply_to(session));
    let session = context.sessions.snapshot(session_id);
    log::debug!(
        "Rendering page for session {session_id}: command = {command:?}, repeat count = {repeat_count}",
        repeat_count = session.repeat_count.current_value(),
    );
    let html = spawn_blocking_task(move || {
        let uploads_left = context.uploads_left(&session);
        page::assemble(
            &context.config.content,
            &session,
            command,
            context.config.player.resume_policy(),
            uploads_left,
        )
        .render()
    })
    .await?;
    Ok(with_session_cookie(warp::reply::html(html), session_id))
}

/// Reads all uploaded files into memory.
///
/// Parts with other names or without any content are skipped.
async fn collect_uploaded_files(form_data: FormData) -> anyhow::Result<Vec<UploadedFile>> {
    let mut parts = pin!(form_data);
    let mut files = Vec::new();
    while let Some(part) = parts.try_next().await? {
        if part.name() != UPLOAD_FIELD_NAME {
            log::debug!("Skipping form field {}", part.name());
            continue;
        }
        let Some(file_name) = part.filename().map(ToOwned::to_owned) else {
            log::debug!("Skipping uploaded part without file name");
            continue;
        };
        let content = part
            .stream()
            .try_fold(BytesMut::new(), |mut content, buf| async move {
                content.put(buf);
                Ok(content)
            })
            .await?;
        if content.is_empty() {
            log::debug!("Skipping empty uploaded file {file_name}");
            continue;
        }
        files.push(UploadedFile {
            file_name,
            content: content.freeze(),
        });
    }
    Ok(files)
}

async fn upload_files(
    context: Arc<AppContext>,
    session_cookie: Option<String>,
    form_data: FormData,
) -> Result<impl Reply, Rejection> {
    let session_id = context.sessions.resolve(session_cookie.as_deref());
    let files = collect_uploaded_files(form_data)
        .await
        .map_err(|err| reject_on_error(Error::BadRequest(err)))?;
    let outcome = context.sessions.add_uploads(session_id, files);
    log::info!(
        "Uploaded {accepted} file(s) into session {session_id}, rejected {rejected}",
        accepted = outcome.accepted,
        rejected = outcome.rejected,
    );
    if let Some(index) = outcome.first_index {
        context.sessions.update(session_id, |session| {
            session.selected = Some(AssetKey::uploaded(index));
        });
    }
    let redirect = warp::redirect::see_other(Uri::from_static("/"));
    Ok(with_session_cookie(redirect, session_id))
}

fn create_filters(
    context: Arc<AppContext>,
    about_json: serde_json::Value,
) -> BoxedFilter<(impl Reply,)> {
    let max_upload_request_bytes = context.config.session.max_upload_request_bytes;
    let context = warp::any().map(move || Arc::clone(&context));
    let session_cookie = warp::cookie::optional(SESSION_COOKIE_NAME);

    log::info!("Creating page routes");

    // Paths are matched before methods for distinguishing
    // 404 Not Found from 405 Method Not Allowed.

    // GET /
    let page_get = warp::path::end()
        .and(warp::get())
        .and(context.clone())
        .and(session_cookie)
        .and_then(|context: Arc<AppContext>, session_cookie: Option<String>| {
            render_page(context, session_cookie, PageParams::default())
        });

    // POST /
    let page_post = warp::path::end()
        .and(warp::post())
        .and(context.clone())
        .and(session_cookie)
        .and(warp::body::content_length_limit(FORM_BODY_MAX_BYTES))
        .and(warp::body::form())
        .and_then(render_page);

    // POST /upload
    let upload_post = warp::path("upload")
        .and(warp::path::end())
        .and(warp::post())
        .and(context)
        .and(session_cookie)
        .and(warp::body::content_length_limit(max_upload_request_bytes))
        .and(warp::multipart::form().max_length(max_upload_request_bytes))
        .and_then(upload_files);

    // GET /about
    let about_get = warp::path("about")
        .and(warp::path::end())
        .and(warp::get())
        .map(move || warp::reply::json(&about_json));

    page_get
        .or(page_post)
        .or(upload_post)
        .or(about_get)
        .boxed()
}

/// All routes with rejections turned into error responses.
pub(crate) fn create_service(
    context: Arc<AppContext>,
    about_json: serde_json::Value,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    create_filters(context, about_json).recover(crate::error::handle_rejection)
}
