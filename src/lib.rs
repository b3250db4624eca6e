// Copyright © 2018, Peter Atashian

pub mod cli;
pub mod config;
pub mod importer;
pub mod logging;
pub mod session;
pub mod ticket;

pub use crate::config::{Config, Settings};
pub use crate::importer::{
    auth_base_url, expand, plan, Delay, FixedDelay, Importer, PageTarget, Report,
};
pub use crate::session::Session;
pub use crate::ticket::EditTicket;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::COOKIE;
use reqwest::StatusCode;
use std::io::Error as IoError;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("login at {url} failed with HTTP status {status}")]
    Authentication { url: Url, status: StatusCode },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("edit form at {url} has no usable `{field}` field")]
    MalformedResponse { url: Url, field: &'static str },
    #[error("failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: IoError },
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
    #[error(transparent)]
    Glob(#[from] glob::GlobError),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error("`{0}` cannot be used as a wiki base URL")]
    InvalidBaseUrl(String),
    #[error("cannot derive a page name from {}", .0.display())]
    InvalidFileName(PathBuf),
    #[error("invalid config file: {0}")]
    Config(#[from] serde_json::Error),
    #[error("no {0} given on the command line or in the config file")]
    MissingSetting(&'static str),
}
impl Error {
    /// The wiki was reachable but did not serve the expected edit form.
    pub fn is_critical(&self) -> bool {
        matches!(self, Error::MalformedResponse { .. })
    }
}

/// The three requests of the MoinMoin edit protocol.
pub trait Wiki {
    fn login(&self, url: &Url, username: &str, password: &str) -> Result<Session, Error>;
    fn get_ticket(&self, page: &Url, session: &Session) -> Result<EditTicket, Error>;
    fn edit_page(
        &self, page: &Url, session: &Session, text: &str, ticket: &EditTicket,
    ) -> Result<(), Error>;
}

pub struct Moinmoin {
    client: Client,
    comment: String,
}
impl Moinmoin {
    pub fn new(settings: &Settings) -> Result<Moinmoin, Error> {
        let client = Client::builder()
            .user_agent(settings.useragent.clone())
            .timeout(settings.timeout)
            .build()?;
        Ok(Moinmoin {
            client,
            comment: settings.comment.clone(),
        })
    }
    fn with_session(request: RequestBuilder, session: &Session) -> RequestBuilder {
        match session.header() {
            Some(cookies) => request.header(COOKIE, cookies),
            None => request,
        }
    }
}
impl Wiki for Moinmoin {
    fn login(&self, url: &Url, username: &str, password: &str) -> Result<Session, Error> {
        let args = [
            ("action", "login"),
            ("name", username),
            ("password", password),
            ("login", "Login"),
        ];
        debug!("POST {} (login)", url);
        let response = self.client.post(url.clone()).form(&args).send()?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Authentication {
                url: url.clone(),
                status,
            });
        }
        let session = Session::from_headers(response.headers());
        if session.is_empty() {
            warn!("Login at {} returned no cookies", url);
        }
        info!("Successfully logged in as {}", username);
        Ok(session)
    }
    fn get_ticket(&self, page: &Url, session: &Session) -> Result<EditTicket, Error> {
        let args = [("action", "edit"), ("editor", "text")];
        debug!("GET {} (edit form)", page);
        let request = self.client.get(page.clone()).query(&args);
        let response = Moinmoin::with_session(request, session)
            .send()?
            .error_for_status()?;
        let body = response.text()?;
        let ticket = EditTicket::from_html(&body).map_err(|field| Error::MalformedResponse {
            url: page.clone(),
            field,
        })?;
        info!("Got ticket to edit {}", page);
        Ok(ticket)
    }
    fn edit_page(
        &self, page: &Url, session: &Session, text: &str, ticket: &EditTicket,
    ) -> Result<(), Error> {
        let args = [
            ("action", "edit"),
            ("editor", "text"),
            ("rev", &*ticket.rev),
            ("ticket", &*ticket.ticket),
            ("button_save", "Save Changes"),
            ("savetext", text),
            ("comment", &*self.comment),
        ];
        debug!("POST {} ({} bytes, rev {})", page, text.len(), ticket.rev);
        let request = self.client.post(page.clone()).form(&args);
        Moinmoin::with_session(request, session)
            .send()?
            .error_for_status()?;
        info!("Successfully edited page {}", page);
        Ok(())
    }
}
