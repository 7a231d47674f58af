//! `electronbond-http` is an async client for Project Electron REST APIs.
//!
//! [`ElectronBondClient`] wraps one retrying HTTP [`Session`] and offers:
//! - the seven HTTP verbs through [`HttpMethods`], always targeting the configured base URL
//! - token authorization with [`ElectronBondClient::authorize`] or
//!   [`ElectronBondClient::authorize_oauth`]
//! - paged listings with [`ElectronBondClient::get_paged`]

mod auth;
mod client;
mod config;
mod error;
mod methods;
mod options;
mod paginate;
mod retry;
mod session;
mod urls;
mod wire;

pub use client::ElectronBondClient;
pub use config::ClientConfig;
pub use error::{AuthError, ElectronBondError, ReturnError};
pub use methods::{ApiRequest, HttpMethods};
pub use options::ClientOptions;
pub use paginate::PagedRequest;
pub use retry::RetryPolicy;
pub use session::{build_session, Session, USER_AGENT};
pub use urls::prefix_url;

pub type Result<T> = std::result::Result<T, ElectronBondError>;
