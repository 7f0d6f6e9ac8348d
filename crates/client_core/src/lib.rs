//! Client-side controllers for the Knoology LMS front-end.
//!
//! Every screen is a controller that fetches through an [`HttpGateway`],
//! keeps its list or form state locally and exposes a [`view::ViewState`]
//! plus a [`view::Notice`] for whatever front-end draws it.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod forms;
pub mod gateway;
pub mod media;
pub mod messages;
pub mod prompt;
pub mod screens;
pub mod view;

pub use broadcast::{deliver_all, BroadcastSummary};
pub use config::{load_settings, Settings};
pub use error::{ClientError, GatewayError, ValidationError};
pub use gateway::{ApiRequest, ApiResponse, HttpGateway, Method, ReqwestGateway};
pub use media::{resolve_file_url, FileUrlResolver};
pub use prompt::{ComposeRequest, ConfirmRequest, ConfirmationPrompt, Decision, DeclineAllPrompt};
pub use screens::ScreenContext;
pub use view::{LoadingIndicator, Navigation, Notice, Outcome, Route, ViewState};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
