//! Resume rendering pipeline.
//!
//! A template is rendered by one of three strategies selected by its
//! `renderEngine` tag: `html` expands Handlebars markup into a full document,
//! `builder` walks a declarative component tree, and `canvas` resolves a flat
//! list of absolutely positioned objects against the page.
//!
//! Rendering is synchronous and pure. Callers on the async runtime run it inside
//! `tokio::task::spawn_blocking`.

pub mod builder;
pub mod canvas;
pub mod dispatch;
pub mod error;
pub mod expander;
pub mod helpers;
pub mod path;

pub use dispatch::{RenderOutput, Renderer};
pub use error::RenderError;
