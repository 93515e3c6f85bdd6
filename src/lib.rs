pub mod client;
pub mod config;
pub mod encoder;
pub mod error;
pub mod messages;
pub mod proxy;
pub mod signal;
pub mod telemetry;
pub mod ui;

pub use client::DescriptionClient;
pub use encoder::{ImageEncoder, ImageLocator};
pub use error::{ClipboardError, DescribeError, ErrorKind};
pub use ui::controller::{UiController, UiState};
