use crate::client::DescriptionClient;
use crate::encoder::{to_data_url, ImageEncoder, ImageLocator};
use crate::error::{ClipboardError, DescribeError};
use std::time::Duration;
use thiserror::Error;

pub const FEEDBACK_DISPLAY: Duration = Duration::from_millis(3000);

pub const MIN_WORDS: u32 = 1;
pub const MAX_WORDS: u32 = 100;
pub const DEFAULT_WORDS: u32 = 25;

pub const COPY_LABEL: &str = "Copy";
pub const PLACEHOLDER_PROMPT: &str = "Drop image here or click to upload";

/// The image currently shown in the drop target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub local_url: String,
    pub mime_type: String,
}

impl ImageHandle {
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            local_url: to_data_url(mime_type, bytes),
            mime_type: mime_type.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageArea {
    Placeholder,
    Image(ImageHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    Empty,
    ImageLoaded,
    Loading,
    Described,
    Error,
}

/// Which of the mutually exclusive panels is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Content,
    Loading,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    ImageArea,
    CopyButton,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub image_area: bool,
    pub length: bool,
    pub describe: bool,
    pub output: bool,
    pub copy: bool,
    pub clear: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyFeedback {
    Idle,
    Copied,
    Failed,
}

impl CopyFeedback {
    pub fn label(&self) -> &'static str {
        match self {
            CopyFeedback::Idle => COPY_LABEL,
            CopyFeedback::Copied => "😄 Copied",
            CopyFeedback::Failed => "😔 Failed",
        }
    }

    pub fn class(&self) -> Option<&'static str> {
        match self {
            CopyFeedback::Idle => None,
            CopyFeedback::Copied => Some("copied"),
            CopyFeedback::Failed => Some("failed"),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescribeRejected {
    #[error("a description is already in progress")]
    Busy,
    #[error("there is no image to describe")]
    NotReady,
}

/// Work handed out by [`UiController::begin_describe`]. Runs without holding
/// the controller.
#[derive(Debug, Clone)]
pub struct DescribeJob {
    pub locator: ImageLocator,
    pub mime_type: String,
    pub max_words: u32,
}

impl DescribeJob {
    pub async fn run(
        self,
        encoder: &ImageEncoder,
        client: &DescriptionClient,
    ) -> Result<String, DescribeError> {
        let image_base64 = encoder.encode(&self.locator).await?;
        client
            .describe(image_base64, &self.mime_type, self.max_words)
            .await
    }
}

/// The page's state machine.
///
/// Every change to the image area goes through `set_image_area`, which
/// re-evaluates control enablement exactly once.
#[derive(Debug, Clone)]
pub struct UiController {
    state: UiState,
    image_area: ImageArea,
    file_name: Option<String>,
    max_words: u32,
    description: String,
    error_message: Option<String>,
    panel: Panel,
    controls: Controls,
    focus: Focus,
    copy_feedback: CopyFeedback,
    feedback_generation: u64,
    enablement_checks: u64,
}

impl Default for UiController {
    fn default() -> Self {
        Self::new()
    }
}

impl UiController {
    pub fn new() -> Self {
        Self {
            state: UiState::Empty,
            image_area: ImageArea::Placeholder,
            file_name: None,
            max_words: DEFAULT_WORDS,
            description: String::new(),
            error_message: None,
            panel: Panel::Content,
            controls: Controls {
                image_area: true,
                ..Controls::default()
            },
            focus: Focus::ImageArea,
            copy_feedback: CopyFeedback::Idle,
            feedback_generation: 0,
            enablement_checks: 0,
        }
    }

    pub fn state(&self) -> UiState {
        self.state
    }

    pub fn image_area(&self) -> &ImageArea {
        &self.image_area
    }

    pub fn image(&self) -> Option<&ImageHandle> {
        match &self.image_area {
            ImageArea::Image(handle) => Some(handle),
            ImageArea::Placeholder => None,
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn max_words(&self) -> u32 {
        self.max_words
    }

    pub fn length_readout(&self) -> String {
        format!("Description Length: {} Words", self.max_words)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn panel(&self) -> Panel {
        self.panel
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn copy_feedback(&self) -> CopyFeedback {
        self.copy_feedback
    }

    pub fn enablement_checks(&self) -> u64 {
        self.enablement_checks
    }

    /// Loads a dropped or selected file. Returns `false` when the file was
    /// ignored: non-image types, or the drop target is unavailable.
    pub fn select_image(&mut self, file_name: Option<&str>, mime_type: &str, bytes: &[u8]) -> bool {
        if !mime_type.starts_with("image/") {
            tracing::debug!(mime_type, "ignoring non-image file");
            return false;
        }
        if !self.controls.image_area || self.state == UiState::Loading {
            return false;
        }

        self.file_name = file_name.map(str::to_string);
        self.description.clear();
        self.copy_feedback = CopyFeedback::Idle;
        self.state = UiState::ImageLoaded;
        self.set_image_area(ImageArea::Image(ImageHandle::from_bytes(mime_type, bytes)));
        true
    }

    pub fn set_max_words(&mut self, max_words: u32) -> bool {
        if !self.controls.length {
            return false;
        }
        self.max_words = max_words.clamp(MIN_WORDS, MAX_WORDS);
        true
    }

    /// Moves to `Loading` and hands out the work to do. Rejects re-entry while
    /// a request is in flight.
    pub fn begin_describe(&mut self) -> Result<DescribeJob, DescribeRejected> {
        match self.state {
            UiState::Loading => return Err(DescribeRejected::Busy),
            UiState::Empty | UiState::Error => return Err(DescribeRejected::NotReady),
            UiState::ImageLoaded | UiState::Described => {}
        }
        let handle = self.image().cloned().ok_or(DescribeRejected::NotReady)?;

        self.state = UiState::Loading;
        self.panel = Panel::Loading;
        self.controls = Controls::default();

        Ok(DescribeJob {
            locator: ImageLocator::DataUrl(handle.local_url),
            mime_type: handle.mime_type,
            max_words: self.max_words,
        })
    }

    pub fn finish_describe(&mut self, result: Result<String, DescribeError>) {
        if self.state != UiState::Loading {
            tracing::warn!(state = ?self.state, "describe finished outside of loading");
            return;
        }

        match result {
            Ok(description) => {
                self.state = UiState::Described;
                self.panel = Panel::Content;
                self.description = description;
                self.controls = Controls {
                    image_area: true,
                    length: true,
                    describe: true,
                    output: true,
                    copy: true,
                    clear: true,
                };
                self.focus = Focus::CopyButton;
            }
            Err(e) => {
                tracing::error!(kind = e.kind().as_str(), error = %e, "describe failed");
                self.state = UiState::Error;
                self.panel = Panel::Error;
                self.controls = Controls::default();
                self.error_message =
                    Some(format!("There was an error processing the image: {e}"));
            }
        }
    }

    /// Text to put on the clipboard, if copying is currently possible.
    pub fn copy_text(&self) -> Option<String> {
        (self.state == UiState::Described && self.controls.copy).then(|| self.description.clone())
    }

    /// Shows copy feedback and returns the generation a later revert must match.
    /// Returns `None` when the description was cleared while the clipboard
    /// write was in flight.
    pub fn apply_copy_result(&mut self, result: Result<(), ClipboardError>) -> Option<u64> {
        if self.state != UiState::Described {
            tracing::debug!(state = ?self.state, "copy finished after the description was gone");
            return None;
        }
        self.copy_feedback = match result {
            Ok(()) => CopyFeedback::Copied,
            Err(e) => {
                tracing::warn!(error = %e, "copy failed");
                CopyFeedback::Failed
            }
        };
        self.feedback_generation += 1;
        Some(self.feedback_generation)
    }

    /// Restores the Copy label unless a newer copy has replaced the feedback.
    pub fn revert_copy_feedback(&mut self, generation: u64) -> bool {
        if generation != self.feedback_generation {
            return false;
        }
        self.copy_feedback = CopyFeedback::Idle;
        true
    }

    pub fn clear(&mut self) -> bool {
        if !self.controls.clear {
            return false;
        }
        self.reset();
        true
    }

    pub fn dismiss_error(&mut self) -> bool {
        if self.state != UiState::Error {
            return false;
        }
        self.error_message = None;
        self.panel = Panel::Content;
        self.reset();
        true
    }

    fn reset(&mut self) {
        self.file_name = None;
        self.description.clear();
        self.copy_feedback = CopyFeedback::Idle;
        self.state = UiState::Empty;
        self.controls.image_area = true;
        self.set_image_area(ImageArea::Placeholder);
        self.focus = Focus::ImageArea;
    }

    fn set_image_area(&mut self, area: ImageArea) {
        self.image_area = area;
        self.update_enablement();
    }

    fn update_enablement(&mut self) {
        self.enablement_checks += 1;
        let has_image = matches!(self.image_area, ImageArea::Image(_));
        self.controls.length = has_image;
        self.controls.describe = has_image;
        self.controls.clear = has_image;
        if !has_image || self.state != UiState::Described {
            self.controls.copy = false;
            self.controls.output = false;
        }
    }
}
