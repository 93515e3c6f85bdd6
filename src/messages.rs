//! Wire types for the describe conversation sent to the proxy.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

/// One unit of a message: an image or a piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Image { source: ImageSource },
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ImageSource {
    Base64 { media_type: String, data: String },
}

pub fn instruction(max_words: u32) -> String {
    format!("Describe the image. Limit the description to {max_words} words.")
}

/// Everything needed to ask for one description. Built fresh per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionRequest {
    pub image_base64: String,
    pub mime_type: String,
    pub max_words: u32,
}

impl DescriptionRequest {
    pub fn into_messages(self) -> Vec<Message> {
        vec![Message {
            role: Role::User,
            content: vec![
                ContentBlock::Image {
                    source: ImageSource::Base64 {
                        media_type: self.mime_type,
                        data: self.image_base64,
                    },
                },
                ContentBlock::Text {
                    text: instruction(self.max_words),
                },
            ],
        }]
    }
}
