use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociationType {
    Synonym,
    Antonym,
}

impl AssociationType {
    pub fn as_str(self) -> &'static str {
        match self {
            AssociationType::Synonym => "synonym",
            AssociationType::Antonym => "antonym",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordAssociation {
    pub word: String,
    #[serde(rename = "type")]
    pub kind: AssociationType,
}

impl WordAssociation {
    pub fn synonym(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            kind: AssociationType::Synonym,
        }
    }

    pub fn antonym(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            kind: AssociationType::Antonym,
        }
    }
}

/// JSONB shape stored in `word_dictionary.associations`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationsPayload {
    #[serde(default)]
    pub items: Vec<WordAssociation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    #[default]
    Synonym,
    Antonym,
    Definition,
    Examples,
}

impl RequestType {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestType::Synonym => "synonym",
            RequestType::Antonym => "antonym",
            RequestType::Definition => "definition",
            RequestType::Examples => "examples",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "synonym" => Some(RequestType::Synonym),
            "antonym" => Some(RequestType::Antonym),
            "definition" => Some(RequestType::Definition),
            "examples" => Some(RequestType::Examples),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Where an analysis request came from. Stored in `request_history.source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestSource {
    Web,
    Telegram,
    Api,
}

impl RequestSource {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestSource::Web => "web",
            RequestSource::Telegram => "telegram",
            RequestSource::Api => "api",
        }
    }
}

impl fmt::Display for RequestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one `analyze_word` call as seen by the API, web UI and bot.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub status: ProcessingStatus,
    pub result: Option<Vec<WordAssociation>>,
    pub error: Option<String>,
}

impl AnalysisOutcome {
    pub fn completed(result: Vec<WordAssociation>) -> Self {
        Self {
            status: ProcessingStatus::Completed,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: ProcessingStatus::Failed,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ProcessingStatus::Failed
    }
}
