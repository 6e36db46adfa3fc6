use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{
    validation::{Validate, ValidationErrors},
    ExampleData, WithId,
};

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub author_name: String,
    pub message: String,
    #[serde(skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,
    /// Filled in when read; replies are created through their own endpoint.
    #[serde(skip_deserializing)]
    pub replies: Vec<WithId<Reply>>,
}

impl HasId for Feedback {
    type IdType = i64;
}

impl Validate for Feedback {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_not_blank("authorName", &self.author_name);
        errors.require_max_length("authorName", &self.author_name, 100);
        errors.require_not_blank("message", &self.message);
        errors.into_result()
    }
}

impl ExampleData for Feedback {
    fn example_data() -> Self {
        Self {
            author_name: "Kasun".to_owned(),
            message: "The 7:30 bus was full again today.".to_owned(),
            created_at: None,
            replies: vec![WithId::new(Id::new(1), Reply::example_data())],
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub feedback: Id<Feedback>,
    pub author_name: String,
    pub message: String,
    #[serde(skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,
}

impl HasId for Reply {
    type IdType = i64;
}

impl Validate for Reply {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_not_blank("authorName", &self.author_name);
        errors.require_max_length("authorName", &self.author_name, 100);
        errors.require_not_blank("message", &self.message);
        errors.into_result()
    }
}

impl ExampleData for Reply {
    fn example_data() -> Self {
        Self {
            feedback: Id::new(1),
            author_name: "Transport Office".to_owned(),
            message: "We are adding a second bus on that slot from Monday.".to_owned(),
            created_at: None,
        }
    }
}

/// Newest first.
pub fn sort_newest_first(feedbacks: &mut [WithId<Feedback>]) {
    feedbacks.sort_by(|a, b| {
        b.content
            .created_at
            .cmp(&a.content.created_at)
            .then(b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_message_is_rejected() {
        let feedback = Feedback {
            message: "   ".to_owned(),
            ..Feedback::example_data()
        };
        let errors = feedback.validate().unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["message"]);
    }

    #[test]
    fn replies_are_not_accepted_as_input() {
        let feedback: Feedback = serde_json::from_str(
            r#"{"authorName":"A","message":"B","replies":[{"feedback":1,"authorName":"x","message":"y"}]}"#,
        )
        .unwrap();
        assert!(feedback.replies.is_empty());
    }
}
