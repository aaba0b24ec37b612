use std::{fmt, str::FromStr};

use serde::{Serialize, Deserialize};

use crate::photo::DataUrl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Boy,
    Girl,
}

impl Gender {
    /// Pronoun set the story must stick to.
    pub fn pronouns(self) -> &'static str {
        match self {
            Gender::Boy => "he/him/his",
            Gender::Girl => "she/her/hers",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gender::Boy => "boy",
            Gender::Girl => "girl",
        })
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boy" => Ok(Gender::Boy),
            "girl" => Ok(Gender::Girl),
            other => Err(format!("unknown gender `{other}`")),
        }
    }
}

/// Everything the story screen needs, captured once on submit and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRequest {
    pub child_name: String,
    pub child_gender: Gender,
    pub child_photo: DataUrl,
    pub story_prompt: String,
}

/// Stage 1 output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftStory {
    pub story: String,
    pub image_prompt: String,
}

/// Stage 2 output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Illustration {
    pub cartoon_description: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResult {
    pub story: String,
    #[serde(skip)]
    pub image_prompt: String,
    #[serde(skip)]
    pub cartoon_description: Option<String>,
    pub story_image: Option<String>,
}

impl StoryResult {
    pub fn assemble(draft: DraftStory, illustration: Option<Illustration>) -> Self {
        let (cartoon_description, story_image) = match illustration {
            Some(i) => (Some(i.cartoon_description), Some(i.url)),
            None => (None, None),
        };
        Self {
            story: draft.story,
            image_prompt: draft.image_prompt,
            cartoon_description,
            story_image,
        }
    }

    /// Paragraph blocks in display order; the story separates them with a blank line.
    pub fn paragraphs(&self) -> Vec<&str> {
        self.story.split("\n\n").collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn gender_parses_and_picks_pronouns() {
        assert_eq!("Boy".parse::<Gender>(), Ok(Gender::Boy));
        assert_eq!(" girl ".parse::<Gender>(), Ok(Gender::Girl));
        assert!("robot".parse::<Gender>().is_err());
        assert_eq!(Gender::Boy.pronouns(), "he/him/his");
        assert_eq!(Gender::Girl.pronouns(), "she/her/hers");
        assert_eq!(serde_json::to_string(&Gender::Girl).unwrap(), "\"girl\"");
    }

    #[test]
    fn five_paragraph_story_splits_in_order() {
        let result = StoryResult::assemble(
            DraftStory { story: "P1\n\nP2\n\nP3\n\nP4\n\nP5".into(), image_prompt: "a child smiling".into() },
            None,
        );
        assert_eq!(result.paragraphs(), vec!["P1", "P2", "P3", "P4", "P5"]);
    }

    #[test]
    fn assemble_keeps_illustration_url() {
        let result = StoryResult::assemble(
            DraftStory { story: "Once".into(), image_prompt: "scene".into() },
            Some(Illustration { cartoon_description: "a cartoon".into(), url: "https://img/1.png".into() }),
        );
        assert_eq!(result.story_image.as_deref(), Some("https://img/1.png"));
        assert_eq!(result.cartoon_description.as_deref(), Some("a cartoon"));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({ "story": "Once", "storyImage": "https://img/1.png" }));
    }
}
