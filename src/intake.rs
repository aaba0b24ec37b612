use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};

use crate::{models::{Gender, StoryRequest}, photo::DataUrl};

/// One-click fillers offered under the prompt box.
pub const EXAMPLE_PROMPTS: &[&str] = &[
    "My child refuses to eat vegetables",
    "My child is afraid of the dark at bedtime",
    "My child doesn't want to share toys with siblings",
    "My child learned to ride a bike today",
    "My child made a new friend at school",
];

/// Draft fields of the intake form, as handed to the story screen.
///
/// Every field is optional here; [`IntakeForm::submit`] is the only way to get a
/// [`StoryRequest`] out of it.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeForm {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub child_name: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub child_gender: Option<Gender>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub child_photo: Option<DataUrl>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub story_prompt: Option<String>,
}

impl IntakeForm {
    /// Names of the fields still blank, in form order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if non_blank(&self.child_name).is_none() {
            missing.push("childName");
        }
        if self.child_gender.is_none() {
            missing.push("childGender");
        }
        if self.child_photo.is_none() {
            missing.push("childPhoto");
        }
        if non_blank(&self.story_prompt).is_none() {
            missing.push("storyPrompt");
        }
        missing
    }

    /// Gate for the submit button.
    pub fn can_submit(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn submit(&self) -> Option<StoryRequest> {
        if !self.can_submit() {
            return None;
        }
        Some(StoryRequest {
            child_name: non_blank(&self.child_name)?.to_string(),
            child_gender: self.child_gender?,
            child_photo: self.child_photo.clone()?,
            story_prompt: non_blank(&self.story_prompt)?.to_string(),
        })
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn photo() -> DataUrl {
        DataUrl::new("image/png", vec![1u8, 2, 3]).unwrap()
    }

    fn complete() -> IntakeForm {
        IntakeForm {
            child_name: Some("Maya".into()),
            child_gender: Some(Gender::Girl),
            child_photo: Some(photo()),
            story_prompt: Some(EXAMPLE_PROMPTS[1].into()),
        }
    }

    #[test]
    fn empty_form_cannot_submit() {
        let form = IntakeForm::default();
        assert!(!form.can_submit());
        assert_eq!(form.submit(), None);
        assert_eq!(form.missing_fields(), vec!["childName", "childGender", "childPhoto", "storyPrompt"]);
    }

    #[test]
    fn any_single_missing_field_blocks_submit() {
        let mut no_name = complete();
        no_name.child_name = Some("   ".into());
        let mut no_gender = complete();
        no_gender.child_gender = None;
        let mut no_photo = complete();
        no_photo.child_photo = None;
        let mut no_prompt = complete();
        no_prompt.story_prompt = None;

        for form in [no_name, no_gender, no_photo, no_prompt] {
            assert!(!form.can_submit());
            assert_eq!(form.submit(), None);
        }
    }

    #[test]
    fn complete_form_submits_trimmed_request() {
        let mut form = complete();
        form.child_name = Some("  Maya ".into());
        assert!(form.can_submit());
        let request = form.submit().unwrap();
        assert_eq!(request.child_name, "Maya");
        assert_eq!(request.child_gender, Gender::Girl);
        assert_eq!(request.child_photo, photo());
        assert_eq!(request.story_prompt, "My child is afraid of the dark at bedtime");
    }

    #[test]
    fn empty_strings_deserialize_as_missing() {
        let form: IntakeForm = serde_json::from_value(json!({
            "childName": "Leo",
            "childGender": "",
            "childPhoto": "",
            "storyPrompt": "",
        }))
        .unwrap();
        assert_eq!(form.child_gender, None);
        assert_eq!(form.child_photo, None);
        assert_eq!(form.missing_fields(), vec!["childGender", "childPhoto", "storyPrompt"]);
    }

    #[test]
    fn absent_keys_deserialize_as_missing() {
        let form: IntakeForm = serde_json::from_value(json!({})).unwrap();
        assert_eq!(form, IntakeForm::default());
    }

    #[test]
    fn photo_is_forwarded_unchanged() {
        let preview = photo().to_string();
        let form: IntakeForm = serde_json::from_value(json!({
            "childName": "Leo",
            "childGender": "boy",
            "childPhoto": preview,
            "storyPrompt": "My child learned to ride a bike today",
        }))
        .unwrap();
        let request = form.submit().unwrap();
        assert_eq!(request.child_photo.to_string(), preview);
    }
}
