use crate::models::StoryRequest;

/// Look the portrait must have, used in both the vision and the image call.
pub const CARTOON_STYLE: &str = "Create this as a cartoon portrait with thick black outlines, flat colors, large expressive cartoon eyes, simplified features, and a soft pastel pink background. Children's book illustration style.";

pub const VISION_INSTRUCTION: &str = "Convert this photo into a cute cartoon character illustration. Use a children's book style with bold black outlines, flat colors, large expressive eyes, and a friendly smile. Keep the child's unique features (hair, skin tone, clothing) but make it look like a cartoon/animated character. Set against a soft pastel pink background.";

pub fn story_system_instruction(req: &StoryRequest) -> String {
    let StoryRequest { child_name, child_gender, story_prompt, .. } = req;
    let pronouns = child_gender.pronouns();
    format!(
        "You are a creative children's story writer. Create a complete story for a {child_gender} named {child_name}. \
        The story should be positive, age-appropriate (2-8 years old), and address the following situation: {story_prompt}.\n\n\
        IMPORTANT: Use appropriate pronouns ({pronouns}) throughout the story.\n\n\
        You must respond with ONLY valid JSON. No additional text before or after the JSON.\n\n\
        Format your response as a JSON object with exactly this structure:\n\
        {{\n  \"story\": \"the complete story text (5-8 paragraphs, engaging and age-appropriate)\",\n  \
        \"imagePrompt\": \"a detailed description for generating ONE main illustration\"\n}}\n\n\
        Make sure the story has a clear beginning, middle, and end with a positive resolution. \
        Separate paragraphs with a blank line.\n\
        Remember: Return ONLY the JSON object, nothing else."
    )
}

pub fn story_user_instruction(req: &StoryRequest) -> String {
    format!("Create a story about {} and this situation: {}", req.child_name, req.story_prompt)
}

pub fn illustration_prompt(cartoon_description: &str) -> String {
    format!("{}. {}", cartoon_description.trim().trim_end_matches('.'), CARTOON_STYLE)
}
