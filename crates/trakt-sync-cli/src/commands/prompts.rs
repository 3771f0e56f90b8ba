use color_eyre::Result;
use dialoguer::{Input, Password};

/// Prompt for a string value, re-asking until `validate` accepts it.
pub fn prompt_validated(
    prompt: &str,
    default: Option<&str>,
    validate: fn(&str) -> Result<(), &'static str>,
) -> Result<String> {
    let mut input_builder = Input::<String>::new().with_prompt(prompt);
    if let Some(default_value) = default.filter(|d| !d.is_empty()) {
        input_builder = input_builder.default(default_value.to_string());
    }

    input_builder
        .validate_with(|input: &String| validate(input.trim()))
        .interact_text()
        .map(|value| value.trim().to_string())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read input: {}", e))
}

/// Prompt for a secret (masked input). Asks for confirmation on first setup.
pub fn prompt_secret(prompt: &str, confirm: bool) -> Result<String> {
    let mut password_prompt = Password::new().with_prompt(prompt);
    if confirm {
        password_prompt = password_prompt.with_confirmation(format!("Confirm {}", prompt), "Values do not match");
    }

    password_prompt
        .interact()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read secret: {}", e))
}
