//! Reply texts posted back to the channel.
//!
//! Slack renders triple backticks as a fixed-width block, so usage errors and
//! kubectl output are wrapped in them.

/// Slack rejects very long `text` payloads; keep command output well under.
pub const MAX_OUTPUT_CHARS: usize = 3500;

pub fn cmd_response(output: &str) -> String {
    format!(
        "This is the response to your request:\n```\n{}\n``` ",
        truncate(output, MAX_OUTPUT_CHARS)
    )
}

pub fn app_not_found(app: &str) -> String {
    format!("Sorry, app {app} could not be found")
}

pub fn invalid_deploy_syntax(args: &[String]) -> String {
    format!(
        "Deploy command requires 3 parameters: \
         ```!deploy your_app your_container your/docker:image``` \nGot: ```!deploy {}```",
        args.join(" ")
    )
}

pub fn invalid_image_format(image: &str) -> String {
    format!("```Invalid image format, should be your_dockerhub_repo:tag``` \nGot: ```{image}```")
}

pub fn invalid_image(repo: &str, tag: &str) -> String {
    format!("```Invalid image, tag {tag} does not exist in dockerhub repo {repo}```")
}

pub fn invalid_reset_syntax(args: &[String]) -> String {
    format!(
        "Reset command requires 1 parameter: ```!reset your_app``` \nGot: ```!reset {}```",
        args.join(" ")
    )
}

pub fn cluster_name_notice(command: &str, cluster: &str, args: &[String]) -> String {
    format!(
        "You must specify cluster name in order to use the command:\n ```{command} {cluster} {}\n```",
        args.join(" ")
    )
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
fn truncate(text: &str, max_chars: usize) -> std::borrow::Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        None => text.into(),
        Some((idx, _)) => format!("{}\n... (truncated)", &text[..idx]).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmd_response_wraps_output_in_code_block() {
        assert_eq!(
            cmd_response("deployment.apps/myapp image updated"),
            "This is the response to your request:\n```\ndeployment.apps/myapp image updated\n``` "
        );
    }

    #[test]
    fn usage_messages_echo_arguments() {
        let args = vec!["a".to_string(), "b".to_string()];
        assert!(invalid_deploy_syntax(&args).ends_with("Got: ```!deploy a b```"));
        assert!(invalid_reset_syntax(&args).ends_with("Got: ```!reset a b```"));
        assert_eq!(
            cluster_name_notice("deploy", "prodnet", &args),
            "You must specify cluster name in order to use the command:\n ```deploy prodnet a b\n```"
        );
    }

    #[test]
    fn long_output_is_truncated() {
        let long = "x".repeat(MAX_OUTPUT_CHARS + 10);
        let reply = cmd_response(&long);
        assert!(reply.contains("... (truncated)"));
        assert!(reply.len() < long.len() + 100);

        let short = "x".repeat(MAX_OUTPUT_CHARS);
        assert!(!cmd_response(&short).contains("truncated"));
    }
}
