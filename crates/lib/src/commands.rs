//! Command replies: exact-match lookup over the configured reply texts.

use crate::config::Replies;

/// Reply text for a command keyword. Case-sensitive; only "start" is known,
/// everything else gets the unknown-command reply.
pub fn command_reply<'a>(name: &str, replies: &'a Replies) -> &'a str {
    match name {
        "start" => &replies.welcome,
        _ => &replies.unknown_command,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_gets_welcome() {
        let replies = Replies::default();
        assert_eq!(command_reply("start", &replies), replies.welcome);
    }

    #[test]
    fn unknown_keyword_gets_unknown_reply() {
        let replies = Replies::default();
        assert_eq!(command_reply("foo", &replies), replies.unknown_command);
        assert_eq!(command_reply("help", &replies), replies.unknown_command);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let replies = Replies::default();
        assert_eq!(command_reply("Start", &replies), replies.unknown_command);
        assert_eq!(command_reply("START", &replies), replies.unknown_command);
    }
}
