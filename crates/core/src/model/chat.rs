use serde::{Deserialize, Serialize};

/// Message count for one chat session, as reported by the chat service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSessionStat {
    pub session_id: String,
    #[serde(default)]
    pub message_count: u32,
}

/// Chat usage rolled up for the analytics view.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ChatActivity {
    pub total_sessions: u32,
    pub avg_messages_per_session: f64,
}

impl ChatActivity {
    /// Average messages per session, rounded to one decimal; zero without sessions.
    #[must_use]
    pub fn from_sessions(sessions: &[ChatSessionStat]) -> Self {
        let total_sessions = u32::try_from(sessions.len()).unwrap_or(u32::MAX);
        if total_sessions == 0 {
            return Self::default();
        }
        let messages: u64 = sessions.iter().map(|s| u64::from(s.message_count)).sum();
        #[allow(clippy::cast_precision_loss)]
        let avg = messages as f64 / f64::from(total_sessions);
        Self {
            total_sessions,
            avg_messages_per_session: (avg * 10.0).round() / 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str, messages: u32) -> ChatSessionStat {
        ChatSessionStat {
            session_id: id.to_string(),
            message_count: messages,
        }
    }

    #[test]
    fn no_sessions_means_zero_average() {
        let activity = ChatActivity::from_sessions(&[]);
        assert_eq!(activity.total_sessions, 0);
        assert_eq!(activity.avg_messages_per_session, 0.0);
    }

    #[test]
    fn average_is_rounded_to_one_decimal() {
        let activity =
            ChatActivity::from_sessions(&[session("a", 4), session("b", 3), session("c", 3)]);
        assert_eq!(activity.total_sessions, 3);
        assert_eq!(activity.avg_messages_per_session, 3.3);
    }
}
