use reqwest::Method;

use super::{send_json, SupportApi};
use crate::error::ApiResult;
use crate::models::Analytics;

impl SupportApi {
    pub async fn analytics(&self) -> ApiResult<Analytics> {
        send_json(self.authed(Method::GET, "/admin/student/analytics")?).await
    }
}

impl Analytics {
    /// Mean response time over the recent conversations that report one.
    pub fn average_response_ms(&self) -> Option<u64> {
        let times: Vec<u64> = self
            .recent_conversations
            .iter()
            .filter_map(|c| c.response_time_ms)
            .collect();
        if times.is_empty() {
            None
        } else {
            Some(times.iter().sum::<u64>() / times.len() as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{Analytics, RecentConversation};

    #[test]
    fn test_average_response_skips_missing() {
        let conv = |ms: Option<u64>| RecentConversation {
            question: "When is enrollment?".to_string(),
            response_time_ms: ms,
            created_at: "2024-06-01T10:00:00+00:00".to_string(),
        };
        let analytics = Analytics {
            total_conversations: 3,
            recent_conversations: vec![conv(Some(1200)), conv(None), conv(Some(800))],
        };
        assert_eq!(analytics.average_response_ms(), Some(1000));

        let empty = Analytics { total_conversations: 0, recent_conversations: vec![] };
        assert_eq!(empty.average_response_ms(), None);
    }
}
