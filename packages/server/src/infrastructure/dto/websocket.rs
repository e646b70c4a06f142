//! WebSocket message DTOs.

use serde::Deserialize;

/// Frame sent by a client: `{"message": "..."}`.
///
/// A missing `message` field is treated as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InboundFrame {
    #[serde(default)]
    pub message: String,
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_field() {
        // テスト項目: message フィールドが読み取られる
        // given (前提条件):
        let text = r#"{"message":"hi"}"#;

        // when (操作):
        let frame = InboundFrame::parse(text).unwrap();

        // then (期待する結果):
        assert_eq!(frame.message, "hi");
    }

    #[test]
    fn test_missing_message_is_empty_string() {
        // テスト項目: message フィールドがない場合は空文字列として扱われる
        // given (前提条件):
        let text = r#"{"other":1}"#;

        // when (操作):
        let frame = InboundFrame::parse(text).unwrap();

        // then (期待する結果):
        assert_eq!(frame.message, "");
    }

    #[test]
    fn test_non_json_is_rejected() {
        // テスト項目: JSON でないフレームはエラーになる
        // given (前提条件):
        let text = "plain text";

        // when (操作):
        let result = InboundFrame::parse(text);

        // then (期待する結果):
        assert!(result.is_err());
    }
}
