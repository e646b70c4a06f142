//! Entities
//!
//! チャットメッセージのエンティティ。シリアライズ形式がそのまま
//! WebSocket の送信フレーム、および履歴ストアの保存形式になります。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_object::{UserId, Username};

/// メッセージの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// 入室・退室などのシステム通知
    System,
    /// ユーザーが送信したメッセージ
    Message,
}

/// チャットメッセージ
///
/// 生成後は不変。`timestamp` は生成時（= 発行時）の UTC 時刻で、
/// 順序の確認・監査用であり重複排除には使わない。
///
/// ## JSON 形式
///
/// ```json
/// {"type":"message","user_id":"u-1","username":"alice","text":"hi","timestamp":"2024-01-01T00:00:00Z"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "type")]
    kind: MessageKind,
    user_id: Option<UserId>,
    username: Option<Username>,
    text: String,
    timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// システム通知メッセージを作成
    pub fn system(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: MessageKind::System,
            user_id: None,
            username: None,
            text: text.into(),
            timestamp,
        }
    }

    /// ユーザーメッセージを作成
    pub fn from_user(
        user_id: UserId,
        username: Username,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: MessageKind::Message,
            user_id: Some(user_id),
            username: Some(username),
            text: text.into(),
            timestamp,
        }
    }

    /// 入室通知
    pub fn joined(username: &Username, timestamp: DateTime<Utc>) -> Self {
        Self::system(format!("{} joined the chat", username), timestamp)
    }

    /// 退室通知
    pub fn left(username: &Username, timestamp: DateTime<Utc>) -> Self {
        Self::system(format!("{} left the chat", username), timestamp)
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn username(&self) -> Option<&Username> {
        self.username.as_ref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// 送信・保存用の JSON 文字列に変換
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
