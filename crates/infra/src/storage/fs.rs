//! ローカルファイルシステム実装
//!
//! 開発・テスト環境向けに、`file://` URI またはプレーンなパスを
//! ローカルディスクから読み込む。

use async_trait::async_trait;
use mailflow_domain::MailError;

use super::BlobStorage;

/// ローカルファイルシステムのブロブストレージ
#[derive(Debug, Clone, Copy, Default)]
pub struct FsBlobStorage;

impl FsBlobStorage {
    /// 新しいインスタンスを作成する
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BlobStorage for FsBlobStorage {
    async fn open_stream(&self, uri: &str) -> Result<Vec<u8>, MailError> {
        let path = uri.strip_prefix("file://").unwrap_or(uri);

        tokio::fs::read(path)
            .await
            .map_err(|e| MailError::attachment_resolution(uri, format!("読み込みに失敗: {e}")))
    }
}
