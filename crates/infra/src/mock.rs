//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリモック。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! mailflow-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use lettre::Message;
use mailflow_domain::{MailError, TransportStage, mail::SmtpServer};

use crate::{storage::BlobStorage, transport::MailTransport};

// ===== MockBlobStorage =====

/// テスト用のインメモリブロブストレージ
///
/// `insert` で登録した URI だけが解決でき、未登録 URI は
/// `AttachmentResolution` で失敗する。
#[derive(Clone, Default)]
pub struct MockBlobStorage {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    reads:   Arc<Mutex<Vec<String>>>,
}

impl MockBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// オブジェクトを登録する
    pub fn insert(&self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .unwrap()
            .insert(uri.into(), bytes.into());
    }

    /// これまでに読み込まれた URI を読み込み順で返す
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStorage for MockBlobStorage {
    async fn open_stream(&self, uri: &str) -> Result<Vec<u8>, MailError> {
        self.reads.lock().unwrap().push(uri.to_string());

        self.objects
            .lock()
            .unwrap()
            .get(uri)
            .cloned()
            .ok_or_else(|| MailError::attachment_resolution(uri, "オブジェクトが存在しません"))
    }
}

// ===== MockMailTransport =====

/// 送信されたメールの記録
#[derive(Debug, Clone)]
pub struct SentMail {
    pub from:    String,
    pub to:      String,
    pub cc:      Option<String>,
    pub subject: String,
    /// フォーマット済みメッセージ全体（ヘッダ + 全パート）
    pub raw:     String,
}

/// 開いているセッション数を Drop で戻すガード
///
/// タイムアウトで送信 future が drop された場合もカウントが戻ることを
/// 保証する（リークしたセッションの検出に使う）。
struct SessionGuard(Arc<AtomicUsize>);

impl SessionGuard {
    fn open(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// テスト用のモックメールトランスポート
///
/// 送信されたメッセージを記録する。`with_delay` で送信に遅延を注入し、
/// `fail_with` で次回以降の送信を失敗させられる。
#[derive(Clone, Default)]
pub struct MockMailTransport {
    sent:          Arc<Mutex<Vec<SentMail>>>,
    open_sessions: Arc<AtomicUsize>,
    fail_with:     Arc<Mutex<Option<(TransportStage, String)>>>,
    delay:         Option<Duration>,
}

impl MockMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 送信処理に遅延を注入する（タイムアウトのテスト用）
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 以降の送信を指定の段階・理由で失敗させる
    pub fn fail_with(&self, stage: TransportStage, cause: impl Into<String>) {
        *self.fail_with.lock().unwrap() = Some((stage, cause.into()));
    }

    /// 送信されたメールを送信順で返す
    pub fn sent_mails(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    /// 現在開いているセッション数を返す
    ///
    /// すべての送信が完了または中断された後は 0 であること
    /// （0 以外はセッションリーク）。
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }
}

fn header(message: &Message, name: &str) -> Option<String> {
    message.headers().get_raw(name).map(ToString::to_string)
}

#[async_trait]
impl MailTransport for MockMailTransport {
    async fn submit(&self, _server: &SmtpServer, message: Message) -> Result<(), MailError> {
        let _session = SessionGuard::open(&self.open_sessions);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some((stage, cause)) = self.fail_with.lock().unwrap().clone() {
            return Err(MailError::transport(stage, cause));
        }

        self.sent.lock().unwrap().push(SentMail {
            from:    header(&message, "From").unwrap_or_default(),
            to:      header(&message, "To").unwrap_or_default(),
            cc:      header(&message, "Cc"),
            subject: header(&message, "Subject").unwrap_or_default(),
            raw:     String::from_utf8_lossy(&message.formatted()).into_owned(),
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn 未登録uriはattachment_resolutionで失敗する() {
        let storage = MockBlobStorage::new();
        storage.insert("s3://bucket/a.pdf", b"data".to_vec());

        assert!(storage.open_stream("s3://bucket/a.pdf").await.is_ok());
        assert!(storage.open_stream("s3://bucket/missing.pdf").await.is_err());
        assert_eq!(
            storage.reads(),
            vec!["s3://bucket/a.pdf", "s3://bucket/missing.pdf"]
        );
    }
}
