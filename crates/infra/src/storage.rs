//! # ブロブストレージ接続
//!
//! 添付ファイル・埋め込み画像の URI をバイト列にデリファレンスする。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: [`BlobStorage`] トレイトでストレージを抽象化し、
//!   テスト時はモックに差し替える
//! - **全読み込み**: ストリームは全量をメモリに読み込む。添付ファイルは
//!   メールに同梱できるサイズである前提
//! - **失敗の表現**: 取得失敗はすべて
//!   [`MailErrorKind::AttachmentResolution`](mailflow_domain::MailErrorKind::AttachmentResolution)
//!   として呼び出し元（AttachmentResolver）に伝播する

mod fs;
mod s3;

use async_trait::async_trait;
pub use fs::FsBlobStorage;
use mailflow_domain::MailError;
pub use s3::{S3BlobStorage, create_client};

/// ブロブストレージのインターフェース
///
/// 不透明な URI からバイト列を取得する。実体はローカルディスク、
/// オブジェクトストレージなど。
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// URI が指すオブジェクトを全量読み込んで返す
    ///
    /// # 引数
    ///
    /// * `uri` - ストレージ URI（例: `s3://bucket/key`、`file:///tmp/a.pdf`）
    async fn open_stream(&self, uri: &str) -> Result<Vec<u8>, MailError>;
}
