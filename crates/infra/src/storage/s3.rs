//! S3 ブロブストレージ実装
//!
//! Amazon S3 / MinIO 上のオブジェクトを `s3://bucket/key` 形式の URI で取得する。
//! ローカル開発では MinIO を使用する（`create_client` の endpoint 指定）。

use async_trait::async_trait;
use aws_sdk_s3::Client;
use mailflow_domain::MailError;

use super::BlobStorage;

/// S3 ブロブストレージ
///
/// `aws-sdk-s3` を使用した [`BlobStorage`] の実装。MinIO とも互換動作する。
pub struct S3BlobStorage {
    client: Client,
}

impl S3BlobStorage {
    /// 新しい S3 ストレージインスタンスを作成する
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// `s3://bucket/key` 形式の URI をバケット名とオブジェクトキーに分解する
fn parse_s3_uri(uri: &str) -> Result<(&str, &str), MailError> {
    let rest = uri.strip_prefix("s3://").ok_or_else(|| {
        MailError::attachment_resolution(uri, "s3://bucket/key 形式の URI ではありません")
    })?;

    match rest.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok((bucket, key)),
        _ => Err(MailError::attachment_resolution(
            uri,
            "バケット名またはオブジェクトキーが空です",
        )),
    }
}

#[async_trait]
impl BlobStorage for S3BlobStorage {
    async fn open_stream(&self, uri: &str) -> Result<Vec<u8>, MailError> {
        let (bucket, key) = parse_s3_uri(uri)?;

        let object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                MailError::attachment_resolution(uri, format!("GET Object の実行に失敗: {e}"))
            })?;

        let data = object.body.collect().await.map_err(|e| {
            MailError::attachment_resolution(uri, format!("ボディの読み込みに失敗: {e}"))
        })?;

        Ok(data.into_bytes().to_vec())
    }
}

/// S3 クライアントを作成する
///
/// `endpoint` が `Some` の場合は MinIO 等のカスタムエンドポイントに接続する。
/// `None` の場合は AWS S3 のデフォルトエンドポイントを使用する。
/// 認証情報は SDK のデフォルト認証チェーンで解決する
/// （ローカル: 環境変数、本番: IAM ロール）。
pub async fn create_client(endpoint: Option<&str>) -> Client {
    let mut config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new("ap-northeast-1"));

    if let Some(endpoint_url) = endpoint {
        config_builder = config_builder.endpoint_url(endpoint_url);
    }

    let config = config_builder.load().await;

    // MinIO はパススタイルが必要（バーチャルホスト型 URL を使わない）
    let s3_config_builder = aws_sdk_s3::config::Builder::from(&config);
    let s3_config = if endpoint.is_some() {
        s3_config_builder.force_path_style(true).build()
    } else {
        s3_config_builder.build()
    };

    Client::from_conf(s3_config)
}
