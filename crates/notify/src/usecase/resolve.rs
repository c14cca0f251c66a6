//! # 添付ファイル解決
//!
//! 宣言された添付ファイル・埋め込み画像をブロブストレージから取得し、
//! メッセージ構築に渡せるバイト列へ解決する。
//!
//! ## 設計方針
//!
//! - **宣言順の保持**: 添付は受信者に宣言された順序で提示される
//! - **fail-fast / all-or-nothing**: ひとつでも解決できなければ全体を失敗させ、
//!   部分的な添付でメールが送信されることはない
//! - **キャッシュなし**: 送信 1 回につきちょうど 1 回解決する

use lettre::message::header::ContentType;
use mailflow_domain::{
    MailError,
    mail::{Attachment, ResolvedAttachment},
    render::{RenderContext, VariableRenderer},
};
use mailflow_infra::BlobStorage;

/// 添付ファイルリゾルバ
///
/// 各参照の URI・表示名・MIME タイプを変数展開してから、
/// ストレージコラボレータで URI をデリファレンスする。
pub struct AttachmentResolver<'a> {
    renderer: &'a dyn VariableRenderer,
    storage:  &'a dyn BlobStorage,
}

impl<'a> AttachmentResolver<'a> {
    /// 新しいリゾルバを作成する
    pub fn new(renderer: &'a dyn VariableRenderer, storage: &'a dyn BlobStorage) -> Self {
        Self { renderer, storage }
    }

    /// 参照の列を宣言順に解決する
    ///
    /// いずれかの参照で失敗した場合、その時点で
    /// [`MailErrorKind::AttachmentResolution`](mailflow_domain::MailErrorKind::AttachmentResolution)
    /// を返し、以降の参照は解決しない。
    pub async fn resolve(
        &self,
        references: &[Attachment],
        context: &RenderContext,
    ) -> Result<Vec<ResolvedAttachment>, MailError> {
        let mut resolved = Vec::with_capacity(references.len());

        for reference in references {
            let uri = self.renderer.render(&reference.uri, context)?;
            let name = self.renderer.render(&reference.name, context)?;
            let content_type = self.renderer.render(&reference.content_type, context)?;

            // MIME タイプはメッセージ構築前にここで検証する
            // （構築段階では URI が失われており、エラーに添えられない）
            ContentType::parse(&content_type).map_err(|e| {
                MailError::attachment_resolution(
                    &uri,
                    format!("MIME タイプ {content_type} が不正: {e}"),
                )
            })?;

            let bytes = self.storage.open_stream(&uri).await?;

            resolved.push(ResolvedAttachment {
                name,
                content_type,
                bytes,
            });
        }

        Ok(resolved)
    }
}
