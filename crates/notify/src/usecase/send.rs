//! # メール送信ユースケース
//!
//! テンプレート展開 → 動的フィールド解決 → 添付解決 → メッセージ構築 →
//! SMTP 送信までのパイプライン全体を統合する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: 変数展開・ストレージ・トランスポートは trait で抽象化し、
//!   テスト時はモックに差し替える
//! - **1 回の送信のみ**: リトライ・キューイングは行わず、すべてのエラーを
//!   呼び出し元オーケストレータへ伝播する
//! - **ステートレス**: 呼び出し間で共有する可変状態を持たない。
//!   設定は呼び出しごとに渡される

use std::sync::Arc;

use mailflow_domain::{
    MailError,
    mail::{MailSendRequest, SmtpServer},
    render::{RenderContext, VariableRenderer},
};
use mailflow_infra::{BlobStorage, MailTransport, send_with_deadline};

use super::{
    AttachmentResolver,
    TemplateExpander,
    compose::{RenderedMail, compose},
};

/// メール送信タスク
///
/// ホストのタスク実行面から 1 回の送信ごとに [`run`](SendMail::run) が
/// 呼ばれる。成功時は何も返さず、失敗時は [`MailError`] を伝播する。
pub struct SendMail {
    renderer:  Arc<dyn VariableRenderer>,
    storage:   Arc<dyn BlobStorage>,
    transport: Arc<dyn MailTransport>,
    expander:  TemplateExpander,
}

impl SendMail {
    /// 新しい送信タスクを作成する
    pub fn new(
        renderer: Arc<dyn VariableRenderer>,
        storage: Arc<dyn BlobStorage>,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self, MailError> {
        Ok(Self {
            renderer,
            storage,
            transport,
            expander: TemplateExpander::new()?,
        })
    }

    /// メールを 1 通送信する
    ///
    /// どの段階で失敗しても部分的なメッセージは送信されず、
    /// 確立途中の SMTP セッションは呼び出しが返る前に解放される。
    pub async fn run(
        &self,
        request: &MailSendRequest,
        context: &RenderContext,
    ) -> Result<(), MailError> {
        tracing::debug!(to = %request.to, "メール送信を開始");

        // テンプレートが構成されていれば展開結果を本文テンプレートとして使う
        let body_template = match request.template_uri.as_deref() {
            Some(uri) => self
                .expander
                .expand(Some(uri), &request.template_variables)?,
            None => request.html_body.clone(),
        };

        // 動的フィールドの解決（サーバー情報・宛先・件名・本文すべて）
        let server = SmtpServer {
            host:               self.renderer.render(&request.host, context)?,
            port:               request.port,
            username:           self
                .renderer
                .render_opt(request.username.as_deref(), context)?,
            password:           self
                .renderer
                .render_opt(request.password.as_deref(), context)?,
            strategy:           request.transport_strategy,
            session_timeout_ms: request.session_timeout_ms,
        };
        let mail = RenderedMail {
            from:      self.renderer.render(&request.from, context)?,
            to:        self.renderer.render(&request.to, context)?,
            cc:        self.renderer.render_opt(request.cc.as_deref(), context)?,
            subject:   self.renderer.render(&request.subject, context)?,
            html_body: self.renderer.render(&body_template, context)?,
        };

        // 添付・埋め込み画像の解決（全件成功しなければ構築に進まない）
        let resolver = AttachmentResolver::new(self.renderer.as_ref(), self.storage.as_ref());
        let attachments = resolver.resolve(&request.attachments, context).await?;
        let embedded_images = resolver.resolve(&request.embedded_images, context).await?;

        let message = compose(&mail, attachments, embedded_images)?;

        send_with_deadline(self.transport.as_ref(), &server, message).await?;

        tracing::info!(to = %mail.to, subject = %mail.subject, "メール送信成功");
        Ok(())
    }
}
