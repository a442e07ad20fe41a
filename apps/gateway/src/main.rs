//! # Mailgate ゲートウェイサーバー
//!
//! 権限ツリーで宛先を絞り込んでからメール送信プロバイダへ転送する
//! メール送信ファサード。
//!
//! ## アーキテクチャ
//!
//! ```text
//! ┌──────────┐     ┌──────────────┐     ┌────────────────────┐
//! │  Client  │────▶│   Gateway    │────▶│ Mailgun 互換 API   │
//! └──────────┘     │ port: 14000  │     └────────────────────┘
//!                  └──────────────┘
//!                     │        │
//!                     ▼        ▼
//!          ┌──────────────┐  ┌──────────────┐
//!          │ 権限ツリー   │  │ 検索バック   │
//!          │ (HTTP/File)  │  │ エンド       │
//!          └──────────────┘  └──────────────┘
//! ```
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `GATEWAY_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `GATEWAY_PORT` | No | ポート番号（デフォルト: `14000`） |
//! | `MAILGUN_API_BASE` | No | プロバイダのベース URL |
//! | `MAILGUN_DOMAIN` | **Yes** | 送信ドメイン |
//! | `MAILGUN_API_KEY` | **Yes** | プロバイダの API キー |
//! | `PERMISSION_TREE_URL` / `PERMISSION_TREE_FILE` | **どちらか一方** | 権限ツリーの取得元 |
//! | `SEARCH_URL` | No | 検索バックエンド（未設定なら Noop） |
//! | `SEARCH_INDEX_NAME` | `SEARCH_URL` 設定時 | インデックス名 |
//! | `SEARCH_API_KEY` | No | 検索バックエンドの Bearer トークン |
//! | `UPLOAD_DIR` | No | 添付ファイルのステージング先 |
//! | `HTTP_TIMEOUT_SECS` | No | 外部 HTTP 呼び出しのタイムアウト（デフォルト: 30） |
//! | `LOG_FORMAT` | No | `json` / `pretty` |
//!
//! ## 起動方法
//!
//! ```bash
//! cargo run -p mailgate-gateway
//! ```

use std::net::SocketAddr;

use anyhow::Context as _;
use mailgate_gateway::{
    app_builder::{build_app, build_state},
    config::GatewayConfig,
};
use mailgate_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

/// ゲートウェイのエントリーポイント
///
/// 1. 環境変数の読み込み（.env ファイル）
/// 2. トレーシングの初期化
/// 3. 設定の読み込みと検証（失敗時は起動を中止）
/// 4. 外部サービス実装とルーターの構築
/// 5. HTTP サーバーの起動
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(TracingConfig::from_env("gateway"));
    let _tracing_guard = tracing::info_span!("app", service = "gateway").entered();

    let config = GatewayConfig::from_env().context("設定の読み込みに失敗しました")?;
    tracing::debug!(?config, "設定を読み込みました");

    let state = build_state(&config).context("外部サービスクライアントの初期化に失敗しました")?;
    let app = build_app(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("アドレスのパースに失敗しました")?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("ゲートウェイが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
