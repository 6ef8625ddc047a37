use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use clap::Parser;
use futures_util::{SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use card_arcade_core::{ClientMessage, GameConfig, ServerMessage};

mod session;
mod store;

use session::Session;
use store::JsonFileStore;

#[derive(Parser, Debug)]
#[command(name = "card_arcade_server")]
#[command(about = "扑克小游戏服务器：接牌与牌型训练")]
struct Args {
    /// 监听地址
    #[arg(long, default_value = "0.0.0.0:25917")]
    bind: SocketAddr,

    /// 统计档案文件
    #[arg(long, default_value = "card_arcade_stats.json")]
    stats_file: PathBuf,

    /// 游戏参数 (JSON)，缺省时使用内置默认值
    #[arg(long)]
    config: Option<PathBuf>,
}

// 服务器全局状态：所有连接共享同一份配置和统计档案
struct AppState {
    config: GameConfig,
    store: Arc<JsonFileStore>,
}

type SharedState = Arc<AppState>;

fn load_config(path: Option<&Path>) -> Result<GameConfig> {
    let Some(path) = path else {
        return Ok(GameConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("读取配置文件 {} 失败", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("解析配置文件 {} 失败", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let store = Arc::new(JsonFileStore::open(&args.stats_file)?);
    info!("统计档案: {}", store.path().display());

    let state = SharedState::new(AppState { config, store });

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("无法监听 {}", args.bind))?;
    info!("服务器正在监听 {}", args.bind);
    axum::serve(listener, app).await.context("服务器异常退出")?;
    Ok(())
}

/// 处理 WebSocket 连接请求
async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// 处理单个 WebSocket 连接的生命周期
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();

    // 引擎和后台任务都往这个通道里写，由下面的任务统一发给客户端
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let payload = match serde_json::to_string(&msg) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("序列化消息失败: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                // 发送失败，说明客户端已断开，退出任务
                break;
            }
        }
    });

    let mut session = Session::new(state.config.clone(), state.store.clone(), tx.clone());
    info!("客户端连接 {}", session.id());

    // 主循环，处理从客户端接收到的消息
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => session.handle(client_msg),
                Err(e) => {
                    warn!("解析消息失败: {}", e);
                    let _ = tx.send(ServerMessage::Error { message: format!("无法解析的消息: {}", e) });
                }
            }
        }
    }

    // 客户端断开：丢弃会话会停止它的后台任务，未结束的一局不计入统计
    let id = session.id();
    drop(session);
    drop(tx);
    writer.abort();
    info!("客户端连接 {} 关闭", id);
}
