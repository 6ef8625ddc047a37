use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use card_arcade_core::ServerMessage;

mod command;
mod render;

use command::{Command, HELP, parse_command};

#[derive(Parser, Debug)]
#[command(name = "card_arcade_client")]
#[command(about = "扑克小游戏的命令行客户端")]
struct Args {
    /// 服务器的 WebSocket 地址
    #[arg(long, default_value = "ws://127.0.0.1:25917/ws")]
    url: Url,
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    println!("正在连接到: {}", args.url);
    let (ws_stream, _) = connect_async(args.url.as_str())
        .await
        .with_context(|| format!("无法连接到 {}", args.url))?;
    println!("连接成功!");

    let (mut write, mut read) = ws_stream.split();

    // 启动一个任务来处理从服务器接收的消息
    tokio::spawn(async move {
        // 接牌快照每帧都会到达，摘要没变就不重复打印
        let mut last_line = String::new();
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(server_msg) => {
                        let line = render::summary(&server_msg);
                        if line != last_line {
                            println!("\n<-- {}", line);
                            prompt();
                            last_line = line;
                        }
                    }
                    Err(e) => eprintln!("解析服务器消息失败: {}", e),
                },
                Ok(_) => {}
                Err(e) => {
                    eprintln!("接收消息时出错: {}", e);
                    break;
                }
            }
        }
    });

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("--- 扑克小游戏客户端 ---");
    println!("{}", HELP);

    loop {
        prompt();

        let Some(line) = stdin.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            Ok(Command::Send(msg)) => {
                let payload = serde_json::to_string(&msg)?;
                write.send(Message::Text(payload.into())).await?;
            }
            Ok(Command::Help) => println!("{}", HELP),
            Ok(Command::Quit) => {
                println!("正在断开连接...");
                break;
            }
            Err(e) => println!("{:#}", e),
        }
    }

    Ok(())
}
