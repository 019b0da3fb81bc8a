//! # symbol-tx-cli
//!
//! - `synth`: CloudFormationテンプレートを合成する
//! - `invoke`: ハンドラをプロセス内で1回実行する（ローカルのテストイベント）
//! - `address`: 公開鍵または秘密鍵からアドレスを導出する

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "symbol-tx-cli")]
#[command(version)]
#[command(about = "Symbol Transaction API の開発用CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// スタックのテンプレートとマニフェストを書き出す
    Synth {
        /// 出力ディレクトリ
        #[arg(short, long, default_value = "cdk.out")]
        out: PathBuf,
    },

    /// 環境変数の設定でハンドラを1回実行し、レスポンスを表示する
    Invoke {
        /// プロキシイベントのJSONファイル（省略時はPOST /transactionを組み立てる）
        #[arg(short, long, conflicts_with = "message")]
        event: Option<PathBuf>,

        /// トランザクションに添付するメッセージ
        #[arg(short, long)]
        message: Option<String>,

        /// Idempotency-Keyヘッダ
        #[arg(long)]
        idempotency_key: Option<String>,
    },

    /// アドレスを導出する
    Address {
        /// 公開鍵（64文字のHex）
        #[arg(long, conflicts_with = "private_key", required_unless_present = "private_key")]
        public_key: Option<String>,

        /// 秘密鍵（64文字のHex）
        #[arg(long)]
        private_key: Option<String>,

        /// ネットワーク（testnet / mainnet）
        #[arg(short, long, default_value = "testnet")]
        network: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    symbol_tx_gateway::init_tracing(true);

    let cli = Cli::parse();
    match cli.command {
        Commands::Synth { out } => commands::synth(&out),
        Commands::Invoke {
            event,
            message,
            idempotency_key,
        } => commands::invoke(event.as_deref(), message, idempotency_key).await,
        Commands::Address {
            public_key,
            private_key,
            network,
        } => commands::address(public_key.as_deref(), private_key.as_deref(), &network),
    }
}
