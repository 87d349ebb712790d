use clap::{Parser, Subcommand};
use std::process::ExitCode;

use random_api::config::{StaticConfig, get_config, init_config_from};
use random_api::runtime::modes::run_server;
use random_api::system::init_logging;

#[derive(Parser, Debug)]
#[command(name = "random-api", version, about = "Random resource redirection service")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 启动 HTTP 服务（默认）
    Serve,
    /// 输出示例配置
    GenerateConfig {
        /// 写入文件而不是标准输出
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::GenerateConfig { output } => generate_config(output.as_deref()),
        Command::Serve => serve(&cli.config),
    }
}

fn generate_config(output: Option<&str>) -> ExitCode {
    match output {
        Some(path) => match StaticConfig::default().save_to_file(path) {
            Ok(()) => {
                println!("Sample configuration written to {}", path);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to write {}: {}", path, e);
                ExitCode::FAILURE
            }
        },
        None => {
            println!("{}", StaticConfig::generate_sample_config());
            ExitCode::SUCCESS
        }
    }
}

fn serve(config_path: &str) -> ExitCode {
    init_config_from(config_path);
    let config = get_config();

    // guard 必须活到进程结束
    let _log_guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = actix_web::rt::System::new().block_on(run_server());
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Server exited with error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
