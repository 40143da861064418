// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # wikiserver
//!
//! 基于 Tokio 运行时的 wiki 服务器：把一个目录树中的各种源文件渲染为 HTML 页面。
//!
//! 启动顺序：日志 → 配置 → 转换器注册表 → 打开缓存（载入并清理）→ 预加载 → 绑定端口 → 接受连接。
//! 路由与转换可能阻塞在磁盘或外部进程上，因此在阻塞线程池中执行。
//! 使用 `--restart` 启动时，严重错误后等待 5 秒重新走一遍上述流程。

use std::{
    process,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use clap::Parser;

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::TcpListener,
    runtime::Builder,
    sync::watch,
    task,
};

use wikiserver::{
    cache::{ContentCache, IncompatiblePolicy},
    cli::{Cli, RESTART_DELAY},
    config::Config,
    converters,
    dispatcher::RequestDispatcher,
    exception::Exception,
    router::Router,
    server::handle_connection,
};

/// 控制台在阻塞线程中等待标准输入，关闭运行时时不再等它
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

fn main() {
    let cli = Cli::parse();
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法初始化日志系统：{}", e);
        process::exit(1);
    }

    loop {
        info!("正在启动wikiserver...");
        let Err(e) = run(&cli) else {
            return;
        };
        error!("服务器异常退出：{}", e);
        if cli.debug {
            eprintln!("{:#?}", e);
        }
        if !cli.restart_on_failure() {
            process::exit(1);
        }
        info!("{}秒后重启...", RESTART_DELAY.as_secs());
        thread::sleep(RESTART_DELAY);
    }
}

fn run(cli: &Cli) -> Result<(), Exception> {
    let config = Config::load(&cli.config, cli.interface.as_deref(), cli.port)?;
    info!("wiki root: {}", config.wiki_root().display());
    info!("resources root: {}", config.resources_root().display());

    let runtime = Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()?;
    info!("Tokio运行时已启动，工作线程数：{}", config.worker_threads());
    let result = runtime.block_on(serve(config));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}

async fn serve(config: Config) -> Result<(), Exception> {
    let registry = Arc::new(converters::builtin_registry(&config));
    let policy = match config.discard_incompatible_cache() {
        true => IncompatiblePolicy::Discard,
        false => IncompatiblePolicy::Fail,
    };
    let cache = Arc::new(ContentCache::open(
        config.cache_file(),
        config.wiki_root(),
        registry,
        policy,
    )?);
    info!("缓存已打开，共{}个条目", cache.len());

    // 预加载必须在开始接受连接之前完成
    if config.preload() {
        let preload_cache = Arc::clone(&cache);
        let preloaded = task::spawn_blocking(move || preload_cache.preload())
            .await
            .map_err(|e| Exception::Io(e.to_string()))??;
        info!("预加载完成，新增{}个页面", preloaded);
    }

    let router = Arc::new(Router::new(config.wiki_root(), config.resources_root()));
    let dispatcher = Arc::new(RequestDispatcher::new(Arc::clone(&cache), config.title()));

    let address = format!("{}:{}", config.interface(), config.port());
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定地址：{}，错误：{}", address, e);
            return Err(e.into());
        }
    };
    info!("服务端在{}上监听Socket连接", address);

    let shutdown = Arc::new(watch::channel(false).0);
    let mut shutdown_rx = shutdown.subscribe();
    let active_connection = Arc::new(AtomicUsize::new(0));

    tokio::spawn(console(
        Arc::clone(&shutdown),
        Arc::clone(&active_connection),
        Arc::clone(&cache),
    ));

    let mut id: u128 = 0;
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                info!("主循环接收到停机指令，正在退出...");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("接收到Ctrl-C，正在退出...");
                break;
            }
            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("接受连接失败：{}", e);
                        continue;
                    }
                };
                debug!("[ID{}]TCP连接已建立：{}", id, addr);

                let router = Arc::clone(&router);
                let dispatcher = Arc::clone(&dispatcher);
                let active_connection = Arc::clone(&active_connection);
                tokio::spawn(async move {
                    active_connection.fetch_add(1, Ordering::SeqCst);
                    handle_connection(stream, id, router, dispatcher).await;
                    active_connection.fetch_sub(1, Ordering::SeqCst);
                });
                id += 1;
            }
        }
    }

    let flush_cache = Arc::clone(&cache);
    task::spawn_blocking(move || flush_cache.save())
        .await
        .map_err(|e| Exception::Io(e.to_string()))??;
    info!("缓存已写入{}，服务器已停止", config.cache_file().display());
    Ok(())
}

/// 标准输入上的管理控制台
async fn console(
    shutdown: Arc<watch::Sender<bool>>,
    active_connection: Arc<AtomicUsize>,
    cache: Arc<ContentCache>,
) {
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut input = String::new();
    loop {
        input.clear();
        match reader.read_line(&mut input).await {
            Ok(0) | Err(_) => {
                debug!("标准输入已关闭，控制台退出");
                break;
            }
            Ok(_) => {}
        }
        match input.trim() {
            "stop" => {
                let _ = shutdown.send(true);
                println!("停机指令已激活，服务器将写入缓存并关闭...");
                break;
            }
            "help" => {
                println!("== wikiserver Help ==");
                println!("stop   - 写入缓存并停机");
                println!("status - 查看当前服务器运行状态");
                println!("help   - 显示此帮助信息");
                println!("=====================");
            }
            "status" => {
                println!("== wikiserver 状态 ==");
                println!("当前活跃连接数: {}", active_connection.load(Ordering::SeqCst));
                println!("缓存条目数: {}", cache.len());
                println!("=====================");
            }
            "" => {}
            cmd => println!("无效的命令：{}", cmd),
        }
    }
}
