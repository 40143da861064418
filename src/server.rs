// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 监听器与管线之间的交接：每个连接只处理一个请求，写回响应后关闭。

use std::sync::Arc;

use log::{debug, error};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    task,
};

use crate::{
    dispatcher::{error_response, process_request, RequestDispatcher},
    page::RenderContext,
    param::REQUEST_BUFFER_SIZE,
    request::HttpRequest,
    response::Response,
    router::Router,
};

/// 读取请求、在阻塞线程池中路由并分派、写回响应。任何失败都只影响这一个连接。
pub async fn handle_connection(
    mut stream: TcpStream,
    id: u128,
    router: Arc<Router>,
    dispatcher: Arc<RequestDispatcher>,
) {
    let mut buffer = vec![0; REQUEST_BUFFER_SIZE];
    let length = match stream.read(&mut buffer).await {
        Ok(0) => return,
        Ok(length) => length,
        Err(e) => {
            error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
            return;
        }
    };
    debug!("[ID{}]HTTP请求接收完毕", id);

    let response = match HttpRequest::try_from(&buffer[..length], id) {
        Ok(request) => {
            match task::spawn_blocking(move || process_request(&request, &router, &dispatcher, id))
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    error!("[ID{}]处理请求的任务崩溃：{}", id, e);
                    Response::from_status_code(500, &[], id, false)
                }
            }
        }
        Err(e) => {
            let ctx = RenderContext {
                accept_encoding: &[],
                id,
                headonly: false,
            };
            error_response(&e, "", &ctx)
        }
    };

    if let Err(e) = stream.write_all(&response.as_bytes()).await {
        error!("[ID{}]发送响应失败: {}", id, e);
        return;
    }
    let _ = stream.flush().await;
}
