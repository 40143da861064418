// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求分派与请求边界
//!
//! [`RequestDispatcher`] 把 [`WikiRequest`] 交给对应的页面；[`process_request`] 是单个请求的
//! 错误边界，所有异常在这里转换为状态码页面，不会影响监听循环或其他请求。

use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};

use crate::{
    cache::ContentCache,
    exception::Exception,
    page::{FilePage, Page, RenderContext, SearchPage, SectionPage},
    request::HttpRequest,
    response::Response,
    router::{Router, WikiRequest},
};

pub struct RequestDispatcher {
    cache: Arc<ContentCache>,
    site_title: String,
}

impl RequestDispatcher {
    pub fn new(cache: Arc<ContentCache>, site_title: &str) -> Self {
        Self {
            cache,
            site_title: site_title.to_string(),
        }
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn dispatch(
        &self,
        request: &WikiRequest,
        ctx: &RenderContext,
    ) -> Result<Response, Exception> {
        debug!("[ID{}]分派{}请求", ctx.id, request.kind());
        match request {
            WikiRequest::Redirect { target_url } => Ok(Response::redirect(target_url)),
            WikiRequest::Resource { path, .. } => {
                Response::from_file(path, ctx.accept_encoding, ctx.id, ctx.headonly)
            }
            WikiRequest::Search { query, root } => SearchPage {
                query,
                root,
                cache: &self.cache,
                site_title: &self.site_title,
            }
            .render(ctx),
            WikiRequest::Page { path, root } => FilePage {
                path,
                root,
                cache: &self.cache,
                site_title: &self.site_title,
            }
            .render(ctx),
            WikiRequest::Section { path, root } => SectionPage {
                path,
                root,
                site_title: &self.site_title,
            }
            .render(ctx),
        }
    }
}

/// 路由并分派一个已解析的请求。任何错误都在这里转为状态码页面：
/// 路径越界为 400，找不到为 404，其余为 500。
pub fn process_request(
    request: &HttpRequest,
    router: &Router,
    dispatcher: &RequestDispatcher,
    id: u128,
) -> Response {
    let start_time = Instant::now();
    let ctx = RenderContext {
        accept_encoding: request.accept_encoding(),
        id,
        headonly: request.is_head(),
    };

    let result = router.route(request.path()).and_then(|routed| match routed {
        Some(wiki_request) => dispatcher.dispatch(&wiki_request, &ctx),
        None => Err(Exception::FileNotFound),
    });

    let response = match result {
        Ok(response) => response,
        Err(e) => error_response(&e, request.path(), &ctx),
    };

    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );
    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}",
        id,
        request.version(),
        request.path(),
        request.method(),
        response.status_code(),
        response.information(),
        request.user_agent(),
    );
    response
}

/// 将异常转换为状态码页面，并按异常类别选择日志级别。
pub fn error_response(e: &Exception, path: &str, ctx: &RenderContext) -> Response {
    let code = e.status_code();
    match code {
        404 => warn!("[ID{}]请求的路径：{} 不存在，返回404", ctx.id, path),
        400 => warn!("[ID{}]请求的路径：{} 不合法：{}，返回400", ctx.id, path, e),
        _ => error!("[ID{}]处理请求{}时发生异常：{}，返回{}", ctx.id, path, e, code),
    }
    Response::from_status_code(code, ctx.accept_encoding, ctx.id, ctx.headonly)
}
