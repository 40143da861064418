// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

pub mod cache;
pub mod cli;
pub mod config;
pub mod converters;
pub mod dispatcher;
pub mod exception;
pub mod page;
pub mod param;
pub mod path;
pub mod registry;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod util;

pub use cache::{ContentCache, IncompatiblePolicy};
pub use cli::Cli;
pub use config::Config;
pub use dispatcher::{process_request, RequestDispatcher};
pub use exception::Exception;
pub use param::{HttpEncoding, HttpRequestMethod, HttpVersion};
pub use registry::{ConvertError, Converter, ConverterRegistry, PostProcessor};
pub use request::HttpRequest;
pub use response::Response;
pub use router::{Router, WikiRequest};
pub use util::HtmlBuilder;
