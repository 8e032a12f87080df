//! HTTP服务器模块 - 提供脚本渲染API、生成文件下载和前端静态资源

pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;
pub mod validation;

pub use models::*;
pub use server::*;
pub use state::*;
