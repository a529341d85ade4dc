//! 浏览器层
//!
//! - `connection`：连接已登录的浏览器（远程调试端口）
//! - `headless`：自行启动无头浏览器
//! - `page_driver`：`FormDriver` 的页面实现

pub mod connection;
pub mod headless;
pub mod page_driver;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_headless_browser;
pub use page_driver::PageFormDriver;
