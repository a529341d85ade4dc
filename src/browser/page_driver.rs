//! 申报页面驱动 - 浏览器层
//!
//! `FormDriver` 的 chromiumoxide 实现。页面是 ASP.NET WebForms：
//! 每次切换下拉框都会回发，回发完成前旧的 DOM 仍然可见，
//! 所以切换前先给依赖元素打上 `data-stale` 标记，等新元素出现再继续。

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::{
    DialogType, EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::infrastructure::{ConsumedDays, DriverError, DriverResult, FormDriver, JsExecutor};
use crate::models::DateRange;

// 页面上的元素 id，新旧两个版本的页面都要兼容
const PANCHAYAT_IDS: [&str; 2] = [
    "ctl00_ContentPlaceHolder1_DDL_panchayat",
    "ctl00_ContentPlaceHolder1_ddlPanchayat",
];
const VILLAGE_IDS: [&str; 2] = [
    "ctl00_ContentPlaceHolder1_DDL_Village",
    "ctl00_ContentPlaceHolder1_ddlvillage",
];
const JOBCARD_IDS: [&str; 2] = [
    "ctl00_ContentPlaceHolder1_DDL_Registration",
    "ctl00_ContentPlaceHolder1_ddlJobcard",
];
const GRID_IDS: [&str; 2] = [
    "ctl00_ContentPlaceHolder1_gvData",
    "ctl00_ContentPlaceHolder1_GridView1",
];
const SUBMIT_IDS: [&str; 2] = [
    "ctl00_ContentPlaceHolder1_btnProceed",
    "ctl00_ContentPlaceHolder1_btnSave",
];
const CONSUMED_DAYS_IDS: [&str; 2] = [
    "ctl00_ContentPlaceHolder1_lbldays",
    "ctl00_ContentPlaceHolder1_lblDaysDemanded",
];
const MESSAGE_LABEL_ID: &str = "ctl00_ContentPlaceHolder1_lblmsg";

/// 回发轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(300);

/// 页面脚本的统一返回
#[derive(Debug, Deserialize)]
struct ScriptStatus {
    status: String,
    #[serde(default)]
    text: Option<String>,
}

/// 申报页面驱动
pub struct PageFormDriver {
    executor: JsExecutor,
    entry_url: String,
    panchayat: Option<String>,
    /// 单次等待回发的上限
    postback_wait: Duration,
    /// 提交后等待响应的上限
    response_wait: Duration,
}

impl PageFormDriver {
    pub fn new(
        executor: JsExecutor,
        entry_url: impl Into<String>,
        panchayat: Option<String>,
        postback_wait: Duration,
        response_wait: Duration,
    ) -> Self {
        Self {
            executor,
            entry_url: entry_url.into(),
            panchayat,
            postback_wait,
            response_wait,
        }
    }

    // ========== 脚本辅助 ==========

    async fn run_script(&self, operation: &str, js_code: String) -> DriverResult<ScriptStatus> {
        self.executor
            .eval_as::<ScriptStatus>(js_code)
            .await
            .map_err(|e| script_error(operation, &e))
    }

    /// 在下拉框中选择第一个匹配的选项并触发回发
    ///
    /// `matcher` 是一段 JS 表达式，可以使用 `opt`（option 元素）和 `target`。
    async fn select_option(
        &self,
        operation: &str,
        select_ids: &[&str],
        matcher: &str,
        target: &str,
        dependent_ids: &[&str],
    ) -> DriverResult<()> {
        let js_code = format!(
            r#"
            (() => {{
                const ids = {ids};
                const dependents = {dependents};
                const target = {target};
                const select = ids.map(id => document.getElementById(id)).find(el => el);
                if (!select) return {{ status: "missing_select" }};
                const opt = Array.from(select.options).slice(1).find(opt => {matcher});
                if (!opt) return {{ status: "missing_option", text: String(select.options.length - 1) }};
                if (select.value === opt.value) return {{ status: "unchanged" }};
                dependents
                    .map(id => document.getElementById(id))
                    .filter(el => el)
                    .forEach(el => el.setAttribute("data-stale", "1"));
                select.value = opt.value;
                setTimeout(() => select.dispatchEvent(new Event("change", {{ bubbles: true }})), 0);
                return {{ status: "ok", text: opt.text.trim() }};
            }})()
            "#,
            ids = to_js(select_ids)?,
            dependents = to_js(dependent_ids)?,
            target = to_js(target)?,
            matcher = matcher,
        );

        let result = self.run_script(operation, js_code).await?;
        match result.status.as_str() {
            "ok" => {
                debug!("{}: 已选择 {}", operation, result.text.unwrap_or_default());
                Ok(())
            }
            "unchanged" => Ok(()),
            "missing_option" => Err(DriverError::not_found(format!(
                "{} 的下拉选项 {} (共 {} 项)",
                operation,
                target,
                result.text.unwrap_or_default()
            ))),
            "missing_select" => Err(DriverError::stale(operation)),
            other => Err(DriverError::other(format!("{}: 未知脚本状态 {}", operation, other))),
        }
    }

    /// 等待回发完成：依赖元素重新出现且不带 stale 标记
    async fn wait_for_fresh(
        &self,
        operation: &str,
        element_ids: &[&str],
        require_options: bool,
        wait: Duration,
    ) -> DriverResult<()> {
        let js_code = format!(
            r#"
            (() => {{
                const el = {ids}.map(id => document.getElementById(id)).find(el => el);
                if (!el || el.hasAttribute("data-stale")) return {{ status: "pending" }};
                if ({require_options} && el.options && el.options.length < 2) return {{ status: "pending" }};
                return {{ status: "ready" }};
            }})()
            "#,
            ids = to_js(element_ids)?,
            require_options = require_options,
        );

        let deadline = Instant::now() + wait;
        while Instant::now() < deadline {
            // 回发过程中执行上下文会被销毁，这时的错误只代表还没加载完
            match self.executor.eval_as::<ScriptStatus>(js_code.clone()).await {
                Ok(status) if status.status == "ready" => return Ok(()),
                Ok(_) => {}
                Err(e) => debug!("{}: 等待回发中 ({})", operation, e),
            }
            sleep(POLL_INTERVAL).await;
        }

        Err(DriverError::timeout(operation))
    }

    /// 清空表格里所有行的申报日期，只有本次填写的行才会被提交
    async fn clear_grid(&self) -> DriverResult<()> {
        let js_code = format!(
            r#"
            (() => {{
                const grid = {ids}.map(id => document.getElementById(id)).find(el => el);
                if (!grid) return {{ status: "missing_grid" }};
                let cleared = 0;
                grid.querySelectorAll("input[id$='_dt_app']").forEach(input => {{
                    if (input.value !== "") {{ input.value = ""; cleared += 1; }}
                }});
                return {{ status: "ok", text: String(cleared) }};
            }})()
            "#,
            ids = to_js(&GRID_IDS)?,
        );

        let result = self.run_script("清空表格", js_code).await?;
        match result.status.as_str() {
            "ok" => Ok(()),
            _ => Err(DriverError::not_found("申请人表格")),
        }
    }

    /// 提交后没有弹窗时，读取页面上的提示文字
    async fn read_page_message(&self) -> DriverResult<Option<String>> {
        let js_code = format!(
            r#"
            (() => {{
                const red = document.querySelector("font[color='red'], font[color='Red']");
                if (red && red.innerText.trim()) return {{ status: "ok", text: red.innerText.trim() }};
                const label = document.getElementById({label});
                if (label && label.innerText.trim()) return {{ status: "ok", text: label.innerText.trim() }};
                return {{ status: "empty" }};
            }})()
            "#,
            label = to_js(MESSAGE_LABEL_ID)?,
        );

        let result = self.run_script("读取页面提示", js_code).await?;
        Ok(result.text.filter(|_| result.status == "ok"))
    }
}

#[async_trait]
impl FormDriver for PageFormDriver {
    async fn open_entry(&mut self) -> DriverResult<()> {
        info!("🌐 打开申报页面: {}", self.entry_url);
        self.executor
            .goto(&self.entry_url)
            .await
            .map_err(|e| script_error("打开入口页面", &e))?;

        if let Some(panchayat) = self.panchayat.clone() {
            self.wait_for_fresh("等待乡镇下拉框", &PANCHAYAT_IDS, true, self.postback_wait)
                .await?;
            self.select_option(
                "选择乡镇",
                &PANCHAYAT_IDS,
                "opt.text.trim() === target",
                &panchayat,
                &VILLAGE_IDS,
            )
            .await?;
        }

        self.wait_for_fresh("等待村庄下拉框", &VILLAGE_IDS, true, self.postback_wait)
            .await
    }

    async fn select_sub_unit(&mut self, sub_unit_key: &str) -> DriverResult<()> {
        self.select_option(
            "选择村庄",
            &VILLAGE_IDS,
            "opt.value.trim().endsWith(target)",
            sub_unit_key,
            &JOBCARD_IDS,
        )
        .await?;
        self.wait_for_fresh("等待卡号下拉框", &JOBCARD_IDS, true, self.postback_wait)
            .await
    }

    async fn select_group(&mut self, group_label: &str) -> DriverResult<()> {
        self.select_option(
            "选择卡号",
            &JOBCARD_IDS,
            "opt.text.trim().startsWith(target + '-')",
            group_label,
            &GRID_IDS,
        )
        .await?;
        self.wait_for_fresh("等待申请人表格", &GRID_IDS, false, self.postback_wait)
            .await?;
        self.clear_grid().await
    }

    async fn read_consumed_days(&mut self, group_key: &str) -> DriverResult<ConsumedDays> {
        let js_code = format!(
            r#"
            (() => {{
                const grid = {grid}.map(id => document.getElementById(id)).find(el => el);
                if (!grid) return {{ status: "missing_grid" }};
                const label = {labels}.map(id => document.getElementById(id)).find(el => el);
                if (!label) return {{ status: "blank" }};
                return {{ status: "ok", text: label.innerText.trim() }};
            }})()
            "#,
            grid = to_js(&GRID_IDS)?,
            labels = to_js(&CONSUMED_DAYS_IDS)?,
        );

        let result = self.run_script("读取已用天数", js_code).await?;
        match result.status.as_str() {
            "missing_grid" => Err(DriverError::not_found(format!("分组 {} 的申请人表格", group_key))),
            "blank" => Ok(ConsumedDays::NotIssued),
            _ => parse_consumed_days(result.text.as_deref().unwrap_or("")),
        }
    }

    async fn fill_worker_fields(
        &mut self,
        worker_name: &str,
        days: u32,
        range: &DateRange,
    ) -> DriverResult<()> {
        let js_code = format!(
            r#"
            (() => {{
                const normalize = s => s.toLowerCase().replace(/\s+/g, "");
                const target = normalize({name});
                const grid = {grid}.map(id => document.getElementById(id)).find(el => el);
                if (!grid) return {{ status: "missing_grid" }};
                const rows = Array.from(grid.querySelectorAll("tr")).slice(1);
                const row = rows.find(r => {{
                    const span = r.querySelector("span[id*='_job']");
                    return span && normalize(span.innerText).includes(target);
                }});
                if (!row) return {{ status: "missing_row" }};
                const field = suffix => row.querySelector(`input[id$='_${{suffix}}']`);
                const set = (input, value) => {{
                    input.value = value;
                    input.dispatchEvent(new Event("change", {{ bubbles: true }}));
                    input.dispatchEvent(new Event("blur"));
                }};
                const appDate = field("dt_app"), fromDate = field("dt_from"), days = field("d3"), till = field("dt_to");
                if (!appDate || !fromDate || !days) return {{ status: "missing_field" }};
                if (till) {{ till.value = ""; till.setAttribute("data-stale", "1"); }}
                set(appDate, {from});
                set(fromDate, {from});
                set(days, {days});
                return {{ status: "ok", text: till ? till.id : "" }};
            }})()
            "#,
            name = to_js(worker_name)?,
            grid = to_js(&GRID_IDS)?,
            from = to_js(&range.from_text())?,
            days = to_js(&days.to_string())?,
        );

        let result = self.run_script("填写申请人", js_code).await?;
        match result.status.as_str() {
            "ok" => {}
            "missing_row" => return Err(DriverError::not_found(format!("申请人 {}", worker_name))),
            "missing_grid" => return Err(DriverError::stale("填写申请人")),
            other => {
                return Err(DriverError::other(format!(
                    "申请人 {} 的输入框不完整 ({})",
                    worker_name, other
                )))
            }
        }

        // 页面根据天数自动计算结束日期，算出来才算填写完成
        let till_id = result.text.unwrap_or_default();
        if till_id.is_empty() {
            return Ok(());
        }
        let js_code = format!(
            r#"
            (() => {{
                const till = document.getElementById({id});
                if (!till) return {{ status: "gone" }};
                return {{ status: till.value ? "ready" : "pending", text: till.value }};
            }})()
            "#,
            id = to_js(&till_id)?,
        );
        let deadline = Instant::now() + self.postback_wait;
        while Instant::now() < deadline {
            let status = self.run_script("等待结束日期", js_code.clone()).await?;
            match status.status.as_str() {
                "ready" => {
                    let till = status.text.unwrap_or_default();
                    if till != range.till_text() {
                        warn!(
                            "⚠️ {} 的结束日期为 {}，与预期 {} 不一致",
                            worker_name,
                            till,
                            range.till_text()
                        );
                    }
                    return Ok(());
                }
                "gone" => return Err(DriverError::stale("等待结束日期")),
                _ => sleep(POLL_INTERVAL).await,
            }
        }
        Err(DriverError::timeout("等待结束日期"))
    }

    async fn submit(&mut self) -> DriverResult<Option<String>> {
        let page = self.executor.page().clone();
        let mut dialogs = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(|e| DriverError::other(format!("监听弹窗失败: {}", e)))?;

        // 点击放到下一个事件循环，避免弹窗阻塞本次脚本执行
        let js_code = format!(
            r#"
            (() => {{
                const button = {ids}.map(id => document.getElementById(id)).find(el => el);
                if (!button) return {{ status: "missing_button" }};
                {grid}.map(id => document.getElementById(id))
                    .filter(el => el)
                    .forEach(el => el.setAttribute("data-stale", "1"));
                setTimeout(() => button.click(), 0);
                return {{ status: "ok" }};
            }})()
            "#,
            ids = to_js(&SUBMIT_IDS)?,
            grid = to_js(&GRID_IDS)?,
        );
        let clicked = self.run_script("点击提交", js_code).await?;
        if clicked.status != "ok" {
            return Err(DriverError::stale("点击提交"));
        }

        // 先出现的确认框直接接受，等到真正的提示框为止
        let deadline = Instant::now() + self.response_wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = match tokio::time::timeout(remaining, dialogs.next()).await {
                Ok(Some(event)) => event,
                Ok(None) | Err(_) => break,
            };

            page.execute(HandleJavaScriptDialogParams::new(true))
                .await
                .map_err(|e| DriverError::other(format!("关闭弹窗失败: {}", e)))?;

            debug!("弹窗 ({:?}): {}", event.r#type, event.message);
            if event.r#type != DialogType::Confirm {
                return Ok(Some(event.message.clone()));
            }
        }

        debug!("等待期内没有弹窗，读取页面提示");
        if self
            .wait_for_fresh("等待提交回发", &GRID_IDS, false, self.response_wait)
            .await
            .is_err()
        {
            debug!("提交后表格未重新加载");
        }
        self.read_page_message().await
    }
}

/// 把参数编码成 JS 字面量
fn to_js<T: serde::Serialize + ?Sized>(value: &T) -> DriverResult<String> {
    serde_json::to_string(value).map_err(|e| DriverError::other(format!("参数编码失败: {}", e)))
}

/// 脚本执行失败的归类：执行上下文被销毁说明页面刚刚回发
fn script_error(operation: &str, error: &anyhow::Error) -> DriverError {
    let message = error.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("context") || lowered.contains("detached") || lowered.contains("navigat") {
        DriverError::stale(operation)
    } else if lowered.contains("timeout") || lowered.contains("timed out") {
        DriverError::timeout(operation)
    } else {
        DriverError::other(format!("{}: {}", operation, message))
    }
}

/// 解析已用天数标签，空白表示尚未申报
fn parse_consumed_days(text: &str) -> DriverResult<ConsumedDays> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if text.trim().is_empty() {
        Ok(ConsumedDays::NotIssued)
    } else if digits.is_empty() {
        Err(DriverError::other(format!("无法解析已用天数: {}", text)))
    } else {
        digits
            .parse::<u32>()
            .map(ConsumedDays::Issued)
            .map_err(|_| DriverError::other(format!("无法解析已用天数: {}", text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_consumed_days() {
        assert_eq!(parse_consumed_days("  "), Ok(ConsumedDays::NotIssued));
        assert_eq!(parse_consumed_days("95"), Ok(ConsumedDays::Issued(95)));
        assert_eq!(
            parse_consumed_days("Days demanded: 42 days"),
            Ok(ConsumedDays::Issued(42))
        );
        assert!(matches!(
            parse_consumed_days("N/A"),
            Err(DriverError::Other { .. })
        ));
    }

    #[test]
    fn test_script_error_kinds() {
        let stale = anyhow::anyhow!("Execution context was destroyed");
        let timeout = anyhow::anyhow!("Request timed out");
        let other = anyhow::anyhow!("SyntaxError: Unexpected token");

        assert!(matches!(script_error("x", &stale), DriverError::StaleContext { .. }));
        assert!(matches!(script_error("x", &timeout), DriverError::Timeout { .. }));
        assert!(matches!(script_error("x", &other), DriverError::Other { .. }));
    }

    #[test]
    fn test_js_literals_are_quoted() {
        assert_eq!(to_js("A \"B\"").unwrap(), r#""A \"B\"""#);
        assert_eq!(to_js(&GRID_IDS[..1]).unwrap(), r#"["ctl00_ContentPlaceHolder1_gvData"]"#);
    }
}
