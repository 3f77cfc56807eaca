//! 弹性定位服务 - 业务能力层
//!
//! 远端页面的结构不是稳定契约，"如何找到 X" 因此被建模为一组有序的
//! 独立假设（策略），而不是单个选择器。按声明顺序逐个尝试，第一个命中
//! 的策略即为权威结果，后续策略不再参与——宁可偶尔"选错"也要保证
//! 行为可复现。所有页面交互（点击、输入、读状态）都必须经由本模块，
//! 工作流代码里不允许出现裸查询。

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::PageDriver;

/// 策略间的轮询步长
const PROBE_STEP: Duration = Duration::from_millis(250);

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// 定位单个逻辑目标的一种独立假设
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// 结构化选择器
    Css(String),
    /// 无障碍名称（aria-label）
    AriaLabel(String),
    /// 可见文本：在 scope 选中的候选元素里找包含 needle 的可见元素
    Text { scope: String, needle: String },
}

impl Strategy {
    /// 策略的日志/错误标签
    pub fn label(&self) -> String {
        match self {
            Strategy::Css(sel) => format!("css:{}", sel),
            Strategy::AriaLabel(name) => format!("aria:{}", name),
            Strategy::Text { needle, .. } => format!("text:{}", needle),
        }
    }

    /// 编译为探测 JS：命中则给元素打上句柄标记并返回 true
    fn probe_js(&self, handle_id: u64) -> String {
        match self {
            Strategy::Css(sel) => format!(
                r#"
                (() => {{
                    const el = document.querySelector({sel});
                    if (!el) return false;
                    el.setAttribute('data-aoa-handle', '{id}');
                    return true;
                }})()
                "#,
                sel = js_string(sel),
                id = handle_id
            ),
            Strategy::AriaLabel(name) => format!(
                r#"
                (() => {{
                    const name = {name};
                    for (const el of document.querySelectorAll('[aria-label]')) {{
                        if (el.getAttribute('aria-label') === name) {{
                            el.setAttribute('data-aoa-handle', '{id}');
                            return true;
                        }}
                    }}
                    return false;
                }})()
                "#,
                name = js_string(name),
                id = handle_id
            ),
            Strategy::Text { scope, needle } => format!(
                r#"
                (() => {{
                    const needle = {needle};
                    for (const el of document.querySelectorAll({scope})) {{
                        if (el.textContent && el.textContent.trim().includes(needle)
                            && el.offsetParent !== null) {{
                            el.setAttribute('data-aoa-handle', '{id}');
                            return true;
                        }}
                    }}
                    return false;
                }})()
                "#,
                needle = js_string(needle),
                scope = js_string(scope),
                id = handle_id
            ),
        }
    }
}

/// 单个逻辑目标的定位说明：描述 + 有序策略列表
#[derive(Debug, Clone)]
pub struct LocatorSpec {
    description: String,
    strategies: Vec<Strategy>,
}

impl LocatorSpec {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            strategies: Vec::new(),
        }
    }

    pub fn css(mut self, selector: impl Into<String>) -> Self {
        self.strategies.push(Strategy::Css(selector.into()));
        self
    }

    pub fn aria(mut self, name: impl Into<String>) -> Self {
        self.strategies.push(Strategy::AriaLabel(name.into()));
        self
    }

    pub fn text(mut self, scope: impl Into<String>, needle: impl Into<String>) -> Self {
        self.strategies.push(Strategy::Text {
            scope: scope.into(),
            needle: needle.into(),
        });
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    fn strategy_labels(&self) -> Vec<String> {
        self.strategies.iter().map(|s| s.label()).collect()
    }
}

/// 已定位元素的句柄
///
/// 通过探测时打上的标记属性寻址，在页面重渲染之前保持有效。
#[derive(Debug, Clone)]
pub struct Handle {
    selector: String,
}

impl Handle {
    pub fn selector(&self) -> &str {
        &self.selector
    }
}

/// 弹性定位服务
///
/// 职责：
/// - 按声明顺序尝试 LocatorSpec 的各个策略，第一个命中即返回
/// - 提供基于定位结果的 click / fill / read_text 交互
/// - 不认识工作流状态，不关心流程顺序
pub struct ResilientLocator<'a> {
    driver: &'a PageDriver,
    element_timeout: Duration,
}

impl<'a> ResilientLocator<'a> {
    pub fn new(driver: &'a PageDriver, element_timeout: Duration) -> Self {
        Self {
            driver,
            element_timeout,
        }
    }

    /// 定位一个逻辑目标
    ///
    /// 每个策略独立等待至多 element_timeout；全部未命中才算失败，
    /// 整体耗时不会超过 策略数 × element_timeout。
    pub async fn locate(&self, spec: &LocatorSpec) -> AutomationResult<Handle> {
        let handle_id = NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed);
        let matched = locate_with(spec, self.element_timeout, |strategy| {
            let js = strategy.probe_js(handle_id);
            async move { self.driver.eval_as::<bool>(js).await }
        })
        .await?;

        debug!(
            "✓ 定位到 {} (策略: {})",
            spec.description(),
            matched.label()
        );
        Ok(Handle {
            selector: format!("[data-aoa-handle='{}']", handle_id),
        })
    }

    /// 单次探测目标是否存在，不等待
    ///
    /// 供轮询类调用使用（如生成完成信号），未命中不算错误。
    pub async fn exists(&self, spec: &LocatorSpec) -> AutomationResult<bool> {
        let handle_id = NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed);
        for strategy in spec.strategies() {
            if self.driver.eval_as::<bool>(strategy.probe_js(handle_id)).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 定位并点击
    pub async fn click(&self, spec: &LocatorSpec) -> AutomationResult<()> {
        let handle = self.locate(spec).await?;
        let clicked: bool = self
            .driver
            .eval_as(format!(
                r#"
                (() => {{
                    const el = document.querySelector({sel});
                    if (!el) return false;
                    el.click();
                    return true;
                }})()
                "#,
                sel = js_string(handle.selector())
            ))
            .await?;
        if !clicked {
            // 标记后元素被页面移除，按策略全失败处理
            return Err(AutomationError::selector_not_found(
                spec.description(),
                spec.strategy_labels(),
            ));
        }
        debug!("✓ 点击 {}", spec.description());
        Ok(())
    }

    /// 定位并填入文本
    ///
    /// 表单控件走 value，contenteditable 节点走 textContent，
    /// 两种路径都派发 input 事件让框架感知变更。
    pub async fn fill(&self, spec: &LocatorSpec, text: &str) -> AutomationResult<()> {
        let handle = self.locate(spec).await?;
        let filled: bool = self
            .driver
            .eval_as(format!(
                r#"
                (() => {{
                    const el = document.querySelector({sel});
                    if (!el) return false;
                    const text = {text};
                    if (el.tagName === 'TEXTAREA' || el.tagName === 'INPUT') {{
                        el.value = text;
                    }} else {{
                        el.textContent = text;
                    }}
                    el.dispatchEvent(new Event('input', {{bubbles: true}}));
                    return true;
                }})()
                "#,
                sel = js_string(handle.selector()),
                text = js_string(text)
            ))
            .await?;
        if !filled {
            return Err(AutomationError::selector_not_found(
                spec.description(),
                spec.strategy_labels(),
            ));
        }
        debug!("✓ 填入 {} ({} 字符)", spec.description(), text.chars().count());
        Ok(())
    }

    /// 定位并读取可见文本
    pub async fn read_text(&self, spec: &LocatorSpec) -> AutomationResult<String> {
        let handle = self.locate(spec).await?;
        let text: String = self
            .driver
            .eval_as(format!(
                r#"
                (() => {{
                    const el = document.querySelector({sel});
                    return el ? (el.textContent || '').trim() : '';
                }})()
                "#,
                sel = js_string(handle.selector())
            ))
            .await?;
        Ok(text)
    }
}

/// 策略遍历核心
///
/// 与页面驱动解耦，探测动作由调用方注入，便于离线测试。
pub(crate) async fn locate_with<'s, F, Fut>(
    spec: &'s LocatorSpec,
    per_strategy_timeout: Duration,
    mut probe: F,
) -> AutomationResult<&'s Strategy>
where
    F: FnMut(&'s Strategy) -> Fut,
    Fut: Future<Output = AutomationResult<bool>>,
{
    for strategy in spec.strategies() {
        let deadline = Instant::now() + per_strategy_timeout;
        loop {
            if probe(strategy).await? {
                return Ok(strategy);
            }
            if Instant::now() + PROBE_STEP > deadline {
                break;
            }
            sleep(PROBE_STEP).await;
        }
    }

    Err(AutomationError::selector_not_found(
        spec.description(),
        spec.strategy_labels(),
    ))
}

/// 将文本编码为 JS 字符串字面量（处理引号、换行等转义）
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_strategy_spec() -> LocatorSpec {
        LocatorSpec::new("生成按钮")
            .css(".generate-button")
            .aria("Generate")
            .text("button", "Generate")
    }

    #[test]
    fn test_spec_preserves_declared_order() {
        let spec = three_strategy_spec();
        let labels: Vec<String> = spec.strategies().iter().map(|s| s.label()).collect();
        assert_eq!(
            labels,
            vec!["css:.generate-button", "aria:Generate", "text:Generate"]
        );
    }

    #[test]
    fn test_probe_js_escapes_quotes() {
        let strategy = Strategy::Css("button[aria-label='Play \"now\"']".to_string());
        let js = strategy.probe_js(7);
        assert!(js.contains(r#"\"now\""#));
        assert!(js.contains("data-aoa-handle"));
    }

    #[tokio::test]
    async fn test_first_matching_strategy_wins() {
        let spec = three_strategy_spec();
        // 第一个策略就命中，后面的策略不应被探测
        let mut probed = Vec::new();
        let result = locate_with(&spec, Duration::from_secs(1), |s| {
            probed.push(s.label());
            async { Ok(true) }
        })
        .await
        .unwrap();

        assert_eq!(result.label(), "css:.generate-button");
        assert_eq!(probed.len(), 1);
    }

    #[tokio::test]
    async fn test_third_strategy_matches_after_first_two_fail() {
        let spec = three_strategy_spec();
        let result = locate_with(&spec, Duration::from_millis(1), |s| {
            let hit = matches!(s, Strategy::Text { .. });
            async move { Ok(hit) }
        })
        .await
        .unwrap();

        assert!(matches!(result, Strategy::Text { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_strategies_fail_within_total_timeout() {
        let spec = three_strategy_spec();
        let per_strategy = Duration::from_secs(2);

        let started = Instant::now();
        let result = locate_with(&spec, per_strategy, |_| async { Ok(false) }).await;
        let elapsed = started.elapsed();

        match result {
            Err(AutomationError::SelectorNotFound { strategies, .. }) => {
                assert_eq!(strategies.len(), 3);
            }
            other => panic!("期望 SelectorNotFound，实际: {:?}", other),
        }
        // 总耗时不超过 策略数 × 单策略超时
        assert!(elapsed <= per_strategy * 3 + Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_probe_error_propagates() {
        let spec = LocatorSpec::new("任意目标").css(".x");
        let result = locate_with(&spec, Duration::from_secs(1), |_| async {
            Err(AutomationError::Other("页面已关闭".to_string()))
        })
        .await;
        assert!(matches!(result, Err(AutomationError::Other(_))));
    }
}
