use crate::exchange::ExchangeDescriptor;
use candlewatch_core::common::ExchangeId;
use candlewatch_core::market::entity::{MarketCatalog, MarketInfo};
use candlewatch_core::market::error::MarketError;
use tracing::debug;

/// # Summary
/// 代码规范化器：把用户输入的代码解析为交易所目录中的永续合约。
///
/// # Invariants
/// - 同一目录下结果确定，不修改自选列表也不修改目录。
#[derive(Debug, Clone, Copy)]
pub struct SymbolNormalizer {
    descriptor: &'static ExchangeDescriptor,
}

impl SymbolNormalizer {
    pub fn new(descriptor: &'static ExchangeDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn for_exchange(id: ExchangeId) -> Self {
        Self::new(ExchangeDescriptor::for_exchange(id))
    }

    pub fn descriptor(&self) -> &'static ExchangeDescriptor {
        self.descriptor
    }

    /// # Summary
    /// 从任意写法的代码中提取基础资产。
    ///
    /// # Logic
    /// 1. 去除空白并转为大写。
    /// 2. 含分隔符 (`/`, `_`, `-`, `:`) 时取第一段。
    /// 3. 否则若以计价资产结尾 (如 `ETHUSDT`)，去掉该后缀。
    ///
    /// # Returns
    /// 空输入返回 None。
    pub fn base_asset(&self, ticker: &str) -> Option<String> {
        let upper = ticker.trim().to_uppercase();
        let head = upper
            .split(['/', '_', '-', ':'])
            .next()
            .unwrap_or_default();
        if head.is_empty() {
            return None;
        }
        if head.len() == upper.len()
            && let Some(stripped) = head.strip_suffix(self.descriptor.quote)
            && !stripped.is_empty()
        {
            return Some(stripped.to_string());
        }
        Some(head.to_string())
    }

    /// # Summary
    /// 将代码解析为目录中的活跃永续合约。
    ///
    /// # Logic
    /// 1. 提取基础资产。
    /// 2. 按描述符的候选顺序拼出规范标识。
    /// 3. 返回第一个存在于目录、种类匹配、处于交易状态且无交割日的条目。
    ///
    /// # Arguments
    /// * `ticker`: 用户输入的代码 (例如: ETH, eth, ETH/USDT)。
    /// * `catalog`: 本周期加载的市场目录。
    ///
    /// # Returns
    /// 成功返回目录条目引用，未命中返回 `MarketError::SymbolNotFound`。
    pub fn resolve<'a>(
        &self,
        ticker: &str,
        catalog: &'a MarketCatalog,
    ) -> Result<&'a MarketInfo, MarketError> {
        let base = self
            .base_asset(ticker)
            .ok_or_else(|| MarketError::SymbolNotFound(ticker.to_string()))?;

        for format in self.descriptor.formats {
            let candidate = format.render(&base, self.descriptor.quote);
            match catalog.get(&candidate) {
                Some(market) if market.is_live(self.descriptor.derivative_kind) => {
                    return Ok(market);
                }
                Some(market) => {
                    debug!(
                        candidate = %candidate,
                        kind = ?market.kind,
                        active = market.active,
                        "Candidate present but not a live perpetual"
                    );
                }
                None => debug!(candidate = %candidate, "Candidate not in catalog"),
            }
        }

        Err(MarketError::SymbolNotFound(format!(
            "{} on {}",
            ticker.trim(),
            self.descriptor.id
        )))
    }
}
