use candlewatch_core::common::ExchangeId;
use candlewatch_core::market::entity::MarketKind;

/// # Summary
/// 规范标识的拼写约定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolFormat {
    // ETH/USDT
    SlashQuote,
    // ETH/USDT:USDT
    SlashQuoteSettle,
    // ETH_USDT
    UnderscoreQuote,
    // ETH-USDT-SWAP
    DashSwapSuffix,
    // ETHUSDT
    Concatenated,
}

impl SymbolFormat {
    /// 按约定拼出候选规范标识。
    pub fn render(self, base: &str, quote: &str) -> String {
        match self {
            SymbolFormat::SlashQuote => format!("{}/{}", base, quote),
            SymbolFormat::SlashQuoteSettle => format!("{}/{}:{}", base, quote, quote),
            SymbolFormat::UnderscoreQuote => format!("{}_{}", base, quote),
            SymbolFormat::DashSwapSuffix => format!("{}-{}-SWAP", base, quote),
            SymbolFormat::Concatenated => format!("{}{}", base, quote),
        }
    }
}

/// # Summary
/// 交易所描述符：规范化一个代码所需的全部交易所差异。
///
/// # Invariants
/// - `formats` 按优先级排列，规范化返回第一个命中的候选。
#[derive(Debug, Clone, Copy)]
pub struct ExchangeDescriptor {
    pub id: ExchangeId,
    // 计价资产
    pub quote: &'static str,
    // 监控的衍生品种类
    pub derivative_kind: MarketKind,
    // 候选拼写约定
    pub formats: &'static [SymbolFormat],
}

const BINANCE: ExchangeDescriptor = ExchangeDescriptor {
    id: ExchangeId::Binance,
    quote: "USDT",
    derivative_kind: MarketKind::Swap,
    formats: &[
        SymbolFormat::SlashQuote,
        SymbolFormat::SlashQuoteSettle,
        SymbolFormat::Concatenated,
    ],
};

const OKX: ExchangeDescriptor = ExchangeDescriptor {
    id: ExchangeId::Okx,
    quote: "USDT",
    derivative_kind: MarketKind::Swap,
    formats: &[SymbolFormat::DashSwapSuffix, SymbolFormat::SlashQuote],
};

const GATE: ExchangeDescriptor = ExchangeDescriptor {
    id: ExchangeId::Gate,
    quote: "USDT",
    derivative_kind: MarketKind::Swap,
    formats: &[SymbolFormat::UnderscoreQuote, SymbolFormat::SlashQuote],
};

impl ExchangeDescriptor {
    /// 根据交易所标识选择描述符。
    pub fn for_exchange(id: ExchangeId) -> &'static ExchangeDescriptor {
        match id {
            ExchangeId::Binance => &BINANCE,
            ExchangeId::Okx => &OKX,
            ExchangeId::Gate => &GATE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_formats() {
        assert_eq!(SymbolFormat::SlashQuote.render("ETH", "USDT"), "ETH/USDT");
        assert_eq!(SymbolFormat::SlashQuoteSettle.render("ETH", "USDT"), "ETH/USDT:USDT");
        assert_eq!(SymbolFormat::UnderscoreQuote.render("ETH", "USDT"), "ETH_USDT");
        assert_eq!(SymbolFormat::DashSwapSuffix.render("ETH", "USDT"), "ETH-USDT-SWAP");
        assert_eq!(SymbolFormat::Concatenated.render("ETH", "USDT"), "ETHUSDT");
    }

    #[test]
    fn test_descriptor_selection() {
        assert_eq!(ExchangeDescriptor::for_exchange(ExchangeId::Okx).id, ExchangeId::Okx);
        assert_eq!(
            ExchangeDescriptor::for_exchange(ExchangeId::Gate).formats[0],
            SymbolFormat::UnderscoreQuote
        );
    }
}
