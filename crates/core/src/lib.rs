//! candlewatch 领域核心：实体、端口 (Trait) 与错误定义。
//!
//! 本 crate 不包含任何 I/O 实现，所有具体适配器（交易所、存储、通知）
//! 均在外围 crate 中实现并通过 `Arc<dyn Trait>` 注入。

pub mod common;
pub mod config;

pub mod alert {
    pub mod entity;
}

pub mod market {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod notify {
    pub mod error;
    pub mod port;
}

pub mod store {
    pub mod error;
    pub mod port;
}

#[cfg(feature = "test-utils")]
pub mod testing;
