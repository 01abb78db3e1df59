//! 监控周期编排：目录加载、逐标的评估、告警去重投递与快照持久化。

pub mod cycle;
pub mod error;
pub mod report;

pub use cycle::{CycleSettings, MonitorCycle};
pub use error::CycleError;
pub use report::{CycleReport, SkippedSymbol, chunk_lines};
