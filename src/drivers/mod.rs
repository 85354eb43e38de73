// src/drivers/mod.rs
// 声明同级目录下的子模块文件
pub mod assembler;
pub mod autoscale;
pub mod buffer;
pub mod codec;
pub mod error;
pub mod pipeline;
pub mod source;
// 公开导出这些模块里的结构体，方便外部调用
pub use assembler::FrameAssembler;
pub use autoscale::{AutoscaleCalculator, DisplayRange};
pub use buffer::{ChannelWindows, SlidingWindowBuffer, WindowsSnapshot};
pub use codec::{ChannelId, PacketCodec, RawFrame, Sample};
pub use error::{ScopeError, ScopeResult};
pub use pipeline::{LoopStats, ReadLoopController, StateHandle};
pub use source::{
    open_serial, ByteSource, ChannelSource, ReaderSource, ScriptedSource, SerialSettings,
    SerialSource, SimulatedSource, SimulationSettings,
};
